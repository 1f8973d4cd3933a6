//! Configured Family - 설정 파일로 정의한 에디터 패밀리
//!
//! `FamilyConfig` 하나로 `EditorPlugin`을 구현합니다.
//!
//! - 설치 위치: glob 패턴 매치 + PATH의 실행 파일
//! - 실행 중 판단: `running_markers` glob에 매치되는 파일이 있으면 실행 중이며,
//!   그 파일이 있는 디렉토리를 실행 중인 에디터 위치로 본다
//! - 플러그인 에셋: 에디터 디렉토리 아래 `plugin_dir` (실행 파일 위치면 그 부모 디렉토리)

use crate::plugin::{
    install_or_update, should_install_remote_version, sweep_orphaned_staging, AssetFetcher,
    EditorLocation, EditorPlugin, InstallConfig, InstallOutcome, OpenFileCompletion,
    PluginVersion, StageOutcome, VERSION_FILE,
};
use async_trait::async_trait;
use editorlink_foundation::{Error, FamilyConfig, Result};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Duration;
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// 이보다 오래된 스테이징 디렉토리는 중단된 설치로 간주
const STAGING_MAX_AGE: Duration = Duration::from_secs(60 * 60);

/// 설정 기반 에디터 패밀리
pub struct ConfiguredFamily {
    config: FamilyConfig,
    fetcher: AssetFetcher,
    /// 베타 채널이면 버전 비교 없이 항상 다시 배포
    beta_channel: bool,
}

impl ConfiguredFamily {
    pub fn new(config: FamilyConfig) -> Self {
        Self {
            config,
            fetcher: AssetFetcher::new(),
            beta_channel: false,
        }
    }

    pub fn with_beta_channel(mut self, beta_channel: bool) -> Self {
        self.beta_channel = beta_channel;
        self
    }

    pub fn config(&self) -> &FamilyConfig {
        &self.config
    }

    /// 에디터 위치의 플러그인 에셋 경로
    fn asset_path(&self, editor: &Path) -> Result<PathBuf> {
        let plugin_dir = Path::new(&self.config.plugin_dir);
        if self.config.plugin_dir.is_empty() || plugin_dir.is_absolute() {
            return Err(Error::Config(format!(
                "pluginDir of {} must be a relative path",
                self.config.id
            )));
        }

        let base = if editor.is_file() {
            editor.parent().unwrap_or(editor)
        } else {
            editor
        };
        Ok(base.join(plugin_dir))
    }

    /// 설정 디렉토리 확인 (에디터를 한 번도 실행하지 않았으면 없음)
    fn check_config_dir(&self) -> Result<()> {
        match &self.config.config_dir {
            Some(dir) if !expand_home_path(dir).is_dir() => Err(Error::ConfigMissing {
                family: self.config.name.clone(),
                path: expand_home_path(dir),
            }),
            _ => Ok(()),
        }
    }

    /// 스테이징 후 게시 (설치와 업데이트 공통)
    async fn deploy(&self, cancel: &CancellationToken, editor: &Path) -> Result<InstallOutcome> {
        self.check_config_dir()?;

        let source = self
            .config
            .source
            .as_ref()
            .ok_or_else(|| Error::plugin(&self.config.name, "no plugin source configured"))?;

        let target = self.asset_path(editor)?;
        let (Some(parent), Some(asset_name)) = (target.parent(), target.file_name()) else {
            return Err(Error::Config(format!(
                "Invalid plugin directory for {}: {}",
                self.config.id,
                target.display()
            )));
        };
        let asset_name = asset_name.to_string_lossy().to_string();

        sweep_orphaned_staging(parent, STAGING_MAX_AGE).await;

        let installed_marker = target.join(VERSION_FILE);
        let version = self.config.version.clone();
        let beta_channel = self.beta_channel;
        let fetcher = &self.fetcher;

        install_or_update(cancel, parent, &asset_name, |staging| async move {
            if !beta_channel {
                let install = should_install_remote_version(&installed_marker, || async {
                    version
                        .clone()
                        .ok_or_else(|| Error::NotFound("no plugin version configured".into()))
                })
                .await;
                if !install {
                    return Ok(StageOutcome::UpToDate);
                }
            }

            fetcher.fetch(source, &staging).await?;

            if let Some(version) = version.as_deref().and_then(PluginVersion::parse) {
                version.write_to(&staging.join(VERSION_FILE)).await?;
            }
            Ok(StageOutcome::Staged)
        })
        .await
    }

    /// PATH에서 첫 번째 실행 파일 찾기
    fn resolve_binary(&self) -> Option<PathBuf> {
        self.config
            .binaries
            .iter()
            .find_map(|binary| which::which(binary).ok())
    }

    fn glob_paths(patterns: &[String]) -> Vec<PathBuf> {
        let mut paths = Vec::new();
        for pattern in patterns {
            let pattern = expand_home(pattern);
            match glob::glob(&pattern) {
                Ok(entries) => paths.extend(entries.filter_map(|entry| entry.ok())),
                Err(e) => warn!("Invalid glob pattern {}: {}", pattern, e),
            }
        }
        paths
    }
}

#[async_trait]
impl EditorPlugin for ConfiguredFamily {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn additional_ids(&self) -> Vec<String> {
        self.config.aliases.clone()
    }

    async fn install_config(&self, cancel: &CancellationToken) -> InstallConfig {
        let running = match self.detect_running(cancel).await {
            Ok(paths) => !paths.is_empty(),
            Err(_) => false,
        };

        InstallConfig {
            requires_restart: self.config.restart_required,
            multiple_install_locations: self.config.multiple_install_locations,
            running,
            install_while_running: self.config.install_while_running,
            update_while_running: self.config.update_while_running,
            uninstall_while_running: self.config.uninstall_while_running,
        }
    }

    async fn detect_installed(&self, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let mut paths = Self::glob_paths(&self.config.patterns);
        for binary in &self.config.binaries {
            if let Ok(path) = which::which(binary) {
                paths.push(path);
            }
        }

        debug!("Detected {} {} locations", paths.len(), self.config.id);
        Ok(crate::plugin::dedupe_paths(paths))
    }

    async fn detect_running(&self, cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let running = Self::glob_paths(&self.config.running_markers)
            .into_iter()
            .filter_map(|marker| marker.parent().map(Path::to_path_buf));
        Ok(crate::plugin::dedupe_paths(running))
    }

    async fn describe(&self, _cancel: &CancellationToken, path: &Path) -> Result<EditorLocation> {
        if !path.exists() {
            return Err(Error::NotFound(format!(
                "{} location {} does not exist",
                self.config.name,
                path.display()
            )));
        }

        let mut location = EditorLocation::new(path);
        if let Some(version) = read_editor_version(path).await {
            location = location.with_version(version);
        }
        Ok(location)
    }

    fn is_installed(&self, path: &Path) -> bool {
        self.asset_path(path).map(|p| p.is_dir()).unwrap_or(false)
    }

    async fn install(&self, cancel: &CancellationToken, path: &Path) -> Result<InstallOutcome> {
        info!("Installing {} plugin at {}", self.config.id, path.display());
        self.deploy(cancel, path).await
    }

    async fn uninstall(&self, _cancel: &CancellationToken, path: &Path) -> Result<()> {
        let target = self.asset_path(path)?;
        match tokio::fs::remove_dir_all(&target).await {
            Ok(()) => {
                info!("Removed {} plugin from {}", self.config.id, target.display());
                Ok(())
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }

    async fn update(&self, cancel: &CancellationToken, path: &Path) -> Result<InstallOutcome> {
        if !self.is_installed(path) {
            return Err(Error::plugin(
                &self.config.name,
                format!("plugin is not installed at {}", path.display()),
            ));
        }
        self.deploy(cancel, path).await
    }

    async fn open_file(
        &self,
        cancel: &CancellationToken,
        _id: &str,
        editor_path: Option<&Path>,
        file: &Path,
        line: Option<u32>,
    ) -> Result<Option<OpenFileCompletion>> {
        if cancel.is_cancelled() {
            return Err(Error::Cancelled);
        }

        let program = match editor_path {
            Some(path) if path.is_file() => path.to_path_buf(),
            _ => self.resolve_binary().ok_or_else(|| {
                Error::NotFound(format!("No executable found for {}", self.config.name))
            })?,
        };

        let target = match line {
            Some(line) => format!("{}:{}", file.display(), line),
            None => file.display().to_string(),
        };

        debug!("Opening {} with {}", target, program.display());
        let mut child = tokio::process::Command::new(&program)
            .arg(&target)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()?;

        let (tx, rx) = oneshot::channel();
        let family = self.config.name.clone();
        tokio::spawn(async move {
            let result = match child.wait().await {
                Ok(status) if status.success() => Ok(()),
                Ok(status) => Err(Error::plugin(family, format!("editor exited with {}", status))),
                Err(e) => Err(e.into()),
            };
            let _ = tx.send(result);
        });

        Ok(Some(rx))
    }
}

/// 에디터 위치의 버전 파일 읽기 (`version` 또는 `VERSION`)
async fn read_editor_version(path: &Path) -> Option<String> {
    for name in ["version", "VERSION"] {
        if let Ok(content) = tokio::fs::read_to_string(path.join(name)).await {
            let version = content.trim();
            if !version.is_empty() {
                return Some(version.to_string());
            }
        }
    }
    None
}

/// `~/` 접두사를 홈 디렉토리로 확장
fn expand_home(pattern: &str) -> String {
    match (pattern.strip_prefix("~/"), dirs::home_dir()) {
        (Some(rest), Some(home)) => home.join(rest).to_string_lossy().to_string(),
        _ => pattern.to_string(),
    }
}

fn expand_home_path(path: &Path) -> PathBuf {
    match (path.strip_prefix("~"), dirs::home_dir()) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path.to_path_buf(),
    }
}
