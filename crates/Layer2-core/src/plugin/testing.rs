//! 테스트용 가짜 플러그인

use super::traits::{EditorLocation, EditorPlugin, InstallConfig, InstallOutcome, OpenFileCompletion};
use async_trait::async_trait;
use editorlink_foundation::{Error, Result};
use parking_lot::Mutex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use tokio_util::sync::CancellationToken;

/// 메모리에서 설치 상태를 흉내내는 플러그인
pub struct FakePlugin {
    id: String,
    name: String,
    aliases: Vec<String>,
    pub config: Mutex<InstallConfig>,
    pub detected: Mutex<Vec<PathBuf>>,
    pub running: Mutex<Vec<PathBuf>>,
    pub installed: Mutex<HashSet<PathBuf>>,
    pub health: Mutex<Option<bool>>,
    pub fail_install: AtomicBool,
    pub fail_update: AtomicBool,
    pub fail_detect: AtomicBool,
    pub install_calls: AtomicUsize,
    pub update_calls: AtomicUsize,
    pub uninstall_calls: AtomicUsize,
    pub opened: Mutex<Vec<(PathBuf, Option<u32>)>>,
}

impl FakePlugin {
    pub fn new(id: &str) -> Self {
        Self {
            id: id.to_string(),
            name: id.to_uppercase(),
            aliases: Vec::new(),
            config: Mutex::new(InstallConfig::default()),
            detected: Mutex::new(Vec::new()),
            running: Mutex::new(Vec::new()),
            installed: Mutex::new(HashSet::new()),
            health: Mutex::new(None),
            fail_install: AtomicBool::new(false),
            fail_update: AtomicBool::new(false),
            fail_detect: AtomicBool::new(false),
            install_calls: AtomicUsize::new(0),
            update_calls: AtomicUsize::new(0),
            uninstall_calls: AtomicUsize::new(0),
            opened: Mutex::new(Vec::new()),
        }
    }

    pub fn with_alias(mut self, alias: &str) -> Self {
        self.aliases.push(alias.to_string());
        self
    }

    pub fn with_detected(self, path: impl Into<PathBuf>) -> Self {
        self.detected.lock().push(path.into());
        self
    }

    pub fn with_installed(self, path: impl Into<PathBuf>) -> Self {
        self.installed.lock().insert(path.into());
        self
    }

    /// 실행 중 상태 설정 (허용 플래그는 모두 끔)
    pub fn set_running(&self, running: bool) {
        self.config.lock().running = running;
    }

    pub fn installs(&self) -> usize {
        self.install_calls.load(Ordering::SeqCst)
    }

    pub fn updates(&self) -> usize {
        self.update_calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl EditorPlugin for FakePlugin {
    fn id(&self) -> &str {
        &self.id
    }

    fn name(&self) -> &str {
        &self.name
    }

    fn additional_ids(&self) -> Vec<String> {
        self.aliases.clone()
    }

    async fn install_config(&self, _cancel: &CancellationToken) -> InstallConfig {
        *self.config.lock()
    }

    async fn detect_installed(&self, _cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        if self.fail_detect.load(Ordering::SeqCst) {
            return Err(Error::detection(&self.id, "scan failed"));
        }
        Ok(self.detected.lock().clone())
    }

    async fn detect_running(&self, _cancel: &CancellationToken) -> Result<Vec<PathBuf>> {
        Ok(self.running.lock().clone())
    }

    async fn describe(&self, _cancel: &CancellationToken, path: &Path) -> Result<EditorLocation> {
        if path.as_os_str().is_empty() || path.to_string_lossy().contains("invalid") {
            return Err(Error::InvalidInput(format!("Not a {} installation", self.name)));
        }
        Ok(EditorLocation::new(path).with_version("1.0"))
    }

    fn is_installed(&self, path: &Path) -> bool {
        self.installed.lock().contains(path)
    }

    async fn install(&self, _cancel: &CancellationToken, path: &Path) -> Result<InstallOutcome> {
        self.install_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_install.load(Ordering::SeqCst) {
            return Err(Error::Transfer("download failed".into()));
        }
        self.installed.lock().insert(path.to_path_buf());
        Ok(InstallOutcome::Installed)
    }

    async fn uninstall(&self, _cancel: &CancellationToken, path: &Path) -> Result<()> {
        self.uninstall_calls.fetch_add(1, Ordering::SeqCst);
        self.installed.lock().remove(path);
        Ok(())
    }

    async fn update(&self, _cancel: &CancellationToken, _path: &Path) -> Result<InstallOutcome> {
        self.update_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_update.load(Ordering::SeqCst) {
            return Err(Error::Transfer("HTTP 503".into()));
        }
        Ok(InstallOutcome::Updated)
    }

    async fn open_file(
        &self,
        _cancel: &CancellationToken,
        _id: &str,
        _editor_path: Option<&Path>,
        file: &Path,
        line: Option<u32>,
    ) -> Result<Option<OpenFileCompletion>> {
        self.opened.lock().push((file.to_path_buf(), line));
        Ok(None)
    }

    async fn settings_health(&self, _cancel: &CancellationToken) -> Option<bool> {
        *self.health.lock()
    }
}
