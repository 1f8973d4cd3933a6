//! Plugin Installer - 원자적 플러그인 에셋 설치/업데이트
//!
//! 설치와 업데이트 모두 같은 순서를 따릅니다.
//!
//! ```text
//! target_parent/
//!   .staging-<asset>-<uuid>/   1. 빈 스테이징 디렉토리 생성
//!                              2. fetch_and_verify가 채움 (다운로드, 압축 해제, 버전 검사)
//!   <asset>/ -> .replaced-...  3. 기존 에셋이 있으면 옆으로 rename
//!   .staging-... -> <asset>/   4. 스테이징을 rename으로 게시
//!                              5. 옆으로 옮긴 기존 에셋 삭제
//! ```
//!
//! 스테이징은 대상과 같은 부모 디렉토리에 만들어 rename이 같은 파일 시스템
//! 안에서 일어나게 합니다. 중간에 프로세스가 죽으면 스테이징 디렉토리가 남지만
//! 게시된 경로 밖에 있으므로 무해하며 `sweep_orphaned_staging`이 정리합니다.
//!
//! 3과 4 사이에 죽으면 `.replaced-*`가 기존 에셋의 유일한 사본입니다. 다음 설치가
//! 대상 락 안에서 이를 `<asset>`으로 되돌리고, 스윕은 `<asset>`이 있을 때만
//! `.replaced-*`를 지웁니다.

use super::traits::InstallOutcome;
use editorlink_foundation::{AssetSourceConfig, Error, Result};
use parking_lot::Mutex;
use reqwest::Client;
use std::collections::HashMap;
use std::future::Future;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};
use std::time::{Duration, SystemTime};
use tokio::fs;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

const STAGING_PREFIX: &str = ".staging-";
const REPLACED_PREFIX: &str = ".replaced-";

// ============================================================================
// StageOutcome - fetch_and_verify 결과
// ============================================================================

/// 스테이징 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StageOutcome {
    /// 스테이징 디렉토리에 새 에셋을 채움
    Staged,
    /// 후보 버전이 설치된 버전보다 새롭지 않음 (아무 것도 하지 않음)
    UpToDate,
}

// ============================================================================
// 대상별 직렬화
// ============================================================================

/// 같은 대상 경로에 대한 동시 설치를 직렬화하는 락
fn target_lock(target: &Path) -> Arc<tokio::sync::Mutex<()>> {
    static LOCKS: OnceLock<Mutex<HashMap<PathBuf, Arc<tokio::sync::Mutex<()>>>>> = OnceLock::new();

    let mut locks = LOCKS.get_or_init(|| Mutex::new(HashMap::new())).lock();
    // 아무도 잡고 있지 않은 락 정리
    locks.retain(|_, lock| Arc::strong_count(lock) > 1);
    Arc::clone(locks.entry(target.to_path_buf()).or_default())
}

// ============================================================================
// install_or_update - 원자적 설치/업데이트
// ============================================================================

/// 스테이징 후 rename으로 에셋을 설치하거나 교체
///
/// `fetch_and_verify`는 빈 스테이징 디렉토리를 받아 에셋 내용을 채운다.
/// 에셋이 이미 있으면 `target_parent/asset_name`을 통해 현재 설치를 읽을 수 있다.
/// 실패하면 스테이징을 지우고 기존 상태를 그대로 둔다. 취소되면 스테이징은
/// 정리 스윕에 맡긴다.
pub async fn install_or_update<F, Fut>(
    cancel: &CancellationToken,
    target_parent: &Path,
    asset_name: &str,
    fetch_and_verify: F,
) -> Result<InstallOutcome>
where
    F: FnOnce(PathBuf) -> Fut,
    Fut: Future<Output = Result<StageOutcome>>,
{
    if asset_name.is_empty()
        || asset_name.contains(['/', '\\'])
        || asset_name == "."
        || asset_name == ".."
    {
        return Err(Error::InvalidInput(format!("Invalid asset name: {:?}", asset_name)));
    }

    let target = target_parent.join(asset_name);
    let lock = target_lock(&target);
    let _guard = lock.lock().await;

    fs::create_dir_all(target_parent).await?;
    recover_replaced(target_parent, asset_name, &target).await?;

    let staging = target_parent.join(format!(
        "{}{}-{}",
        STAGING_PREFIX,
        asset_name,
        uuid::Uuid::new_v4()
    ));
    fs::create_dir_all(&staging).await?;
    debug!("Staging {} in {}", asset_name, staging.display());

    let staged = tokio::select! {
        _ = cancel.cancelled() => {
            warn!("Install of {} cancelled, leaving {} for cleanup", asset_name, staging.display());
            return Err(Error::Cancelled);
        }
        result = fetch_and_verify(staging.clone()) => result,
    };

    match staged {
        Ok(StageOutcome::Staged) => {}
        Ok(StageOutcome::UpToDate) => {
            discard(&staging).await;
            info!("{} is already up to date", target.display());
            return Ok(InstallOutcome::AlreadyInstalled);
        }
        Err(e) => {
            discard(&staging).await;
            return Err(e);
        }
    }

    if cancel.is_cancelled() {
        warn!("Install of {} cancelled before publishing", asset_name);
        return Err(Error::Cancelled);
    }

    publish(&staging, &target, target_parent, asset_name).await
}

/// 스테이징을 대상 위치로 게시
async fn publish(
    staging: &Path,
    target: &Path,
    target_parent: &Path,
    asset_name: &str,
) -> Result<InstallOutcome> {
    if fs::symlink_metadata(target).await.is_err() {
        if let Err(e) = fs::rename(staging, target).await {
            discard(staging).await;
            return Err(e.into());
        }
        info!("Installed {}", target.display());
        return Ok(InstallOutcome::Installed);
    }

    let replaced = target_parent.join(format!(
        "{}{}-{}",
        REPLACED_PREFIX,
        asset_name,
        uuid::Uuid::new_v4()
    ));
    if let Err(e) = fs::rename(target, &replaced).await {
        discard(staging).await;
        return Err(e.into());
    }

    if let Err(e) = fs::rename(staging, target).await {
        // 기존 에셋 복구
        if let Err(restore) = fs::rename(&replaced, target).await {
            warn!(
                "Failed to restore {} from {}: {}",
                target.display(),
                replaced.display(),
                restore
            );
        }
        discard(staging).await;
        return Err(e.into());
    }

    discard(&replaced).await;
    info!("Updated {}", target.display());
    Ok(InstallOutcome::Updated)
}

/// 게시 전에 중단된 업데이트에서 기존 에셋 복구
///
/// 대상이 없고 `.replaced-<asset>-*`가 남아 있으면 가장 최근 것을 대상으로 되돌린다.
async fn recover_replaced(target_parent: &Path, asset_name: &str, target: &Path) -> Result<bool> {
    if fs::symlink_metadata(target).await.is_ok() {
        return Ok(false);
    }

    let mut entries = fs::read_dir(target_parent).await?;
    let mut newest: Option<(SystemTime, PathBuf)> = None;
    while let Some(entry) = entries.next_entry().await? {
        if replaced_asset_name(&entry.file_name().to_string_lossy()) != Some(asset_name) {
            continue;
        }
        let modified = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .unwrap_or(SystemTime::UNIX_EPOCH);
        if newest.as_ref().map_or(true, |(newest, _)| modified > *newest) {
            newest = Some((modified, entry.path()));
        }
    }

    let Some((_, replaced)) = newest else {
        return Ok(false);
    };
    fs::rename(&replaced, target).await?;
    warn!(
        "Recovered {} from interrupted update {}",
        target.display(),
        replaced.display()
    );
    Ok(true)
}

/// `.replaced-<asset>-<suffix>`에서 에셋 이름 추출
fn replaced_asset_name(name: &str) -> Option<&str> {
    let rest = name.strip_prefix(REPLACED_PREFIX)?;

    // 보통은 `<asset>-<uuid>`
    if let Some(split) = rest.len().checked_sub(37) {
        if rest.is_char_boundary(split)
            && rest[split..].starts_with('-')
            && uuid::Uuid::parse_str(&rest[split + 1..]).is_ok()
        {
            return Some(&rest[..split]).filter(|asset| !asset.is_empty());
        }
    }
    rest.rsplit_once('-')
        .map(|(asset, _)| asset)
        .filter(|asset| !asset.is_empty())
}

async fn discard(path: &Path) {
    if let Err(e) = fs::remove_dir_all(path).await {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("Failed to remove {}: {}", path.display(), e);
        }
    }
}

/// 충돌로 남은 스테이징/교체 디렉토리 정리
///
/// `max_age`보다 오래된 것만 지운다. 진행 중인 설치의 스테이징을 건드리지 않기 위함.
/// `.replaced-*`는 게시된 에셋이 있을 때만 지운다.
pub async fn sweep_orphaned_staging(target_parent: &Path, max_age: Duration) -> usize {
    let mut entries = match fs::read_dir(target_parent).await {
        Ok(entries) => entries,
        Err(_) => return 0,
    };

    let now = SystemTime::now();
    let mut removed = 0;

    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if name.starts_with(REPLACED_PREFIX) {
            let published = match replaced_asset_name(&name) {
                Some(asset) => fs::symlink_metadata(target_parent.join(asset)).await.is_ok(),
                None => false,
            };
            if !published {
                debug!("Keeping {}: no published asset", entry.path().display());
                continue;
            }
        } else if !name.starts_with(STAGING_PREFIX) {
            continue;
        }

        let age = entry
            .metadata()
            .await
            .and_then(|m| m.modified())
            .ok()
            .and_then(|modified| now.duration_since(modified).ok())
            .unwrap_or_default();
        if age < max_age {
            continue;
        }

        debug!("Removing orphaned {}", entry.path().display());
        if fs::remove_dir_all(entry.path()).await.is_ok() {
            removed += 1;
        }
    }

    if removed > 0 {
        info!("Removed {} orphaned staging directories in {}", removed, target_parent.display());
    }
    removed
}

// ============================================================================
// AssetFetcher - 에셋 가져오기
// ============================================================================

/// 플러그인 에셋 가져오기 (로컬 복사, tarball 다운로드)
#[derive(Clone)]
pub struct AssetFetcher {
    /// HTTP 클라이언트
    client: Client,
}

impl Default for AssetFetcher {
    fn default() -> Self {
        Self::new()
    }
}

impl AssetFetcher {
    pub fn new() -> Self {
        Self {
            client: Client::new(),
        }
    }

    /// 소스의 에셋 내용을 `dest`에 채움
    pub async fn fetch(&self, source: &AssetSourceConfig, dest: &Path) -> Result<()> {
        match source {
            AssetSourceConfig::Local(path) => {
                if !path.is_dir() {
                    return Err(Error::Transfer(format!(
                        "Plugin source {} is not a directory",
                        path.display()
                    )));
                }
                self.copy_dir_recursive(path, dest).await
            }
            AssetSourceConfig::Url(url) => self.fetch_tarball(url, dest).await,
        }
    }

    /// tarball 다운로드 후 압축 해제하여 최상위 디렉토리 내용을 복사
    async fn fetch_tarball(&self, url: &str, dest: &Path) -> Result<()> {
        let scratch = std::env::temp_dir().join(format!("editorlink-download-{}", uuid::Uuid::new_v4()));
        fs::create_dir_all(&scratch).await?;

        let result = async {
            let archive_path = scratch.join("archive.tar.gz");
            self.download_file(url, &archive_path).await?;
            self.extract_tarball(&archive_path, &scratch).await?;
            let extracted = self.find_extracted_dir(&scratch).await?;
            self.copy_dir_recursive(&extracted, dest).await
        }
        .await;

        let _ = fs::remove_dir_all(&scratch).await;
        result
    }

    /// 파일 다운로드
    async fn download_file(&self, url: &str, dest: &Path) -> Result<()> {
        debug!("Downloading {} to {:?}", url, dest);

        let response = self
            .client
            .get(url)
            .header("User-Agent", "EditorLink")
            .send()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        if !response.status().is_success() {
            return Err(Error::Http(format!(
                "Failed to download {}: HTTP {}",
                url,
                response.status()
            )));
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Http(e.to_string()))?;

        fs::write(dest, bytes).await?;
        Ok(())
    }

    /// tarball 압축 해제 (tar는 Windows 10 1803+에도 있음)
    async fn extract_tarball(&self, archive: &Path, dest: &Path) -> Result<()> {
        debug!("Extracting {:?} to {:?}", archive, dest);

        let output = tokio::process::Command::new("tar")
            .arg("-xzf")
            .arg(archive)
            .arg("-C")
            .arg(dest)
            .output()
            .await?;

        if !output.status.success() {
            return Err(Error::Transfer(format!(
                "Failed to extract archive: {}",
                String::from_utf8_lossy(&output.stderr)
            )));
        }

        Ok(())
    }

    /// 압축 해제 후 실제 디렉토리 찾기
    async fn find_extracted_dir(&self, scratch: &Path) -> Result<PathBuf> {
        let mut entries = fs::read_dir(scratch).await?;

        while let Some(entry) = entries.next_entry().await? {
            let path = entry.path();
            if entry.file_type().await?.is_dir() {
                return Ok(path);
            }
        }

        Err(Error::Transfer("No directory found after extraction".into()))
    }

    /// 디렉토리 재귀 복사
    pub async fn copy_dir_recursive(&self, src: &Path, dest: &Path) -> Result<()> {
        fs::create_dir_all(dest).await?;

        let mut entries = fs::read_dir(src).await?;

        while let Some(entry) = entries.next_entry().await? {
            let src_path = entry.path();
            let dest_path = dest.join(entry.file_name());

            if entry.file_type().await?.is_dir() {
                Box::pin(self.copy_dir_recursive(&src_path, &dest_path)).await?;
            } else {
                fs::copy(&src_path, &dest_path).await?;
            }
        }

        Ok(())
    }
}

// ============================================================================
// 테스트
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::plugin::version::{should_install_remote_version, PluginVersion, VERSION_FILE};
    use std::collections::BTreeMap;
    use tempfile::TempDir;

    /// 디렉토리 내용 스냅샷 (상대 경로 -> 내용)
    fn listing(dir: &Path) -> BTreeMap<PathBuf, Vec<u8>> {
        fn walk(root: &Path, dir: &Path, out: &mut BTreeMap<PathBuf, Vec<u8>>) {
            for entry in std::fs::read_dir(dir).unwrap() {
                let path = entry.unwrap().path();
                if path.is_dir() {
                    walk(root, &path, out);
                } else {
                    let rel = path.strip_prefix(root).unwrap().to_path_buf();
                    out.insert(rel, std::fs::read(&path).unwrap());
                }
            }
        }
        let mut out = BTreeMap::new();
        walk(dir, dir, &mut out);
        out
    }

    /// 버전 게이트를 포함한 스테이징 함수
    async fn stage_version(
        installed_dir: PathBuf,
        staging: PathBuf,
        candidate: &'static str,
    ) -> Result<StageOutcome> {
        let installed_marker = installed_dir.join(VERSION_FILE);
        if !should_install_remote_version(&installed_marker, || async { Ok(candidate.to_string()) }).await {
            return Ok(StageOutcome::UpToDate);
        }
        fs::write(staging.join("plugin.py"), format!("# plugin {}", candidate)).await?;
        PluginVersion::parse(candidate)
            .unwrap()
            .write_to(&staging.join(VERSION_FILE))
            .await?;
        Ok(StageOutcome::Staged)
    }

    fn staging_leftovers(parent: &Path) -> usize {
        std::fs::read_dir(parent)
            .unwrap()
            .filter_map(|e| e.ok())
            .filter(|e| {
                let name = e.file_name().to_string_lossy().to_string();
                name.starts_with(STAGING_PREFIX) || name.starts_with(REPLACED_PREFIX)
            })
            .count()
    }

    #[tokio::test]
    async fn test_fresh_install() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let target = temp.path().join("kite");

        let outcome = install_or_update(&cancel, temp.path(), "kite", |staging| {
            stage_version(target.clone(), staging, "1.0.0")
        })
        .await
        .unwrap();

        assert_eq!(outcome, InstallOutcome::Installed);
        assert_eq!(
            PluginVersion::read_from(&target.join(VERSION_FILE)).await,
            Some(PluginVersion::new(1, 0, 0))
        );
        assert_eq!(staging_leftovers(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_newer_version_is_published() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let target = temp.path().join("kite");

        install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, "1.0.0"))
            .await
            .unwrap();
        let outcome =
            install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, "1.0.1"))
                .await
                .unwrap();

        assert_eq!(outcome, InstallOutcome::Updated);
        assert_eq!(
            std::fs::read_to_string(target.join("plugin.py")).unwrap(),
            "# plugin 1.0.1"
        );
        assert_eq!(staging_leftovers(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_same_or_older_version_is_noop() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let target = temp.path().join("kite");

        install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, "2.0.0"))
            .await
            .unwrap();
        let before = listing(temp.path());

        for candidate in ["2.0.0", "1.9.9"] {
            let outcome =
                install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, candidate))
                    .await
                    .unwrap();
            assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        }

        assert_eq!(listing(temp.path()), before);
        assert_eq!(staging_leftovers(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_failed_fetch_keeps_previous_install() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let target = temp.path().join("kite");

        install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, "1.0.0"))
            .await
            .unwrap();
        let before = listing(&target);

        let result = install_or_update(&cancel, temp.path(), "kite", |staging| async move {
            // 일부만 쓰고 실패
            fs::write(staging.join("plugin.py"), "# half written").await?;
            Err(Error::Transfer("connection reset".into()))
        })
        .await;

        assert!(matches!(result, Err(Error::Transfer(_))));
        assert_eq!(listing(&target), before);
        assert_eq!(staging_leftovers(temp.path()), 0);
    }

    #[tokio::test]
    async fn test_crash_before_rename_leaves_install_intact() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let target = temp.path().join("kite");

        install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, "1.0.0"))
            .await
            .unwrap();
        let before = listing(&target);

        // 스테이징 도중 취소 (프로세스 중단과 같은 효과)
        let staging_cancel = CancellationToken::new();
        let trigger = staging_cancel.clone();
        let result = install_or_update(&staging_cancel, temp.path(), "kite", |staging| async move {
            fs::write(staging.join("plugin.py"), "# new but incomplete").await?;
            trigger.cancel();
            std::future::pending::<()>().await;
            Ok(StageOutcome::Staged)
        })
        .await;

        assert!(matches!(result, Err(Error::Cancelled)));
        assert_eq!(listing(&target), before);

        // 스테이징은 남아 있고 스윕이 정리
        assert_eq!(staging_leftovers(temp.path()), 1);
        assert_eq!(sweep_orphaned_staging(temp.path(), Duration::ZERO).await, 1);
        assert_eq!(staging_leftovers(temp.path()), 0);
        assert_eq!(listing(&target), before);
    }

    #[tokio::test]
    async fn test_sweep_respects_max_age() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".staging-kite-1234")).unwrap();
        std::fs::create_dir_all(temp.path().join("kite")).unwrap();

        assert_eq!(
            sweep_orphaned_staging(temp.path(), Duration::from_secs(3600)).await,
            0
        );
        assert_eq!(sweep_orphaned_staging(temp.path(), Duration::ZERO).await, 1);
        assert!(temp.path().join("kite").exists());
    }

    /// 기존 에셋을 옆으로 옮긴 직후 중단된 상태 만들기
    fn interrupted_update(parent: &Path, replaced: &str) -> PathBuf {
        let replaced = parent.join(replaced);
        std::fs::create_dir_all(&replaced).unwrap();
        std::fs::write(replaced.join("plugin.py"), "# plugin 1.0.0").unwrap();
        std::fs::write(replaced.join(VERSION_FILE), "1.0.0").unwrap();
        std::fs::create_dir_all(parent.join(format!(".staging-kite-{}", uuid::Uuid::new_v4()))).unwrap();
        replaced
    }

    #[tokio::test]
    async fn test_sweep_keeps_only_copy_of_previous_asset() {
        let temp = TempDir::new().unwrap();
        let replaced = interrupted_update(temp.path(), ".replaced-kite-1234");

        // 스테이징만 지우고 기존 에셋의 유일한 사본은 남김
        assert_eq!(sweep_orphaned_staging(temp.path(), Duration::ZERO).await, 1);
        assert!(replaced.join("plugin.py").is_file());

        // 게시된 에셋이 있으면 교체 디렉토리는 정리 대상
        std::fs::create_dir_all(temp.path().join("kite")).unwrap();
        assert_eq!(sweep_orphaned_staging(temp.path(), Duration::ZERO).await, 1);
        assert!(!replaced.exists());
    }

    #[tokio::test]
    async fn test_install_recovers_interrupted_update() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();
        let target = temp.path().join("kite");
        let replaced = interrupted_update(
            temp.path(),
            &format!(".replaced-kite-{}", uuid::Uuid::new_v4()),
        );
        sweep_orphaned_staging(temp.path(), Duration::ZERO).await;

        // 복구된 설치와 같은 버전이면 아무 것도 하지 않음
        let outcome = install_or_update(&cancel, temp.path(), "kite", |s| stage_version(target.clone(), s, "1.0.0"))
            .await
            .unwrap();

        assert_eq!(outcome, InstallOutcome::AlreadyInstalled);
        assert!(!replaced.exists());
        assert_eq!(
            std::fs::read_to_string(target.join("plugin.py")).unwrap(),
            "# plugin 1.0.0"
        );
        assert_eq!(staging_leftovers(temp.path()), 0);
    }

    #[test]
    fn test_replaced_asset_name() {
        let id = uuid::Uuid::new_v4();
        assert_eq!(replaced_asset_name(&format!(".replaced-kite-{}", id)), Some("kite"));
        assert_eq!(
            replaced_asset_name(&format!(".replaced-my-plugin-{}", id)),
            Some("my-plugin")
        );
        assert_eq!(replaced_asset_name(".replaced-kite-1234"), Some("kite"));
        assert_eq!(replaced_asset_name(".replaced-kite"), None);
        assert_eq!(replaced_asset_name(".staging-kite-1234"), None);
    }

    #[tokio::test]
    async fn test_invalid_asset_name() {
        let temp = TempDir::new().unwrap();
        let cancel = CancellationToken::new();

        for name in ["../escape", ".", "..", ""] {
            let result = install_or_update(&cancel, temp.path(), name, |_| async {
                Ok(StageOutcome::Staged)
            })
            .await;
            assert!(matches!(result, Err(Error::InvalidInput(_))), "{:?}", name);
        }
    }

    #[tokio::test]
    async fn test_concurrent_installs_are_serialized() {
        let temp = TempDir::new().unwrap();
        let parent = temp.path().to_path_buf();
        let target = parent.join("kite");

        let tasks: Vec<_> = (0..4)
            .map(|_| {
                let parent = parent.clone();
                let target = target.clone();
                tokio::spawn(async move {
                    let cancel = CancellationToken::new();
                    install_or_update(&cancel, &parent, "kite", |s| stage_version(target, s, "1.0.0")).await
                })
            })
            .collect();

        let mut installed = 0;
        for task in tasks {
            match task.await.unwrap().unwrap() {
                InstallOutcome::Installed => installed += 1,
                InstallOutcome::AlreadyInstalled => {}
                InstallOutcome::Updated => panic!("same version must not be re-published"),
            }
        }

        assert_eq!(installed, 1);
        assert_eq!(staging_leftovers(&parent), 0);
    }

    #[tokio::test]
    async fn test_fetch_local_source() {
        let temp = TempDir::new().unwrap();
        let source = temp.path().join("source");
        std::fs::create_dir_all(source.join("lib")).unwrap();
        std::fs::write(source.join("lib").join("plugin.vim"), "\" plugin").unwrap();

        let dest = temp.path().join("dest");
        AssetFetcher::new()
            .fetch(&AssetSourceConfig::Local(source.clone()), &dest)
            .await
            .unwrap();

        assert_eq!(listing(&dest), listing(&source));

        let missing = AssetFetcher::new()
            .fetch(&AssetSourceConfig::Local(temp.path().join("nope")), &dest)
            .await;
        assert!(matches!(missing, Err(Error::Transfer(_))));
    }
}
