//! Plugin Version - 설치된 플러그인 버전과 원격 후보 버전 비교
//!
//! 버전 게이트의 기본 정책은 "가용성 우선"입니다.
//!
//! - 설치된 버전 파일이 없으면 아주 오래된 버전으로 간주 (버전 파일이 없던
//!   예전 설치에서 업그레이드 가능)
//! - 설치된 버전이나 원격 버전을 읽을 수 없으면 설치를 진행
//! - 둘 다 읽을 수 있으면 원격 버전이 엄격하게 클 때만 설치

use editorlink_foundation::Result;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::future::Future;
use std::path::Path;
use tracing::debug;

/// 플러그인 에셋 안의 버전 파일명
pub const VERSION_FILE: &str = "plugin-version.txt";

/// 플러그인 버전
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct PluginVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PluginVersion {
    pub fn new(major: u32, minor: u32, patch: u32) -> Self {
        Self {
            major,
            minor,
            patch,
        }
    }

    /// 버전 문자열 파싱 (예: "1.2.3", "v1.2", "2\n")
    ///
    /// 빠진 부분은 0으로 채운다.
    pub fn parse(s: &str) -> Option<Self> {
        let s = s.trim();
        let s = s.strip_prefix('v').unwrap_or(s);
        if s.is_empty() {
            return None;
        }

        let parts: Vec<&str> = s.split('.').collect();
        if parts.len() > 3 {
            return None;
        }

        let mut numbers = [0u32; 3];
        for (i, part) in parts.iter().enumerate() {
            numbers[i] = part.parse().ok()?;
        }

        Some(Self::new(numbers[0], numbers[1], numbers[2]))
    }

    /// 버전 파일 읽기 (파일이 없거나 형식이 잘못되면 None)
    pub async fn read_from(path: &Path) -> Option<Self> {
        let content = tokio::fs::read_to_string(path).await.ok()?;
        Self::parse(&content)
    }

    /// 버전 파일 쓰기
    pub async fn write_to(&self, path: &Path) -> Result<()> {
        tokio::fs::write(path, format!("{}\n", self)).await?;
        Ok(())
    }
}

impl PartialOrd for PluginVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for PluginVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        (self.major, self.minor, self.patch).cmp(&(other.major, other.minor, other.patch))
    }
}

impl std::fmt::Display for PluginVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// 원격 후보 버전을 설치해야 하는지 판단
///
/// `latest_remote`는 설치된 버전 파일을 읽을 수 있을 때만 호출된다.
pub async fn should_install_remote_version<F, Fut>(installed_version_file: &Path, latest_remote: F) -> bool
where
    F: FnOnce() -> Fut,
    Fut: Future<Output = Result<String>>,
{
    let installed = match tokio::fs::read_to_string(installed_version_file).await {
        Ok(content) => content,
        Err(_) => {
            debug!(
                "No version marker at {}, treating install as outdated",
                installed_version_file.display()
            );
            return true;
        }
    };

    let Some(installed) = PluginVersion::parse(&installed) else {
        return true;
    };

    let remote = match latest_remote().await {
        Ok(remote) => remote,
        Err(e) => {
            debug!("Remote version lookup failed, installing anyway: {}", e);
            return true;
        }
    };

    let Some(remote) = PluginVersion::parse(&remote) else {
        return true;
    };

    debug!("Installed plugin version {}, candidate {}", installed, remote);
    remote > installed
}

#[cfg(test)]
mod tests {
    use super::*;
    use editorlink_foundation::Error;
    use tempfile::TempDir;

    #[test]
    fn test_parse() {
        assert_eq!(PluginVersion::parse("1.2.3"), Some(PluginVersion::new(1, 2, 3)));
        assert_eq!(PluginVersion::parse("v1.7\n"), Some(PluginVersion::new(1, 7, 0)));
        assert_eq!(PluginVersion::parse("2"), Some(PluginVersion::new(2, 0, 0)));
        assert_eq!(PluginVersion::parse(""), None);
        assert_eq!(PluginVersion::parse("1.2.3.4"), None);
        assert_eq!(PluginVersion::parse("1.x"), None);
    }

    #[test]
    fn test_ordering() {
        assert!(PluginVersion::new(1, 10, 0) > PluginVersion::new(1, 9, 9));
        assert!(PluginVersion::new(2, 0, 0) > PluginVersion::new(1, 99, 99));
        assert_eq!(
            PluginVersion::new(1, 2, 3).cmp(&PluginVersion::new(1, 2, 3)),
            Ordering::Equal
        );
    }

    async fn check(installed: Option<&str>, remote: Result<String>) -> bool {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(VERSION_FILE);
        if let Some(v) = installed {
            std::fs::write(&file, v).unwrap();
        }
        should_install_remote_version(&file, || async move { remote }).await
    }

    #[tokio::test]
    async fn test_strictly_newer_only() {
        assert!(check(Some("1.2.3"), Ok("1.2.4".into())).await);
        assert!(!check(Some("1.2.3"), Ok("1.2.3".into())).await);
        assert!(!check(Some("1.2.3"), Ok("1.2.2".into())).await);
    }

    #[tokio::test]
    async fn test_availability_fallbacks() {
        // 버전 파일 없음
        assert!(check(None, Ok("0.0.1".into())).await);
        // 설치된 버전 파싱 실패
        assert!(check(Some("garbage"), Ok("1.0.0".into())).await);
        // 원격 조회 실패
        assert!(check(Some("1.0.0"), Err(Error::Http("HTTP 500".into()))).await);
        // 원격 버전 파싱 실패
        assert!(check(Some("1.0.0"), Ok("latest".into())).await);
    }

    #[tokio::test]
    async fn test_remote_not_queried_without_marker() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(VERSION_FILE);

        let queried = std::sync::atomic::AtomicBool::new(false);

        let result = should_install_remote_version(&file, || async {
            queried.store(true, std::sync::atomic::Ordering::SeqCst);
            Ok("0.0.1".to_string())
        })
        .await;
        assert!(result);
        assert!(!queried.load(std::sync::atomic::Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_read_write_marker() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join(VERSION_FILE);

        PluginVersion::new(1, 7, 0).write_to(&file).await.unwrap();
        assert_eq!(PluginVersion::read_from(&file).await, Some(PluginVersion::new(1, 7, 0)));
    }
}
