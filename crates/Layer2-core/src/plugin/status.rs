//! Plugin Status - 패밀리별 설치 상태 집계
//!
//! 상태는 항상 현재 감지 결과와 레지스트리 내용으로 다시 계산합니다.
//! 설치 여부는 호출 사이에 바뀔 수 있으므로 캐시하지 않습니다.

use super::traits::{EditorLocation, EditorPlugin, InstallConfig};
use editorlink_foundation::Error;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// 에디터 위치별 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorStatus {
    #[serde(flatten)]
    pub location: EditorLocation,

    /// 플러그인 설치 여부
    pub installed: bool,
}

/// 에디터 패밀리 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PluginStatus {
    pub id: String,
    pub name: String,

    /// 계산 시점의 설치 설정
    pub config: InstallConfig,

    /// 사용자가 이미 본 패밀리인지
    pub encountered: bool,

    pub editors: Vec<EditorStatus>,
}

impl PluginStatus {
    /// 위치 목록으로 상태 계산
    pub async fn compute(
        cancel: &CancellationToken,
        plugin: &dyn EditorPlugin,
        locations: Vec<EditorLocation>,
    ) -> Self {
        let editors = locations
            .into_iter()
            .map(|location| EditorStatus {
                installed: plugin.is_installed(&location.path),
                location,
            })
            .collect();

        Self {
            id: plugin.id().to_string(),
            name: plugin.name().to_string(),
            config: plugin.install_config(cancel).await,
            encountered: false,
            editors,
        }
    }

    /// 플러그인이 설치된 위치가 하나라도 있는지
    pub fn any_installed(&self) -> bool {
        self.editors.iter().any(|e| e.installed)
    }
}

/// 작업 실패 보고 (짧은 제목 + 진단 상세)
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OperationError {
    pub title: String,
    pub detail: String,
}

impl OperationError {
    pub fn new(title: impl Into<String>, error: &Error) -> Self {
        Self {
            title: title.into(),
            detail: error.to_string(),
        }
    }
}

/// 전체 제거 결과
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UninstallAllReport {
    pub plugins: Vec<PluginStatus>,

    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<OperationError>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_editor_status_is_flattened() {
        let status = EditorStatus {
            location: EditorLocation::new("/opt/atom").with_version("1.40.0"),
            installed: true,
        };

        let json = serde_json::to_value(&status).unwrap();
        assert_eq!(json["path"], "/opt/atom");
        assert_eq!(json["version"], "1.40.0");
        assert_eq!(json["installed"], true);
        assert!(json.get("location").is_none());
    }

    #[test]
    fn test_any_installed() {
        let mut status = PluginStatus {
            id: "atom".into(),
            name: "Atom".into(),
            config: InstallConfig::default(),
            encountered: false,
            editors: vec![EditorStatus {
                location: EditorLocation::new(PathBuf::from("/opt/atom")),
                installed: false,
            }],
        };
        assert!(!status.any_installed());

        status.editors[0].installed = true;
        assert!(status.any_installed());
    }

    #[test]
    fn test_uninstall_report_omits_empty_errors() {
        let report = UninstallAllReport::default();
        let json = serde_json::to_value(&report).unwrap();
        assert!(json.get("errors").is_none());

        let error = Error::Transfer("disk full".into());
        let report = UninstallAllReport {
            plugins: Vec::new(),
            errors: vec![OperationError::new("Failed to uninstall Atom at path /opt/atom", &error)],
        };
        let json = serde_json::to_value(&report).unwrap();
        assert_eq!(json["errors"][0]["detail"], "Transfer failed: disk full");
    }
}
