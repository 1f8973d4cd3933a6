//! Error types for EditorLink
//!
//! 모든 에러를 중앙에서 관리

use std::path::{Path, PathBuf};
use thiserror::Error;

/// Result type alias
pub type Result<T> = std::result::Result<T, Error>;

/// EditorLink 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // 설정 관련
    // ========================================================================
    #[error("Configuration error: {0}")]
    Config(String),

    /// 에디터를 한 번도 실행하지 않아 설정 디렉토리가 없는 경우
    #[error("Configuration directory of {family} is missing: {}", path.display())]
    ConfigMissing { family: String, path: PathBuf },

    // ========================================================================
    // 저장소 관련
    // ========================================================================
    #[error("Storage error: {0}")]
    Storage(String),

    // ========================================================================
    // 에디터 / 플러그인 관련
    // ========================================================================
    #[error("Editor family not found: {0}")]
    FamilyNotFound(String),

    #[error("Failed to detect {family} editors: {message}")]
    Detection { family: String, message: String },

    #[error("Failed to {operation} {family}{}: a process is running", at_path(path.as_deref()))]
    PolicyRejected {
        family: String,
        operation: String,
        path: Option<PathBuf>,
    },

    #[error("Transfer failed: {0}")]
    Transfer(String),

    #[error("Plugin error: {family} - {message}")]
    Plugin { family: String, message: String },

    // ========================================================================
    // 실행 관련
    // ========================================================================
    #[error("Cancelled")]
    Cancelled,

    // ========================================================================
    // 일반
    // ========================================================================
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    // ========================================================================
    // 외부 에러 변환
    // ========================================================================
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("HTTP error: {0}")]
    Http(String),

    // ========================================================================
    // 기타
    // ========================================================================
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// 다음 주기에 재시도할 가치가 있는 에러인지 확인
    ///
    /// 정책 거부는 재시도가 아니라 다른 머신 상태가 필요하므로 제외
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            Error::Transfer(_)
                | Error::Http(_)
                | Error::Io(_)
                | Error::Cancelled
                | Error::Plugin { .. }
        )
    }

    /// 호출자에게 "conflict"로 노출되는 에러인지 확인
    pub fn is_conflict(&self) -> bool {
        matches!(
            self,
            Error::PolicyRejected { .. }
                | Error::ConfigMissing { .. }
                | Error::Detection { .. }
                | Error::Plugin { .. }
                | Error::Transfer(_)
                | Error::Http(_)
        )
    }

    /// 정책 거부인지 확인
    pub fn is_policy_rejected(&self) -> bool {
        matches!(self, Error::PolicyRejected { .. })
    }

    /// 사용자에게 보여줄 짧은 메시지
    ///
    /// 진단용 상세 내용은 `Display`로 로그에 남긴다.
    pub fn user_message(&self) -> String {
        match self {
            Error::ConfigMissing { family, .. } => {
                format!("Please launch {} once, then try again.", family)
            }
            Error::PolicyRejected { family, .. } => {
                format!("Please quit {} and try again.", family)
            }
            Error::Transfer(_) | Error::Http(_) => {
                "The plugin could not be downloaded. Please check your connection.".to_string()
            }
            Error::FamilyNotFound(id) => format!("Unknown editor: {}", id),
            Error::Cancelled => "The operation was cancelled.".to_string(),
            Error::InvalidInput(msg) | Error::NotFound(msg) => msg.clone(),
            other => other.to_string(),
        }
    }

    /// 정책 거부 에러 생성 헬퍼
    pub fn policy_rejected(
        family: impl Into<String>,
        operation: impl std::fmt::Display,
        path: Option<&Path>,
    ) -> Self {
        Error::PolicyRejected {
            family: family.into(),
            operation: operation.to_string(),
            path: path.map(Path::to_path_buf),
        }
    }

    /// 감지 실패 에러 생성 헬퍼
    pub fn detection(family: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Detection {
            family: family.into(),
            message: message.into(),
        }
    }

    /// 플러그인 작업 실패 에러 생성 헬퍼
    pub fn plugin(family: impl Into<String>, message: impl Into<String>) -> Self {
        Error::Plugin {
            family: family.into(),
            message: message.into(),
        }
    }
}

// ============================================================================
// From 구현 (추가 변환)
// ============================================================================

fn at_path(path: Option<&Path>) -> String {
    path.map(|p| format!(" at path {}", p.display()))
        .unwrap_or_default()
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Error::Internal(s)
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Error::Internal(s.to_string())
    }
}
