//! Install Policy Gate - 실행 중 설치/업데이트/제거 허용 여부
//!
//! 모든 패밀리가 같은 규칙을 쓰도록 한 곳에 둡니다. 호출자는 게이트 직전에
//! `InstallConfig`를 새로 계산해야 합니다.

use super::traits::InstallConfig;
use serde::{Deserialize, Serialize};

/// 게이트 대상 작업
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Install,
    Update,
    Uninstall,
}

impl Operation {
    /// 실행 중에도 이 작업이 허용되는지
    fn allowed_while_running(&self, cfg: &InstallConfig) -> bool {
        match self {
            Operation::Install => cfg.install_while_running,
            Operation::Update => cfg.update_while_running,
            Operation::Uninstall => cfg.uninstall_while_running,
        }
    }
}

impl std::fmt::Display for Operation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Install => write!(f, "install"),
            Self::Update => write!(f, "update"),
            Self::Uninstall => write!(f, "uninstall"),
        }
    }
}

/// 작업 진행 가능 여부
///
/// 실행 중이고 해당 작업의 허용 플래그가 꺼져 있을 때만 false.
pub fn may_proceed(op: Operation, cfg: &InstallConfig) -> bool {
    !cfg.running || op.allowed_while_running(cfg)
}
