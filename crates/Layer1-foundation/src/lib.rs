//! # editorlink-foundation
//!
//! Foundation layer for EditorLink:
//! - Error: 에러 분류 (감지 실패, 정책 거부, 전송 실패, 설정 누락)
//! - Storage: JsonStore (범용), SettingsStore (키-값 설정)
//! - Config: 통합 설정 (EditorLinkConfig, FamilyConfig)

pub mod config;
pub mod error;
pub mod storage;

// ============================================================================
// Error
// ============================================================================
pub use error::{Error, Result};

// ============================================================================
// Config (설정)
// ============================================================================
pub use config::{AssetSourceConfig, DriverConfig, EditorLinkConfig, FamilyConfig, CONFIG_FILE};

// ============================================================================
// Storage (저장소)
// ============================================================================
pub use storage::{
    // JSON (범용)
    JsonStore,
    APP_DIR_NAME,
    // Settings (키-값)
    JsonSettingsStore,
    MemorySettingsStore,
    SettingsStore,
    AUTO_INSTALLED_IDS_KEY,
    AUTO_INSTALL_ENABLED_KEY,
    ENCOUNTERED_EDITORS_KEY,
    SETTINGS_FILE,
};
