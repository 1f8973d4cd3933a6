//! Storage module for EditorLink
//!
//! - `json`: JSON - 범용 파일 저장/로드
//! - `settings`: 키-값 설정 저장소 (자동 설치 플래그, 만난 에디터 목록 등)

mod json;
mod settings;

// JSON Storage (범용)
pub use json::{JsonStore, APP_DIR_NAME};

// Settings Storage
pub use settings::{
    JsonSettingsStore, MemorySettingsStore, SettingsStore, AUTO_INSTALLED_IDS_KEY,
    AUTO_INSTALL_ENABLED_KEY, ENCOUNTERED_EDITORS_KEY, SETTINGS_FILE,
};
