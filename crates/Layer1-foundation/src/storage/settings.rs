//! Settings Store - 키-값 설정 저장소
//!
//! 자동 설치 플래그, 자동 설치된 플러그인 ID 목록, 사용자가 이미 본 에디터 목록을
//! 영속화합니다. 모든 호출은 동기이며 즉시 디스크에 반영됩니다.

use super::json::JsonStore;
use crate::Result;
use parking_lot::Mutex;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, warn};

/// 설정 파일명
pub const SETTINGS_FILE: &str = "settings.json";

/// 자동 설치 기능 활성화 여부 (bool)
pub const AUTO_INSTALL_ENABLED_KEY: &str = "auto_install_plugins_enabled";

/// 자동 설치된 에디터 패밀리 ID 목록 (string 배열)
pub const AUTO_INSTALLED_IDS_KEY: &str = "auto_installed_plugin_ids";

/// 사용자가 이미 본 에디터 패밀리 맵 (id -> bool)
pub const ENCOUNTERED_EDITORS_KEY: &str = "encountered_editors";

// ============================================================================
// SettingsStore - 설정 저장소 트레이트
// ============================================================================

/// 키-값 설정 저장소
pub trait SettingsStore: Send + Sync {
    /// 값 조회
    fn get_value(&self, key: &str) -> Option<Value>;

    /// 값 저장
    fn set_value(&self, key: &str, value: Value) -> Result<()>;

    /// 값 삭제
    fn delete(&self, key: &str) -> Result<()>;

    /// bool 값 조회
    fn get_bool(&self, key: &str) -> Option<bool> {
        self.get_value(key).and_then(|v| v.as_bool())
    }

    /// bool 값 저장
    fn set_bool(&self, key: &str, value: bool) -> Result<()> {
        self.set_value(key, Value::Bool(value))
    }
}

impl dyn SettingsStore {
    /// 타입 지정 조회 (역직렬화 실패 시 None)
    pub fn get_obj<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let value = self.get_value(key)?;
        match serde_json::from_value(value) {
            Ok(obj) => Some(obj),
            Err(e) => {
                warn!("Ignoring malformed setting {}: {}", key, e);
                None
            }
        }
    }

    /// 타입 지정 저장
    pub fn set_obj<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        self.set_value(key, serde_json::to_value(value)?)
    }
}

// ============================================================================
// JsonSettingsStore - settings.json 기반 구현
// ============================================================================

/// settings.json 기반 설정 저장소
pub struct JsonSettingsStore {
    store: JsonStore,
    values: Mutex<Map<String, Value>>,
}

impl JsonSettingsStore {
    /// 저장소 열기 (파일이 없으면 빈 상태로 시작)
    pub fn open(store: JsonStore) -> Result<Self> {
        let values = store
            .load_optional::<Map<String, Value>>(SETTINGS_FILE)?
            .unwrap_or_default();
        debug!(
            "Loaded {} settings from {}",
            values.len(),
            store.file_path(SETTINGS_FILE).display()
        );
        Ok(Self {
            store,
            values: Mutex::new(values),
        })
    }
}

impl SettingsStore for JsonSettingsStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        let mut values = self.values.lock();
        values.insert(key.to_string(), value);
        self.store.save(SETTINGS_FILE, &*values)
    }

    fn delete(&self, key: &str) -> Result<()> {
        let mut values = self.values.lock();
        if values.remove(key).is_some() {
            self.store.save(SETTINGS_FILE, &*values)?;
        }
        Ok(())
    }
}

// ============================================================================
// MemorySettingsStore - 메모리 구현 (테스트용)
// ============================================================================

/// 메모리 설정 저장소
#[derive(Default)]
pub struct MemorySettingsStore {
    values: Mutex<Map<String, Value>>,
}

impl MemorySettingsStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl SettingsStore for MemorySettingsStore {
    fn get_value(&self, key: &str) -> Option<Value> {
        self.values.lock().get(key).cloned()
    }

    fn set_value(&self, key: &str, value: Value) -> Result<()> {
        self.values.lock().insert(key.to_string(), value);
        Ok(())
    }

    fn delete(&self, key: &str) -> Result<()> {
        self.values.lock().remove(key);
        Ok(())
    }
}
