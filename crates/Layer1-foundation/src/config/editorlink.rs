//! EditorLink Config - 통합 설정
//!
//! 글로벌 설정(~/.config/editorlink/config.json)과 프로젝트 설정
//! (.editorlink/config.json)을 병합합니다.

use crate::storage::JsonStore;
use crate::Result;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::FamilyConfig;

/// 설정 파일명
pub const CONFIG_FILE: &str = "config.json";

// ============================================================================
// EditorLink Config (통합)
// ============================================================================

/// EditorLink 통합 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorLinkConfig {
    /// 버전 (마이그레이션용)
    #[serde(default = "default_version")]
    pub version: u32,

    /// 데이터 디렉토리 (editors.json, settings.json 위치)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_dir: Option<PathBuf>,

    /// 베타 채널 플러그인 사용 (원격 버전 검사 생략)
    #[serde(default)]
    pub beta_channel: bool,

    /// 설정 저장소에 값이 없을 때의 자동 설치 기본값
    #[serde(default = "default_true")]
    pub auto_install_default: bool,

    /// 백그라운드 드라이버 설정
    #[serde(default)]
    pub driver: DriverConfig,

    /// 설정 기반 에디터 패밀리 목록
    #[serde(default)]
    pub families: Vec<FamilyConfig>,
}

impl Default for EditorLinkConfig {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_dir: None,
            beta_channel: false,
            auto_install_default: true,
            driver: DriverConfig::default(),
            families: Vec::new(),
        }
    }
}

impl EditorLinkConfig {
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Load / Save
    // ========================================================================

    /// 글로벌 + 프로젝트 병합 로드
    pub fn load() -> Result<Self> {
        let mut config = Self::new();

        // 1. 글로벌 설정
        if let Ok(global) = JsonStore::global() {
            if let Some(global_config) = global.load_optional::<EditorLinkConfig>(CONFIG_FILE)? {
                config.merge(global_config);
            }
        }

        // 2. 프로젝트 설정
        if let Ok(project) = JsonStore::current_project() {
            if let Some(project_config) = project.load_optional::<EditorLinkConfig>(CONFIG_FILE)? {
                config.merge(project_config);
            }
        }

        Ok(config)
    }

    /// 글로벌 설정 저장
    pub fn save_global(&self) -> Result<()> {
        let store = JsonStore::global()?;
        store.save(CONFIG_FILE, self)
    }

    /// 데이터 저장소 (data_dir이 없으면 플랫폼 기본 경로)
    pub fn data_store(&self) -> Result<JsonStore> {
        match &self.data_dir {
            Some(dir) => Ok(JsonStore::new(dir)),
            None => JsonStore::data(),
        }
    }

    // ========================================================================
    // Merge
    // ========================================================================

    /// 다른 설정과 병합 (other가 우선)
    pub fn merge(&mut self, other: EditorLinkConfig) {
        if other.data_dir.is_some() {
            self.data_dir = other.data_dir;
        }
        self.beta_channel = self.beta_channel || other.beta_channel;
        self.auto_install_default = other.auto_install_default;
        self.driver.merge(other.driver);

        // 같은 ID의 패밀리는 other로 교체
        for family in other.families {
            match self.families.iter_mut().find(|f| f.id == family.id) {
                Some(existing) => *existing = family,
                None => self.families.push(family),
            }
        }
    }

    // ========================================================================
    // Builder
    // ========================================================================

    pub fn data_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.data_dir = Some(dir.into());
        self
    }

    pub fn with_family(mut self, family: FamilyConfig) -> Self {
        self.families.push(family);
        self
    }
}

// ============================================================================
// Driver Config
// ============================================================================

/// 백그라운드 드라이버 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriverConfig {
    /// 전체 업데이트 주기 (초)
    #[serde(default = "default_interval")]
    pub interval_secs: u64,

    /// 실패한 업데이트 재시도 주기 (초)
    #[serde(default = "default_retry_interval")]
    pub retry_interval_secs: u64,
}

impl Default for DriverConfig {
    fn default() -> Self {
        Self {
            interval_secs: default_interval(),
            retry_interval_secs: default_retry_interval(),
        }
    }
}

impl DriverConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs.max(1))
    }

    pub fn retry_interval(&self) -> Duration {
        Duration::from_secs(self.retry_interval_secs.max(1))
    }

    fn merge(&mut self, other: DriverConfig) {
        if other.interval_secs != default_interval() {
            self.interval_secs = other.interval_secs;
        }
        if other.retry_interval_secs != default_retry_interval() {
            self.retry_interval_secs = other.retry_interval_secs;
        }
    }
}

// ============================================================================
// Helpers
// ============================================================================

fn default_version() -> u32 {
    1
}

fn default_interval() -> u64 {
    60 * 60
}

fn default_retry_interval() -> u64 {
    10 * 60
}

fn default_true() -> bool {
    true
}
