//! Family Config - 설정 파일로 정의하는 에디터 패밀리

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// 플러그인 에셋 소스
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum AssetSourceConfig {
    /// 로컬 디렉토리 (그대로 복사)
    Local(PathBuf),
    /// tar.gz URL (다운로드 후 압축 해제)
    Url(String),
}

/// 에디터 패밀리 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FamilyConfig {
    /// 패밀리 ID (예: "vim")
    pub id: String,

    /// 표시 이름
    pub name: String,

    /// 추가로 응답하는 ID 목록
    #[serde(default)]
    pub aliases: Vec<String>,

    /// 설치 위치 glob 패턴
    #[serde(default)]
    pub patterns: Vec<String>,

    /// PATH에서 찾을 실행 파일 이름
    #[serde(default)]
    pub binaries: Vec<String>,

    /// 존재하면 에디터가 실행 중이라고 판단하는 glob 패턴 (lock 파일 등)
    #[serde(default)]
    pub running_markers: Vec<String>,

    /// 에디터 위치 기준 플러그인 디렉토리 (상대 경로)
    #[serde(default = "default_plugin_dir")]
    pub plugin_dir: String,

    /// 반드시 존재해야 하는 설정 디렉토리 (에디터를 한 번 실행하면 생김)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config_dir: Option<PathBuf>,

    /// 플러그인 에셋 소스
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<AssetSourceConfig>,

    /// 소스가 제공하는 플러그인 버전
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    /// 설치 후 재시작 필요 여부
    #[serde(default)]
    pub restart_required: bool,

    /// 여러 설치 위치 지원 여부
    #[serde(default)]
    pub multiple_install_locations: bool,

    /// 실행 중 설치 허용
    #[serde(default)]
    pub install_while_running: bool,

    /// 실행 중 업데이트 허용
    #[serde(default)]
    pub update_while_running: bool,

    /// 실행 중 제거 허용
    #[serde(default)]
    pub uninstall_while_running: bool,
}

fn default_plugin_dir() -> String {
    "editorlink-plugin".to_string()
}

impl FamilyConfig {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
            patterns: Vec::new(),
            binaries: Vec::new(),
            running_markers: Vec::new(),
            plugin_dir: default_plugin_dir(),
            config_dir: None,
            source: None,
            version: None,
            restart_required: false,
            multiple_install_locations: false,
            install_while_running: false,
            update_while_running: false,
            uninstall_while_running: false,
        }
    }

    pub fn with_alias(mut self, alias: impl Into<String>) -> Self {
        self.aliases.push(alias.into());
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.patterns.push(pattern.into());
        self
    }

    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binaries.push(binary.into());
        self
    }

    pub fn with_running_marker(mut self, marker: impl Into<String>) -> Self {
        self.running_markers.push(marker.into());
        self
    }

    pub fn with_plugin_dir(mut self, dir: impl Into<String>) -> Self {
        self.plugin_dir = dir.into();
        self
    }

    pub fn with_config_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config_dir = Some(dir.into());
        self
    }

    pub fn with_source(mut self, source: AssetSourceConfig, version: impl Into<String>) -> Self {
        self.source = Some(source);
        self.version = Some(version.into());
        self
    }

    /// 실행 중 허용 플래그 일괄 설정 (install, update, uninstall)
    pub fn while_running(mut self, install: bool, update: bool, uninstall: bool) -> Self {
        self.install_while_running = install;
        self.update_while_running = update;
        self.uninstall_while_running = uninstall;
        self
    }
}
