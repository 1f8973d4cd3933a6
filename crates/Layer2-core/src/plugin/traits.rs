//! Plugin traits - 에디터 패밀리별 플러그인 인터페이스
//!
//! 코어는 이 트레이트만 호출합니다. 에디터별 감지 휴리스틱, 마켓플레이스 다운로드,
//! 설정 파일 수정 등은 구현체의 몫입니다.

use async_trait::async_trait;
use editorlink_foundation::Result;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::oneshot;
use tokio_util::sync::CancellationToken;

// ============================================================================
// EditorFamily - 에디터 패밀리 식별 정보
// ============================================================================

/// 설치 대상 에디터 제품군
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EditorFamily {
    /// 전역적으로 유일한 ID
    pub id: String,

    /// 표시 이름
    pub name: String,

    /// 예전 ID 등 추가로 응답하는 ID
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub aliases: Vec<String>,
}

impl EditorFamily {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            aliases: Vec::new(),
        }
    }

    pub fn with_aliases(mut self, aliases: Vec<String>) -> Self {
        self.aliases = aliases;
        self
    }

    /// ID 또는 별칭이 일치하는지 확인
    pub fn answers_to(&self, id: &str) -> bool {
        self.id == id || self.aliases.iter().any(|a| a == id)
    }
}

// ============================================================================
// InstallConfig - 설치 정책 스냅샷
// ============================================================================

/// 호출 시점에 계산되는 설치 설정 스냅샷 (캐시하지 않음)
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InstallConfig {
    /// 설치 후 에디터 재시작 필요
    pub requires_restart: bool,

    /// 여러 설치 위치 동시 지원
    pub multiple_install_locations: bool,

    /// 현재 실행 중인 인스턴스 존재
    pub running: bool,

    /// 실행 중 설치 허용
    pub install_while_running: bool,

    /// 실행 중 업데이트 허용
    pub update_while_running: bool,

    /// 실행 중 제거 허용
    pub uninstall_while_running: bool,
}

// ============================================================================
// EditorLocation - 발견된 에디터 설치 위치
// ============================================================================

/// 에디터 설치 위치와 파생 메타데이터
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EditorLocation {
    /// 절대 경로
    pub path: PathBuf,

    /// 에디터 버전
    #[serde(default)]
    pub version: String,

    /// 호환성 메시지 (호환되면 빈 문자열)
    #[serde(default)]
    pub compatibility: String,

    /// 호환되지 않을 때 필요한 버전
    #[serde(default)]
    pub required_version: String,
}

impl EditorLocation {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Default::default()
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    /// 비호환 표시
    pub fn incompatible(
        mut self,
        message: impl Into<String>,
        required_version: impl Into<String>,
    ) -> Self {
        self.compatibility = message.into();
        self.required_version = required_version.into();
        self
    }

    pub fn is_compatible(&self) -> bool {
        self.compatibility.is_empty()
    }
}

// ============================================================================
// InstallOutcome - 설치/업데이트 결과
// ============================================================================

/// 설치/업데이트 결과
///
/// `AlreadyInstalled`는 실패가 아니다. 원격 후보 버전이 설치된 버전보다
/// 새롭지 않아 아무 것도 하지 않았다는 뜻이다.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstallOutcome {
    /// 새로 설치됨
    Installed,
    /// 기존 설치를 새 버전으로 교체
    Updated,
    /// 이미 최신 버전
    AlreadyInstalled,
}

impl InstallOutcome {
    /// 디스크 상태가 바뀌었는지
    pub fn changed(&self) -> bool {
        !matches!(self, InstallOutcome::AlreadyInstalled)
    }
}

/// 파일 열기 완료 알림 (백그라운드 프로세스 종료 시 전달)
pub type OpenFileCompletion = oneshot::Receiver<Result<()>>;

// ============================================================================
// EditorPlugin Trait - 에디터 패밀리별 구현
// ============================================================================

/// 에디터 패밀리 플러그인 트레이트
///
/// 에디터 제품군마다 한 번 구현합니다. 모든 비동기 메서드는 취소 토큰을
/// 받으며, 토큰이 취소되면 빠르게 반환해야 합니다.
#[async_trait]
pub trait EditorPlugin: Send + Sync {
    /// 패밀리 ID
    fn id(&self) -> &str;

    /// 표시 이름
    fn name(&self) -> &str;

    /// 추가로 응답하는 ID 목록
    fn additional_ids(&self) -> Vec<String> {
        Vec::new()
    }

    /// 패밀리 정보
    fn family(&self) -> EditorFamily {
        EditorFamily::new(self.id(), self.name()).with_aliases(self.additional_ids())
    }

    /// 현재 설치 정책 스냅샷 계산
    async fn install_config(&self, cancel: &CancellationToken) -> InstallConfig;

    /// 일반적인 위치에서 설치된 에디터 감지
    async fn detect_installed(&self, cancel: &CancellationToken) -> Result<Vec<PathBuf>>;

    /// 실행 중인 에디터 감지
    async fn detect_running(&self, cancel: &CancellationToken) -> Result<Vec<PathBuf>>;

    /// 경로를 에디터 위치로 해석 (버전, 호환성)
    async fn describe(&self, cancel: &CancellationToken, path: &Path) -> Result<EditorLocation>;

    /// 해당 위치에 플러그인이 설치되어 있는지 (부수 효과 없음)
    fn is_installed(&self, path: &Path) -> bool;

    /// 플러그인 설치
    async fn install(&self, cancel: &CancellationToken, path: &Path) -> Result<InstallOutcome>;

    /// 플러그인 제거
    async fn uninstall(&self, cancel: &CancellationToken, path: &Path) -> Result<()>;

    /// 플러그인 업데이트
    async fn update(&self, cancel: &CancellationToken, path: &Path) -> Result<InstallOutcome>;

    /// 에디터로 파일 열기
    ///
    /// 백그라운드에서 계속 실행되는 경우 완료 알림을 반환한다.
    async fn open_file(
        &self,
        cancel: &CancellationToken,
        id: &str,
        editor_path: Option<&Path>,
        file: &Path,
        line: Option<u32>,
    ) -> Result<Option<OpenFileCompletion>>;

    /// 패밀리 고유의 설정 상태 검사 (최적 설정이면 true)
    ///
    /// 검사할 것이 없는 패밀리는 None.
    async fn settings_health(&self, _cancel: &CancellationToken) -> Option<bool> {
        None
    }
}
