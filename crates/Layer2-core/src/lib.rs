//! editorlink-core: Core Runtime for EditorLink
//!
//! Layer2 - 에디터 플러그인 라이프사이클 레이어
//!
//! # 주요 모듈
//!
//! - `plugin`: 레지스트리, 정책 게이트, 원자적 설치, 매니저, 백그라운드 드라이버
//! - `family`: 설정 기반 에디터 패밀리 구현
//!
//! # 사용 예시
//!
//! ```ignore
//! use editorlink_core::{BackgroundDriver, ConfiguredFamily, EditorRegistry, PluginManager};
//!
//! let plugins = config
//!     .families
//!     .into_iter()
//!     .map(|f| Arc::new(ConfiguredFamily::new(f)) as Arc<dyn EditorPlugin>)
//!     .collect();
//! let manager = Arc::new(PluginManager::new(plugins, registry, settings));
//!
//! // 상태 조회
//! let statuses = manager.status_all(&cancel).await;
//!
//! // 백그라운드 드라이버
//! BackgroundDriver::new(manager, config.driver).run(cancel).await;
//! ```

pub mod family;
pub mod plugin;

// Re-exports: Family
pub use family::ConfiguredFamily;

// Re-exports: Plugin
pub use plugin::{
    // Driver
    BackgroundDriver,
    DriverReport,
    // Traits
    EditorFamily,
    EditorLocation,
    EditorPlugin,
    // Registry
    EditorRegistry,
    EditorStatus,
    // Events
    EventBus,
    InstallConfig,
    InstallOptions,
    InstallOutcome,
    LifecycleEvent,
    LifecycleEventKind,
    LogReportSink,
    // Policy
    Operation,
    OperationError,
    PathKind,
    // Manager
    PluginManager,
    PluginStatus,
    PluginVersion,
    ReportSink,
    UninstallAllReport,
};
