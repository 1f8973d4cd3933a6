//! # Plugin Lifecycle
//!
//! 에디터 플러그인 설치/업데이트/제거와 자동 설치를 관리합니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                    BackgroundDriver                         │
//! │        (purge → detect running → update → auto-install)     │
//! └──────────────────────────┬──────────────────────────────────┘
//!                            │
//! ┌──────────────────────────▼──────────────────────────────────┐
//! │                     PluginManager                           │
//! │  ┌────────────────┬──────────────┬───────────────────────┐  │
//! │  │ EditorRegistry │ Policy Gate  │ SettingsStore         │  │
//! │  │ (editors.json) │ (may_proceed)│ (encountered, auto-   │  │
//! │  │                │              │  installed ids)       │  │
//! │  └────────────────┴──────────────┴───────────────────────┘  │
//! │                          │                                  │
//! │  ┌───────────────────────▼───────────────────────────────┐  │
//! │  │ dyn EditorPlugin (패밀리별)                           │  │
//! │  │   install/update → install_or_update (staging+rename) │  │
//! │  └───────────────────────────────────────────────────────┘  │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## 예시
//!
//! ```ignore
//! let registry = Arc::new(EditorRegistry::open(store.clone()));
//! let settings = Arc::new(JsonSettingsStore::open(store)?);
//! let manager = PluginManager::new(plugins, registry, settings);
//!
//! let cancel = CancellationToken::new();
//! let statuses = manager.refresh_and_auto_install(&cancel).await;
//! ```

mod driver;
mod events;
mod installer;
mod manager;
mod paths;
mod policy;
mod registry;
mod status;
mod traits;
mod version;

#[cfg(test)]
pub(crate) mod testing;

pub use driver::{BackgroundDriver, DriverReport, LogReportSink, ReportSink};
pub use events::{EventBus, LifecycleEvent, LifecycleEventKind};
pub use installer::{install_or_update, sweep_orphaned_staging, AssetFetcher, StageOutcome};
pub use manager::{InstallOptions, PluginManager};
pub use paths::{dedupe_paths, normalize_path};
pub use policy::{may_proceed, Operation};
pub use registry::{EditorRegistry, EditorsFile, PathKind, EDITORS_FILE};
pub use status::{EditorStatus, OperationError, PluginStatus, UninstallAllReport};
pub use traits::{
    EditorFamily, EditorLocation, EditorPlugin, InstallConfig, InstallOutcome, OpenFileCompletion,
};
pub use version::{should_install_remote_version, PluginVersion, VERSION_FILE};
