//! 설정에서 매니저 구성

use editorlink_core::{ConfiguredFamily, EditorPlugin, EditorRegistry, PluginManager};
use editorlink_foundation::{EditorLinkConfig, JsonSettingsStore, Result};
use std::sync::Arc;
use tracing::{debug, warn};

/// CLI 실행 컨텍스트
pub struct App {
    pub config: EditorLinkConfig,
    pub manager: Arc<PluginManager>,
}

impl App {
    /// 설정으로 매니저, 레지스트리, 설정 저장소 구성
    pub fn from_config(config: EditorLinkConfig) -> Result<Self> {
        let store = config.data_store()?;
        debug!("Using data directory {}", store.base_dir().display());

        let registry = Arc::new(EditorRegistry::open(store.clone()));
        let settings = Arc::new(JsonSettingsStore::open(store)?);

        if config.families.is_empty() {
            warn!("No editor families configured");
        }

        let plugins: Vec<Arc<dyn EditorPlugin>> = config
            .families
            .iter()
            .cloned()
            .map(|family| {
                Arc::new(ConfiguredFamily::new(family).with_beta_channel(config.beta_channel))
                    as Arc<dyn EditorPlugin>
            })
            .collect();

        let manager = PluginManager::new(plugins, registry, settings)
            .with_auto_install_default(config.auto_install_default);

        Ok(Self {
            config,
            manager: Arc::new(manager),
        })
    }
}
