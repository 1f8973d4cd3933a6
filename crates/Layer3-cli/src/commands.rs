//! CLI 서브커맨드

use crate::app::App;
use clap::{Subcommand, ValueEnum};
use editorlink_core::{BackgroundDriver, InstallOptions};
use editorlink_foundation::{Error, Result};
use serde_json::{json, Value};
use std::path::PathBuf;
use tokio_util::sync::CancellationToken;
use tracing::info;

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Show plugin status (all families, or one)
    Status {
        /// Family ID
        id: Option<String>,
    },

    /// Detect editors and run the auto-install sweep
    Refresh,

    /// Install the plugin at an editor location
    Install {
        id: String,
        path: PathBuf,

        /// Install even if the editor is running
        #[arg(long)]
        ignore_running: bool,
    },

    /// Uninstall the plugin from an editor location
    Uninstall { id: String, path: PathBuf },

    /// Uninstall the plugin from every installed location
    UninstallAll,

    /// Update the plugin at every installed location of a family
    Update { id: String },

    /// Show or extend the set of encountered families
    Encountered {
        /// Families to mark as encountered
        #[arg(long = "add", value_name = "ID")]
        add: Vec<String>,
    },

    /// Show families installed by the auto-install sweep
    AutoInstalled {
        /// Clear the record after reading it
        #[arg(long)]
        take: bool,
    },

    /// Show or set the auto-install flag
    AutoInstall { state: Option<Toggle> },

    /// Remember a manually specified editor path
    AddPath { id: String, path: PathBuf },

    /// Forget a manually specified editor path
    RemovePath { id: String, path: PathBuf },

    /// Open a file in an editor
    Open {
        id: String,
        file: PathBuf,

        #[arg(long)]
        line: Option<u32>,

        #[arg(long)]
        editor_path: Option<PathBuf>,
    },

    /// Run the background driver until Ctrl-C
    Watch,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum Toggle {
    On,
    Off,
}

/// 서브커맨드 실행 (출력할 JSON 반환, 출력이 없으면 None)
pub async fn run(app: &App, command: Command, cancel: &CancellationToken) -> Result<Option<Value>> {
    let manager = &app.manager;

    let value = match command {
        Command::Status { id: Some(id) } => to_json(&manager.status(cancel, &id).await?)?,
        Command::Status { id: None } => to_json(&manager.status_all(cancel).await)?,
        Command::Refresh => to_json(&manager.refresh_and_auto_install(cancel).await)?,
        Command::Install {
            id,
            path,
            ignore_running,
        } => {
            let options = InstallOptions { ignore_running };
            to_json(&manager.install(cancel, &id, &path, options).await?)?
        }
        Command::Uninstall { id, path } => to_json(&manager.uninstall(cancel, &id, &path).await?)?,
        Command::UninstallAll => to_json(&manager.uninstall_all(cancel).await)?,
        Command::Update { id } => {
            let updated = manager.update(cancel, &id).await?;
            json!({ "id": id, "updated": updated })
        }
        Command::Encountered { add } if add.is_empty() => to_json(&manager.encountered())?,
        Command::Encountered { add } => to_json(&manager.save_encountered(add)?)?,
        Command::AutoInstalled { take: true } => to_json(&manager.take_auto_installed()?)?,
        Command::AutoInstalled { take: false } => to_json(&manager.auto_installed())?,
        Command::AutoInstall { state } => {
            if let Some(state) = state {
                manager.set_auto_install_enabled(state == Toggle::On)?;
            }
            json!({ "enabled": manager.auto_install_enabled() })
        }
        Command::AddPath { id, path } => to_json(&manager.add_editor_path(cancel, &id, &path).await?)?,
        Command::RemovePath { id, path } => {
            to_json(&manager.remove_editor_path(cancel, &id, &path).await?)?
        }
        Command::Open {
            id,
            file,
            line,
            editor_path,
        } => {
            let completion = manager
                .open_file(cancel, &id, editor_path.as_deref(), &file, line)
                .await?;
            if let Some(completion) = completion {
                completion
                    .await
                    .map_err(|_| Error::Internal("Editor process was dropped".to_string()))??;
            }
            json!({ "id": id, "file": file })
        }
        Command::Watch => {
            let driver = BackgroundDriver::new(manager.clone(), app.config.driver.clone());
            driver.run(cancel.clone()).await;
            info!("Watch finished");
            return Ok(None);
        }
    };

    Ok(Some(value))
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<Value> {
    Ok(serde_json::to_value(value)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use editorlink_foundation::{AssetSourceConfig, EditorLinkConfig, FamilyConfig};
    use tempfile::TempDir;

    struct Fixture {
        temp: TempDir,
        app: App,
    }

    impl Fixture {
        fn new() -> Self {
            let temp = TempDir::new().unwrap();
            let source = temp.path().join("source");
            std::fs::create_dir_all(&source).unwrap();
            std::fs::write(source.join("editorlink.lua"), "-- plugin").unwrap();
            std::fs::create_dir_all(temp.path().join("editors/nvim-0.10")).unwrap();

            let family = FamilyConfig::new("nvim", "Neovim")
                .with_pattern(temp.path().join("editors/nvim-*").to_string_lossy())
                .with_plugin_dir("lua/editorlink")
                .with_source(AssetSourceConfig::Local(source), "1.0.0");
            let config = EditorLinkConfig::new()
                .data_dir(temp.path().join("data"))
                .with_family(family);

            let app = App::from_config(config).unwrap();
            Self { temp, app }
        }

        fn editor(&self) -> PathBuf {
            self.temp.path().join("editors/nvim-0.10")
        }

        async fn run(&self, command: Command) -> Result<Option<Value>> {
            run(&self.app, command, &CancellationToken::new()).await
        }
    }

    #[tokio::test]
    async fn test_install_and_status() {
        let fixture = Fixture::new();

        let status = fixture
            .run(Command::Install {
                id: "nvim".to_string(),
                path: fixture.editor(),
                ignore_running: false,
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(status["editors"][0]["installed"], json!(true));
        assert!(fixture.editor().join("lua/editorlink/editorlink.lua").is_file());

        let all = fixture.run(Command::Status { id: None }).await.unwrap().unwrap();
        assert_eq!(all.as_array().map(Vec::len), Some(1));
        assert_eq!(all[0]["id"], json!("nvim"));
    }

    #[tokio::test]
    async fn test_unknown_family() {
        let fixture = Fixture::new();
        let err = fixture
            .run(Command::Update {
                id: "emacs".to_string(),
            })
            .await
            .unwrap_err();
        assert!(matches!(err, Error::FamilyNotFound(_)));
    }

    #[tokio::test]
    async fn test_encountered_and_auto_install_flag() {
        let fixture = Fixture::new();

        let encountered = fixture
            .run(Command::Encountered {
                add: vec!["nvim".to_string()],
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(encountered, json!({ "nvim": true }));

        let flag = fixture
            .run(Command::AutoInstall {
                state: Some(Toggle::Off),
            })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(flag, json!({ "enabled": false }));
    }

    #[tokio::test]
    async fn test_refresh_auto_installs() {
        let fixture = Fixture::new();

        fixture.run(Command::Refresh).await.unwrap();
        assert!(fixture.editor().join("lua/editorlink").is_dir());

        let taken = fixture
            .run(Command::AutoInstalled { take: true })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(taken, json!(["nvim"]));

        let again = fixture
            .run(Command::AutoInstalled { take: false })
            .await
            .unwrap()
            .unwrap();
        assert_eq!(again, Value::Null);
    }
}
