//! EditorLink CLI - Main entry point

mod app;
mod commands;

use app::App;
use clap::Parser;
use commands::Command;
use editorlink_foundation::EditorLinkConfig;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// EditorLink - editor plugin lifecycle manager
#[derive(Parser, Debug)]
#[command(name = "editorlink")]
#[command(author, version, about, long_about = None)]
struct Args {
    #[command(subcommand)]
    command: Command,

    /// Enable debug logging
    #[arg(short, long, global = true)]
    debug: bool,

    /// Always redeploy plugins, ignoring installed versions
    #[arg(long, global = true)]
    beta: bool,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    // 로깅 초기화 (stdout은 JSON 출력용)
    let log_level = if args.debug { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(log_level)))
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let mut config = EditorLinkConfig::load()?;
    config.beta_channel |= args.beta;

    let app = App::from_config(config)?;

    let cancel = CancellationToken::new();
    {
        let cancel = cancel.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("Interrupted, shutting down");
                cancel.cancel();
            }
        });
    }

    match commands::run(&app, args.command, &cancel).await {
        Ok(Some(value)) => {
            println!("{}", serde_json::to_string_pretty(&value)?);
            Ok(())
        }
        Ok(None) => Ok(()),
        Err(e) => {
            error!("{:?}", e);
            eprintln!("{}", e.user_message());
            std::process::exit(1);
        }
    }
}
