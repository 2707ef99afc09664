//! tradews - authenticated trading WebSocket client.

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tradews_bot::{AppConfig, Application, Args};

#[tokio::main]
async fn main() -> Result<()> {
    tradews_ws::init_crypto();

    let args = Args::parse();
    let command = args.command();

    let config_path = AppConfig::resolve_path(args.config);
    let config = AppConfig::from_file(&config_path)?;

    tradews_telemetry::init_logging_with(&config.logging)?;
    info!("Starting tradews v{}", env!("CARGO_PKG_VERSION"));
    info!(config_path = %config_path, endpoint = %config.endpoint, "Configuration loaded");

    let app = Application::new(config)?;
    app.execute(command).await?;

    Ok(())
}
