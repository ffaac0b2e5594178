//! Bastion API server
//!
//! Reads configuration from the JSON file named by `BASTION_CONFIG`, or
//! falls back to the built-in defaults.

use anyhow::Context;
use bastion_api::{start_server, AppState};
use bastion_core::AppConfig;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env()
                .add_directive("bastion=debug".parse()?)
                .add_directive("amm=debug".parse()?)
                .add_directive("info".parse()?),
        )
        .init();

    let config = match std::env::var("BASTION_CONFIG") {
        Ok(path) => {
            tracing::info!("Loading configuration from {}", path);
            AppConfig::from_json_file(&path).with_context(|| format!("loading {}", path))?
        }
        Err(_) => {
            tracing::info!("BASTION_CONFIG not set, using defaults");
            AppConfig::default()
        }
    };
    config.validate()?;

    tracing::info!(
        "Starting Bastion on {} (chain id {})",
        config.chain.network,
        config.chain.chain_id
    );

    let port = config.api_port;
    let state = AppState::connect(config)
        .await
        .context("connecting to node")?;
    start_server(state, port).await?;

    Ok(())
}
