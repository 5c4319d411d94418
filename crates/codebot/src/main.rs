//! Operator smoke tool: load the config, build the backend registry,
//! refresh every catalog, and report what each backend supports. The chat
//! transport itself is wired up by the embedding deployment; this binary
//! only proves the execution side of the config is usable.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use codebot::config::BotConfig;
use tracing::{info, warn};

#[derive(Parser)]
#[command(name = "codebot", about = "Validate codebot config and backend catalogs")]
struct Args {
    /// Path to the config file (default: $CODEBOT_CONFIG or ./codebot.toml).
    #[arg(long)]
    config: Option<PathBuf>,

    /// Languages to probe against each backend's catalog.
    #[arg(long, value_delimiter = ',', default_value = "java,python,rust")]
    probe: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let args = Args::parse();
    let config = match &args.config {
        Some(path) => BotConfig::load(path)?,
        None => BotConfig::from_env()?,
    };
    info!(
        backends = config.backends.len(),
        current = %config.current_api,
        "config loaded"
    );

    let registry = config.build_registry()?;

    // Warm the catalog of every configured backend, not just the current one.
    for status in registry.list() {
        let Some(backend) = registry.get(&status.name) else {
            continue;
        };

        match backend.refresh_catalog().await {
            Ok(()) => {
                let supported: Vec<&String> =
                    args.probe.iter().filter(|l| backend.supports(l)).collect();
                info!(
                    backend = %status.name,
                    current = status.is_current,
                    supported = ?supported,
                    "catalog ok"
                );
            }
            Err(e) => warn!(backend = %status.name, error = %e, "catalog refresh failed"),
        }
    }

    info!(current = %registry.current_name(), "all backends checked");
    Ok(())
}
