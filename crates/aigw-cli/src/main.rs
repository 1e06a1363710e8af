//! AI request gateway CLI
//!
//! Operator surface over `aigw-core`: inspect routing, check providers, run a
//! one-off request and read usage. Configuration comes from `aigw.toml` (or
//! `--config`) with `AIGW_*` environment overrides.

mod args;
mod commands;
mod router;

use aigw_core::config::{LogFormat, LoggingConfig};
use aigw_core::ConfigLoader;
use anyhow::Context;
use args::Cli;
use clap::Parser;
use tracing_subscriber::EnvFilter;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let config = ConfigLoader::new()
        .with_file(&cli.config)
        .with_env()
        .load()
        .with_context(|| format!("Failed to load configuration from {}", cli.config.display()))?;

    init_logging(&config.logging);
    tracing::debug!(path = %cli.config.display(), "configuration loaded");
    router::route(cli, config).await
}

/// `RUST_LOG` wins over the configured level
fn init_logging(logging: &LoggingConfig) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&logging.level));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    match logging.format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}
