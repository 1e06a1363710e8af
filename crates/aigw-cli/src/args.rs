//! CLI argument definitions using clap
//!
//! - aigw providers               # List configured providers
//! - aigw resolve <module>        # Show where a module's requests go
//! - aigw test-connection [id]    # Ping one provider, or all
//! - aigw execute <module> <text> # Run one request
//! - aigw usage <tenant>          # Report usage for the current period
//! - aigw cache-flush             # Drop cached responses

use aigw_core::{Operation, Period};
use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Default configuration file name used across all CLI commands.
pub const DEFAULT_CONFIG_FILE: &str = "aigw.toml";

#[derive(Parser)]
#[command(name = "aigw")]
#[command(about = "AI request gateway - operator tools")]
#[command(version)]
pub struct Cli {
    /// Path to configuration file
    #[arg(long, short, global = true, env = "AIGW_CONFIG", default_value = DEFAULT_CONFIG_FILE)]
    pub config: PathBuf,

    /// Print machine-readable JSON instead of text
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// List configured providers and their models
    Providers {
        /// Include inactive providers
        #[arg(long)]
        all: bool,
    },

    /// Show the provider/model a module resolves to, with its failover order
    Resolve {
        module: String,

        /// Operation whose modality is required
        #[arg(long, default_value = "chat")]
        operation: Operation,
    },

    /// Check that a provider is reachable with its stored credential
    TestConnection {
        /// Provider id or name; every provider when omitted
        provider: Option<String>,
    },

    /// Run a single request through the gateway
    Execute {
        module: String,

        /// Prompt, message or text to process
        text: String,

        #[arg(long, default_value = "complete")]
        operation: Operation,

        /// Field names for `extract`
        #[arg(long, value_delimiter = ',')]
        fields: Vec<String>,

        #[arg(long, default_value = "cli")]
        actor: String,

        #[arg(long, default_value = "default")]
        tenant: String,

        #[arg(long)]
        max_tokens: Option<u32>,

        #[arg(long)]
        temperature: Option<f32>,

        /// Bypass the response cache
        #[arg(long)]
        no_cache: bool,
    },

    /// Report usage for a tenant in the current period
    Usage {
        tenant: String,

        #[arg(long)]
        module: Option<String>,

        #[arg(long, default_value = "daily")]
        period: Period,
    },

    /// Drop every cached response
    CacheFlush,

    /// Validate and print the effective configuration
    Config,
}
