//! CLI commands

pub mod cache;
pub mod config;
pub mod execute;
pub mod providers;
pub mod resolve;
pub mod usage;

use serde_json::Value;

/// Print a JSON document to stdout
pub(crate) fn print_json(value: &Value) -> anyhow::Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}
