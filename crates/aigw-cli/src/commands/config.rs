//! Configuration display

use super::print_json;
use aigw_core::GatewayConfig;
use serde_json::Value;

const REDACTED: &str = "[REDACTED]";

/// Print the effective configuration with provider credentials masked
pub fn show(config: &GatewayConfig, json: bool) -> anyhow::Result<()> {
    let mut value = serde_json::to_value(config)?;
    if let Some(providers) = value.get_mut("providers").and_then(Value::as_array_mut) {
        for provider in providers {
            if let Some(credential) = provider.get_mut("credential") {
                if !credential.is_null() {
                    *credential = Value::String(REDACTED.to_string());
                }
            }
        }
    }

    if json {
        return print_json(&value);
    }

    println!("Configuration is valid");
    println!(
        "  rate limit:  {} per actor, {} global per {:?}",
        config.rate_limit.per_actor_rpm, config.rate_limit.global_rpm, config.rate_limit.window
    );
    println!(
        "  budget:      {} tokens/day, {} per month",
        config.budget.daily_token_limit, config.budget.monthly_cost_limit
    );
    println!(
        "  cache:       {} (ttl {:?}, capacity {})",
        if config.cache.enabled { "enabled" } else { "disabled" },
        config.cache.ttl,
        config.cache.capacity
    );
    println!(
        "  failover:    up to {} providers, {:?} per attempt",
        config.failover.max_providers, config.failover.request_timeout
    );
    match &config.ledger.path {
        Some(path) => println!("  ledger:      {}", path.display()),
        None => println!("  ledger:      in memory"),
    }
    println!("  providers:   {}", config.providers.len());
    println!("  modules:     {}", config.modules.len());
    Ok(())
}
