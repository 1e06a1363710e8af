//! Gateway configuration
//!
//! Configuration is read from a TOML file, then environment overrides are
//! applied, then the result is validated. Every section has defaults so an
//! absent file yields a working (if empty) gateway.

mod loader;
mod logging_config;
mod seeds;
mod settings;

pub use loader::{ConfigLoader, ENV_PREFIX};
pub use logging_config::{LogFormat, LoggingConfig};
pub use seeds::{ModelSeed, ModuleSeed, ProviderSeed};
pub use settings::{
    BudgetConfig, CacheConfig, DefaultsConfig, FailoverConfig, LedgerConfig, RateLimitConfig,
    RegistryConfig, TenantBudget, ValidationConfig,
};

use crate::error::{GatewayError, GatewayResult};
use serde::{Deserialize, Serialize};

/// Top-level gateway configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    pub rate_limit: RateLimitConfig,
    pub budget: BudgetConfig,
    pub cache: CacheConfig,
    pub failover: FailoverConfig,
    pub validation: ValidationConfig,
    pub registry: RegistryConfig,
    pub ledger: LedgerConfig,
    pub logging: LoggingConfig,
    pub defaults: DefaultsConfig,
    pub providers: Vec<ProviderSeed>,
    pub modules: Vec<ModuleSeed>,
}

impl GatewayConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> GatewayResult<Self> {
        let config: Self = toml::from_str(content)?;
        Ok(config)
    }

    /// Reject values the gateway cannot operate with
    pub fn validate(&self) -> GatewayResult<()> {
        if self.rate_limit.window.is_zero() {
            return Err(GatewayError::config("rate_limit.window must be greater than zero"));
        }
        if self.failover.max_providers == 0 {
            return Err(GatewayError::config("failover.max_providers must be at least 1"));
        }
        if self.failover.request_timeout.is_zero() {
            return Err(GatewayError::config("failover.request_timeout must be greater than zero"));
        }
        if self.cache.enabled && self.cache.capacity == 0 {
            return Err(GatewayError::config("cache.capacity must be at least 1 when caching is enabled"));
        }
        if self.ledger.journal_capacity == 0 {
            return Err(GatewayError::config("ledger.journal_capacity must be at least 1"));
        }
        if self.validation.max_prompt_chars == 0 {
            return Err(GatewayError::config("validation.max_prompt_chars must be at least 1"));
        }
        if !(0.0..=2.0).contains(&self.defaults.temperature) {
            return Err(GatewayError::config("defaults.temperature must be within 0.0..=2.0"));
        }
        if self.budget.monthly_cost_limit.is_sign_negative() {
            return Err(GatewayError::config("budget.monthly_cost_limit must not be negative"));
        }

        let mut names = std::collections::HashSet::new();
        for provider in &self.providers {
            if !names.insert(provider.name.as_str()) {
                return Err(GatewayError::config_with_context(
                    format!("duplicate provider name '{}'", provider.name),
                    "Validating [[providers]]",
                ));
            }
        }

        let mut modules = std::collections::HashSet::new();
        for module in &self.modules {
            if !modules.insert(module.name.as_str()) {
                return Err(GatewayError::config_with_context(
                    format!("duplicate module name '{}'", module.name),
                    "Validating [[modules]]",
                ));
            }
        }

        Ok(())
    }
}
