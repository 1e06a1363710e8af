//! Configuration sections

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use std::time::Duration;

/// Request rate limits. A limit of `0` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RateLimitConfig {
    /// Requests per window for a single actor
    pub per_actor_rpm: u32,
    /// Requests per window across all actors
    pub global_rpm: u32,
    /// Whether the global counter is consulted at all
    pub global_enabled: bool,
    /// Fixed window size
    #[serde(with = "humantime_serde")]
    pub window: Duration,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            per_actor_rpm: 30,
            global_rpm: 600,
            global_enabled: true,
            window: Duration::from_secs(60),
        }
    }
}

/// Per-tenant budget overrides; unset fields inherit the global values
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct TenantBudget {
    pub daily_token_limit: Option<u64>,
    pub monthly_cost_limit: Option<Decimal>,
}

/// Spend limits. A limit of `0` means unlimited.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BudgetConfig {
    /// Tokens a tenant may consume per UTC day
    pub daily_token_limit: u64,
    /// Cost a tenant may accrue per UTC month
    pub monthly_cost_limit: Decimal,
    /// How long ledger-derived running totals are trusted before re-aggregation
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
    pub tenants: HashMap<String, TenantBudget>,
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            daily_token_limit: 0,
            monthly_cost_limit: Decimal::ZERO,
            refresh_interval: Duration::from_secs(30),
            tenants: HashMap::new(),
        }
    }
}

impl BudgetConfig {
    /// Effective daily token limit for a tenant
    pub fn daily_token_limit_for(&self, tenant_id: &str) -> u64 {
        self.tenants
            .get(tenant_id)
            .and_then(|t| t.daily_token_limit)
            .unwrap_or(self.daily_token_limit)
    }

    /// Effective monthly cost limit for a tenant
    pub fn monthly_cost_limit_for(&self, tenant_id: &str) -> Decimal {
        self.tenants
            .get(tenant_id)
            .and_then(|t| t.monthly_cost_limit)
            .unwrap_or(self.monthly_cost_limit)
    }
}

/// Response cache settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CacheConfig {
    pub enabled: bool,
    /// Entry lifetime
    #[serde(with = "humantime_serde")]
    pub ttl: Duration,
    /// Maximum number of entries held in memory
    pub capacity: usize,
    /// Decimal places temperature is rounded to before fingerprinting
    pub temperature_precision: usize,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ttl: Duration::from_secs(3600),
            capacity: 1000,
            temperature_precision: 2,
        }
    }
}

/// Provider failover bounds
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FailoverConfig {
    /// Maximum distinct providers tried for one request
    pub max_providers: usize,
    /// Per-attempt timeout
    #[serde(with = "humantime_serde")]
    pub request_timeout: Duration,
    /// Timeout for administrative connectivity tests
    #[serde(with = "humantime_serde")]
    pub connect_test_timeout: Duration,
}

impl Default for FailoverConfig {
    fn default() -> Self {
        Self {
            max_providers: 3,
            request_timeout: Duration::from_secs(60),
            connect_test_timeout: Duration::from_secs(10),
        }
    }
}

/// Input validation limits
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ValidationConfig {
    /// Maximum characters of caller content per request
    pub max_prompt_chars: usize,
    /// Upper bound accepted for `max_tokens` in request options
    pub max_tokens_ceiling: u32,
    /// Maximum messages in a chat payload
    pub max_messages: usize,
    /// Maximum fields in an extraction payload
    pub max_extract_fields: usize,
}

impl Default for ValidationConfig {
    fn default() -> Self {
        Self {
            max_prompt_chars: 100_000,
            max_tokens_ceiling: 32_768,
            max_messages: 200,
            max_extract_fields: 50,
        }
    }
}

/// Provider registry snapshot settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RegistryConfig {
    /// How long a catalog snapshot is served before being reloaded
    #[serde(with = "humantime_serde")]
    pub refresh_interval: Duration,
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(30),
        }
    }
}

/// Usage ledger settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LedgerConfig {
    /// JSONL ledger file; in-memory ledger when unset
    pub path: Option<PathBuf>,
    /// Capture prompt and response payloads in the audit record
    pub record_payloads: bool,
    /// Audit records kept in memory before the oldest finished ones are evicted
    pub journal_capacity: usize,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            path: None,
            record_payloads: false,
            journal_capacity: 10_000,
        }
    }
}

/// System-wide defaults for modules without configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub max_tokens: u32,
    pub temperature: f32,
    pub streaming_enabled: bool,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            max_tokens: 1024,
            temperature: 0.7,
            streaming_enabled: false,
        }
    }
}
