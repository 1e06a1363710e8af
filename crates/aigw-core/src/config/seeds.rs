//! Catalog seed records declared in the configuration file
//!
//! Seeds reference each other by name (providers) and identifier (models);
//! `Catalog::from_seeds` turns them into id-keyed records.

use crate::registry::ProviderType;
use crate::types::Modality;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

fn default_true() -> bool {
    true
}

fn default_priority() -> i32 {
    100
}

fn default_model_max_tokens() -> u32 {
    4096
}

fn default_modality() -> Modality {
    Modality::Text
}

/// A provider declared under `[[providers]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderSeed {
    pub name: String,
    #[serde(rename = "type")]
    pub provider_type: ProviderType,
    pub endpoint: String,
    /// Stored credential, resolved through the credential vault at dispatch
    #[serde(default)]
    pub credential: Option<String>,
    #[serde(default)]
    pub max_requests_per_minute: u32,
    #[serde(default)]
    pub max_tokens_per_request: u32,
    #[serde(default)]
    pub cost_per_token: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default = "default_priority")]
    pub priority: i32,
    #[serde(default)]
    pub configuration: serde_json::Value,
    #[serde(default)]
    pub models: Vec<ModelSeed>,
}

/// A model declared under `[[providers.models]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelSeed {
    pub identifier: String,
    #[serde(default = "default_modality")]
    pub modality: Modality,
    #[serde(default = "default_model_max_tokens")]
    pub max_tokens: u32,
    #[serde(default)]
    pub supports_streaming: bool,
    #[serde(default)]
    pub input_cost_per_token: Decimal,
    #[serde(default)]
    pub output_cost_per_token: Decimal,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub configuration: serde_json::Value,
}

/// A module declared under `[[modules]]`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModuleSeed {
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    /// Provider name
    #[serde(default)]
    pub default_provider: Option<String>,
    /// Model identifier, looked up within `default_provider`
    #[serde(default)]
    pub default_model: Option<String>,
    /// Provider names; empty allows every provider
    #[serde(default)]
    pub allowed_providers: Vec<String>,
    /// Model identifiers; empty allows every model
    #[serde(default)]
    pub allowed_models: Vec<String>,
    #[serde(default)]
    pub max_tokens: Option<u32>,
    #[serde(default)]
    pub temperature: Option<f32>,
    #[serde(default)]
    pub streaming_enabled: Option<bool>,
    #[serde(default = "default_true")]
    pub active: bool,
    #[serde(default)]
    pub priority: i32,
}
