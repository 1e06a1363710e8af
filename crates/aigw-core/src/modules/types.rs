//! Module configuration records

use crate::config::DefaultsConfig;
use crate::types::{ModelId, ProviderId};
use serde::{Deserialize, Serialize};

/// Per-module AI settings
///
/// Default provider/model are weak references: removing the referenced record
/// sets them to `None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModuleConfiguration {
    /// Unique module name
    pub name: String,
    pub display_name: Option<String>,
    pub description: Option<String>,
    pub default_provider_id: Option<ProviderId>,
    pub default_model_id: Option<ModelId>,
    /// Empty allows every provider
    pub allowed_provider_ids: Vec<ProviderId>,
    /// Empty allows every model
    pub allowed_model_ids: Vec<ModelId>,
    pub max_tokens: Option<u32>,
    pub temperature: Option<f32>,
    pub streaming_enabled: Option<bool>,
    pub active: bool,
    /// UI ordering
    pub priority: i32,
}

impl ModuleConfiguration {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            display_name: None,
            description: None,
            default_provider_id: None,
            default_model_id: None,
            allowed_provider_ids: Vec::new(),
            allowed_model_ids: Vec::new(),
            max_tokens: None,
            temperature: None,
            streaming_enabled: None,
            active: true,
            priority: 0,
        }
    }

    pub fn with_default(mut self, provider_id: ProviderId, model_id: ModelId) -> Self {
        self.default_provider_id = Some(provider_id);
        self.default_model_id = Some(model_id);
        self
    }

    pub fn with_allowed_providers(mut self, ids: Vec<ProviderId>) -> Self {
        self.allowed_provider_ids = ids;
        self
    }

    pub fn with_allowed_models(mut self, ids: Vec<ModelId>) -> Self {
        self.allowed_model_ids = ids;
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }

    pub fn allows_provider(&self, id: ProviderId) -> bool {
        self.allowed_provider_ids.is_empty() || self.allowed_provider_ids.contains(&id)
    }

    pub fn allows_model(&self, id: ModelId) -> bool {
        self.allowed_model_ids.is_empty() || self.allowed_model_ids.contains(&id)
    }
}

/// Effective limits applied to a module's requests
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModuleLimits {
    pub max_tokens: u32,
    pub temperature: f32,
    pub streaming_enabled: bool,
}

impl ModuleLimits {
    /// Module settings layered over system-wide defaults
    pub fn resolve(module: Option<&ModuleConfiguration>, defaults: &DefaultsConfig) -> Self {
        Self {
            max_tokens: module
                .and_then(|m| m.max_tokens)
                .unwrap_or(defaults.max_tokens),
            temperature: module
                .and_then(|m| m.temperature)
                .unwrap_or(defaults.temperature),
            streaming_enabled: module
                .and_then(|m| m.streaming_enabled)
                .unwrap_or(defaults.streaming_enabled),
        }
    }
}

impl Default for ModuleLimits {
    fn default() -> Self {
        Self::resolve(None, &DefaultsConfig::default())
    }
}
