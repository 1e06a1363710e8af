//! Provider and model records

use crate::types::{Modality, ModelId, ProviderId};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Vendor discriminator selecting the wire protocol adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderType {
    #[serde(rename = "openai")]
    OpenAi,
    #[serde(rename = "anthropic")]
    Anthropic,
    #[serde(rename = "ollama")]
    Ollama,
}

impl ProviderType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::OpenAi => "openai",
            Self::Anthropic => "anthropic",
            Self::Ollama => "ollama",
        }
    }
}

impl fmt::Display for ProviderType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Stored provider credential, opaque until resolved by a `CredentialVault`
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Credential(String);

impl Credential {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// The stored (still encrypted or referenced) form
    pub fn stored(&self) -> &str {
        &self.0
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Credential([REDACTED])")
    }
}

/// A configured external AI vendor endpoint
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Provider {
    pub id: ProviderId,
    pub name: String,
    pub provider_type: ProviderType,
    pub endpoint: String,
    pub credential: Option<Credential>,
    /// Outbound request ceiling for this provider per rate window; `0` = unlimited
    pub max_requests_per_minute: u32,
    /// Completion token ceiling per request; `0` = no provider-level cap
    pub max_tokens_per_request: u32,
    /// Flat rate used when a model has no per-direction pricing
    pub cost_per_token: Decimal,
    pub active: bool,
    /// Lower is tried first
    pub priority: i32,
    pub configuration: serde_json::Value,
}

/// A callable model offered by a provider
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub id: ModelId,
    pub provider_id: ProviderId,
    /// Identifier sent to the vendor
    pub identifier: String,
    pub modality: Modality,
    pub max_tokens: u32,
    pub supports_streaming: bool,
    pub input_cost_per_token: Decimal,
    pub output_cost_per_token: Decimal,
    pub active: bool,
    pub configuration: serde_json::Value,
}

/// Fields for creating a provider
#[derive(Debug, Clone)]
pub struct NewProvider {
    pub name: String,
    pub provider_type: ProviderType,
    pub endpoint: String,
    pub credential: Option<Credential>,
    pub max_requests_per_minute: u32,
    pub max_tokens_per_request: u32,
    pub cost_per_token: Decimal,
    pub active: bool,
    pub priority: i32,
    pub configuration: serde_json::Value,
}

impl NewProvider {
    pub fn new(name: impl Into<String>, provider_type: ProviderType, endpoint: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            provider_type,
            endpoint: endpoint.into(),
            credential: None,
            max_requests_per_minute: 0,
            max_tokens_per_request: 0,
            cost_per_token: Decimal::ZERO,
            active: true,
            priority: 100,
            configuration: serde_json::Value::Null,
        }
    }

    pub fn with_priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_credential(mut self, credential: impl Into<String>) -> Self {
        self.credential = Some(Credential::new(credential));
        self
    }

    pub fn with_cost_per_token(mut self, cost: Decimal) -> Self {
        self.cost_per_token = cost;
        self
    }

    pub fn with_max_requests_per_minute(mut self, rpm: u32) -> Self {
        self.max_requests_per_minute = rpm;
        self
    }

    pub fn with_max_tokens_per_request(mut self, max: u32) -> Self {
        self.max_tokens_per_request = max;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Fields for creating a model
#[derive(Debug, Clone)]
pub struct NewModel {
    pub provider_id: ProviderId,
    pub identifier: String,
    pub modality: Modality,
    pub max_tokens: u32,
    pub supports_streaming: bool,
    pub input_cost_per_token: Decimal,
    pub output_cost_per_token: Decimal,
    pub active: bool,
    pub configuration: serde_json::Value,
}

impl NewModel {
    pub fn new(provider_id: ProviderId, identifier: impl Into<String>, modality: Modality) -> Self {
        Self {
            provider_id,
            identifier: identifier.into(),
            modality,
            max_tokens: 4096,
            supports_streaming: false,
            input_cost_per_token: Decimal::ZERO,
            output_cost_per_token: Decimal::ZERO,
            active: true,
            configuration: serde_json::Value::Null,
        }
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = max_tokens;
        self
    }

    pub fn with_pricing(mut self, input: Decimal, output: Decimal) -> Self {
        self.input_cost_per_token = input;
        self.output_cost_per_token = output;
        self
    }

    pub fn with_streaming(mut self, supports_streaming: bool) -> Self {
        self.supports_streaming = supports_streaming;
        self
    }

    pub fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

/// Partial provider update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ProviderUpdate {
    pub name: Option<String>,
    pub endpoint: Option<String>,
    pub credential: Option<Credential>,
    pub max_requests_per_minute: Option<u32>,
    pub max_tokens_per_request: Option<u32>,
    pub cost_per_token: Option<Decimal>,
    pub active: Option<bool>,
    pub priority: Option<i32>,
    pub configuration: Option<serde_json::Value>,
}

impl ProviderUpdate {
    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Default::default()
        }
    }

    pub fn activate() -> Self {
        Self {
            active: Some(true),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, provider: &mut Provider) {
        if let Some(name) = self.name {
            provider.name = name;
        }
        if let Some(endpoint) = self.endpoint {
            provider.endpoint = endpoint;
        }
        if let Some(credential) = self.credential {
            provider.credential = Some(credential);
        }
        if let Some(rpm) = self.max_requests_per_minute {
            provider.max_requests_per_minute = rpm;
        }
        if let Some(max) = self.max_tokens_per_request {
            provider.max_tokens_per_request = max;
        }
        if let Some(cost) = self.cost_per_token {
            provider.cost_per_token = cost;
        }
        if let Some(active) = self.active {
            provider.active = active;
        }
        if let Some(priority) = self.priority {
            provider.priority = priority;
        }
        if let Some(configuration) = self.configuration {
            provider.configuration = configuration;
        }
    }
}

/// Partial model update; `None` leaves a field unchanged
#[derive(Debug, Clone, Default)]
pub struct ModelUpdate {
    pub identifier: Option<String>,
    pub modality: Option<Modality>,
    pub max_tokens: Option<u32>,
    pub supports_streaming: Option<bool>,
    pub input_cost_per_token: Option<Decimal>,
    pub output_cost_per_token: Option<Decimal>,
    pub active: Option<bool>,
    pub configuration: Option<serde_json::Value>,
}

impl ModelUpdate {
    pub fn deactivate() -> Self {
        Self {
            active: Some(false),
            ..Default::default()
        }
    }

    pub(crate) fn apply(self, model: &mut Model) {
        if let Some(identifier) = self.identifier {
            model.identifier = identifier;
        }
        if let Some(modality) = self.modality {
            model.modality = modality;
        }
        if let Some(max_tokens) = self.max_tokens {
            model.max_tokens = max_tokens;
        }
        if let Some(streaming) = self.supports_streaming {
            model.supports_streaming = streaming;
        }
        if let Some(input) = self.input_cost_per_token {
            model.input_cost_per_token = input;
        }
        if let Some(output) = self.output_cost_per_token {
            model.output_cost_per_token = output;
        }
        if let Some(active) = self.active {
            model.active = active;
        }
        if let Some(configuration) = self.configuration {
            model.configuration = configuration;
        }
    }
}
