//! Adapter lookup by provider

use super::adapter::ProviderAdapter;
use super::anthropic::AnthropicAdapter;
use super::ollama::OllamaAdapter;
use super::openai::OpenAiAdapter;
use crate::error::GatewayResult;
use crate::registry::{Provider, ProviderType};
use crate::types::ProviderId;
use reqwest::Client;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

/// Build the shared outbound HTTP client
pub fn http_client(connect_timeout: Duration) -> GatewayResult<Client> {
    let client = Client::builder()
        .connect_timeout(connect_timeout)
        .user_agent(concat!("aigw/", env!("CARGO_PKG_VERSION")))
        .build()?;
    Ok(client)
}

/// Adapters keyed by provider type, with optional per-provider overrides
#[derive(Clone, Default)]
pub struct AdapterSet {
    by_type: HashMap<ProviderType, Arc<dyn ProviderAdapter>>,
    by_provider: HashMap<ProviderId, Arc<dyn ProviderAdapter>>,
}

impl std::fmt::Debug for AdapterSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AdapterSet")
            .field("types", &self.by_type.keys().collect::<Vec<_>>())
            .field("overrides", &self.by_provider.keys().collect::<Vec<_>>())
            .finish()
    }
}

impl AdapterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// The built-in HTTP adapters sharing one client
    pub fn with_defaults(client: Client) -> Self {
        Self::new()
            .with_type(ProviderType::OpenAi, Arc::new(OpenAiAdapter::new(client.clone())))
            .with_type(ProviderType::Anthropic, Arc::new(AnthropicAdapter::new(client.clone())))
            .with_type(ProviderType::Ollama, Arc::new(OllamaAdapter::new(client)))
    }

    pub fn with_type(mut self, provider_type: ProviderType, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.by_type.insert(provider_type, adapter);
        self
    }

    /// Route one provider to a specific adapter regardless of its type
    pub fn with_provider(mut self, provider_id: ProviderId, adapter: Arc<dyn ProviderAdapter>) -> Self {
        self.by_provider.insert(provider_id, adapter);
        self
    }

    pub fn resolve(&self, provider: &Provider) -> Option<Arc<dyn ProviderAdapter>> {
        self.by_provider
            .get(&provider.id)
            .or_else(|| self.by_type.get(&provider.provider_type))
            .cloned()
    }
}
