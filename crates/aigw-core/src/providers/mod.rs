//! Provider adapters
//!
//! Each vendor wire protocol lives behind `ProviderAdapter`. Adapters return
//! classified `ProviderFailure`s so the gateway can decide on failover without
//! inspecting vendor bodies.

mod adapter;
mod anthropic;
mod error_utils;
mod ollama;
mod openai;
mod set;
mod tokens;
mod vault;

pub use adapter::{
    Endpoint, Invocation, InvocationKind, InvocationRequest, ProviderAdapter, ProviderFailure,
    is_retryable_status,
};
pub use anthropic::AnthropicAdapter;
pub use error_utils::sanitize_provider_error_text;
pub use ollama::OllamaAdapter;
pub use openai::OpenAiAdapter;
pub use set::{AdapterSet, http_client};
pub use tokens::estimate_tokens;
pub use vault::{CredentialVault, EnvVault, PlainVault};
