//! Uniform provider adapter contract

use crate::error::ProviderErrorKind;
use crate::types::ChatMessage;
use async_trait::async_trait;
use std::fmt;
use thiserror::Error;

/// Resolved call target for one attempt
#[derive(Clone)]
pub struct Endpoint {
    pub base_url: String,
    /// Model identifier sent to the vendor
    pub model: String,
    api_key: Option<String>,
    /// Provider configuration merged with model configuration
    pub configuration: serde_json::Value,
}

impl Endpoint {
    pub fn new(base_url: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            model: model.into(),
            api_key: None,
            configuration: serde_json::Value::Null,
        }
    }

    pub fn with_api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    pub fn with_configuration(mut self, configuration: serde_json::Value) -> Self {
        self.configuration = configuration;
        self
    }

    pub fn api_key(&self) -> Option<&str> {
        self.api_key.as_deref()
    }

    /// String setting from the merged configuration
    pub fn setting(&self, key: &str) -> Option<&str> {
        self.configuration.get(key).and_then(|v| v.as_str())
    }
}

impl fmt::Debug for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Endpoint")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("api_key", &self.api_key.as_ref().map(|_| "[REDACTED]"))
            .finish()
    }
}

/// Shape of the vendor call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InvocationKind {
    #[default]
    Chat,
    Embedding,
}

#[derive(Debug, Clone, PartialEq)]
pub struct InvocationRequest {
    pub kind: InvocationKind,
    pub messages: Vec<ChatMessage>,
    pub max_tokens: u32,
    pub temperature: f32,
}

impl InvocationRequest {
    pub fn chat(messages: Vec<ChatMessage>, max_tokens: u32, temperature: f32) -> Self {
        Self {
            kind: InvocationKind::Chat,
            messages,
            max_tokens,
            temperature,
        }
    }

    pub fn embedding(text: impl Into<String>) -> Self {
        Self {
            kind: InvocationKind::Embedding,
            messages: vec![ChatMessage::user(text)],
            max_tokens: 0,
            temperature: 0.0,
        }
    }

    /// Concatenated message content, used for embeddings and token estimates
    pub fn joined_content(&self) -> String {
        self.messages
            .iter()
            .map(|m| m.content.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// Successful vendor answer
///
/// Token counts are `None` when the vendor did not report them.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Invocation {
    pub content: String,
    pub prompt_tokens: Option<u32>,
    pub completion_tokens: Option<u32>,
}

impl Invocation {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Default::default()
        }
    }

    pub fn with_usage(mut self, prompt_tokens: u32, completion_tokens: u32) -> Self {
        self.prompt_tokens = Some(prompt_tokens);
        self.completion_tokens = Some(completion_tokens);
        self
    }
}

/// Classified failure of one provider attempt
///
/// `detail` strings are already redacted.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ProviderFailure {
    #[error("request timed out")]
    Timeout,

    #[error("transport error: {0}")]
    Transport(String),

    #[error("vendor rejected request (status {status}): {detail}")]
    VendorRejected {
        status: u16,
        retryable: bool,
        detail: String,
    },

    /// Provider's own request ceiling reached in this gateway
    #[error("provider request limit reached")]
    Throttled,

    #[error("request cancelled")]
    Cancelled,
}

impl ProviderFailure {
    /// Whether the next candidate provider should be tried
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout | Self::Transport(_) | Self::Throttled => true,
            Self::VendorRejected { retryable, .. } => *retryable,
            Self::Cancelled => false,
        }
    }

    /// Caller-facing failure class; `None` for cancellation
    pub fn kind(&self) -> Option<ProviderErrorKind> {
        match self {
            Self::Timeout => Some(ProviderErrorKind::Timeout),
            Self::Transport(_) => Some(ProviderErrorKind::TransportError),
            Self::VendorRejected { .. } | Self::Throttled => Some(ProviderErrorKind::VendorRejected),
            Self::Cancelled => None,
        }
    }

    /// Rejection from an HTTP status and redacted body
    pub fn from_status(status: u16, detail: impl Into<String>) -> Self {
        Self::VendorRejected {
            status,
            retryable: is_retryable_status(status),
            detail: detail.into(),
        }
    }
}

/// Statuses worth retrying on another provider: timeouts, vendor rate limits, server errors
pub fn is_retryable_status(status: u16) -> bool {
    matches!(status, 408 | 429) || (500..=599).contains(&status)
}

/// Wire-protocol adapter for one provider type
#[async_trait]
pub trait ProviderAdapter: Send + Sync {
    /// Short name used in logs
    fn name(&self) -> &'static str;

    /// Perform one call against `endpoint`
    async fn invoke(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure>;

    /// Cheap reachability check
    async fn ping(&self, endpoint: &Endpoint) -> Result<(), ProviderFailure>;
}
