//! Inbound request types

use super::operation::Operation;
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;

/// Identity and capability of the caller, resolved by the host application
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActorContext {
    /// User issuing the request
    pub actor_id: String,
    /// Company/tenant the request is billed to
    pub tenant_id: String,
    /// Result of the host's capability check for AI operations
    pub permitted: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ip_address: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_agent: Option<String>,
}

impl ActorContext {
    /// Create a permitted actor context
    pub fn new(actor_id: impl Into<String>, tenant_id: impl Into<String>) -> Self {
        Self {
            actor_id: actor_id.into(),
            tenant_id: tenant_id.into(),
            permitted: true,
            ip_address: None,
            user_agent: None,
        }
    }

    /// Record the capability check outcome
    pub fn with_permission(mut self, permitted: bool) -> Self {
        self.permitted = permitted;
        self
    }

    /// Attach client network details for the audit record
    pub fn with_client(mut self, ip_address: impl Into<String>, user_agent: impl Into<String>) -> Self {
        self.ip_address = Some(ip_address.into());
        self.user_agent = Some(user_agent.into());
        self
    }
}

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChatRole {
    System,
    User,
    Assistant,
}

impl ChatRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::System => "system",
            Self::User => "user",
            Self::Assistant => "assistant",
        }
    }
}

/// A single chat message
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: ChatRole,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: ChatRole::Assistant,
            content: content.into(),
        }
    }
}

/// Operation payload
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Payload {
    /// Message list for `chat`
    Messages { messages: Vec<ChatMessage> },
    /// Prompt for `complete`
    Prompt { prompt: String },
    /// Text for `summarize` and `embed`
    Text { text: String },
    /// Text and the fields to pull out of it for `extract`
    Extraction { text: String, fields: Vec<String> },
}

impl Payload {
    pub fn messages(messages: Vec<ChatMessage>) -> Self {
        Self::Messages { messages }
    }

    pub fn prompt(prompt: impl Into<String>) -> Self {
        Self::Prompt {
            prompt: prompt.into(),
        }
    }

    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn extraction(text: impl Into<String>, fields: Vec<String>) -> Self {
        Self::Extraction {
            text: text.into(),
            fields,
        }
    }

    /// Total characters of caller-supplied content
    pub fn content_len(&self) -> usize {
        match self {
            Self::Messages { messages } => messages.iter().map(|m| m.content.chars().count()).sum(),
            Self::Prompt { prompt } => prompt.chars().count(),
            Self::Text { text } => text.chars().count(),
            Self::Extraction { text, fields } => {
                text.chars().count() + fields.iter().map(|f| f.chars().count()).sum::<usize>()
            }
        }
    }

    /// Payload kind name, used in validation messages
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Messages { .. } => "messages",
            Self::Prompt { .. } => "prompt",
            Self::Text { .. } => "text",
            Self::Extraction { .. } => "extraction",
        }
    }
}

/// Per-request options
#[derive(Debug, Clone, Default)]
pub struct ExecuteOptions {
    /// Requested completion token ceiling, clamped to module and model limits
    pub max_tokens: Option<u32>,
    /// Sampling temperature, defaults to the module's configured temperature
    pub temperature: Option<f32>,
    /// Bypass the response cache for this request (reads and writes)
    pub skip_cache: bool,
    /// Caller-side cancellation (e.g. client disconnect)
    pub cancel: Option<CancellationToken>,
}

impl ExecuteOptions {
    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn without_cache(mut self) -> Self {
        self.skip_cache = true;
        self
    }

    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = Some(token);
        self
    }
}

/// A logical operation request from a calling module
#[derive(Debug, Clone)]
pub struct ExecuteRequest {
    /// Calling module name, e.g. `DocumentSummarizerAI`
    pub module: String,
    pub operation: Operation,
    pub payload: Payload,
    pub options: ExecuteOptions,
}

impl ExecuteRequest {
    pub fn new(module: impl Into<String>, operation: Operation, payload: Payload) -> Self {
        Self {
            module: module.into(),
            operation,
            payload,
            options: ExecuteOptions::default(),
        }
    }

    pub fn with_options(mut self, options: ExecuteOptions) -> Self {
        self.options = options;
        self
    }

    pub fn chat(module: impl Into<String>, messages: Vec<ChatMessage>) -> Self {
        Self::new(module, Operation::Chat, Payload::messages(messages))
    }

    pub fn complete(module: impl Into<String>, prompt: impl Into<String>) -> Self {
        Self::new(module, Operation::Complete, Payload::prompt(prompt))
    }

    pub fn summarize(module: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(module, Operation::Summarize, Payload::text(text))
    }

    pub fn extract(module: impl Into<String>, text: impl Into<String>, fields: Vec<String>) -> Self {
        Self::new(module, Operation::Extract, Payload::extraction(text, fields))
    }

    pub fn embed(module: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(module, Operation::Embed, Payload::text(text))
    }
}
