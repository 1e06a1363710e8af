//! Request validation
//!
//! Runs before any side effect: no counter is touched and nothing is
//! ledgered for a request rejected here.

use crate::config::ValidationConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::types::{ChatRole, ExecuteRequest, Operation, Payload};

const MAX_TEMPERATURE: f32 = 2.0;

/// Check a request against operation-specific constraints
pub fn validate(request: &ExecuteRequest, limits: &ValidationConfig) -> GatewayResult<()> {
    if request.module.trim().is_empty() {
        return Err(GatewayError::validation_field("module", "module name is required"));
    }

    check_pairing(request.operation, &request.payload)?;
    check_payload(&request.payload, limits)?;

    let chars = request.payload.content_len();
    if chars > limits.max_prompt_chars {
        return Err(GatewayError::validation_field(
            "payload",
            format!(
                "content is {} characters, limit is {}",
                chars, limits.max_prompt_chars
            ),
        ));
    }

    if let Some(max_tokens) = request.options.max_tokens {
        if max_tokens == 0 {
            return Err(GatewayError::validation_field("max_tokens", "must be greater than zero"));
        }
        if limits.max_tokens_ceiling > 0 && max_tokens > limits.max_tokens_ceiling {
            return Err(GatewayError::validation_field(
                "max_tokens",
                format!("must not exceed {}", limits.max_tokens_ceiling),
            ));
        }
    }

    if let Some(temperature) = request.options.temperature {
        if !temperature.is_finite() || !(0.0..=MAX_TEMPERATURE).contains(&temperature) {
            return Err(GatewayError::validation_field(
                "temperature",
                format!("must be within 0.0..={}", MAX_TEMPERATURE),
            ));
        }
    }

    Ok(())
}

fn check_pairing(operation: Operation, payload: &Payload) -> GatewayResult<()> {
    let expected = match operation {
        Operation::Chat => "messages",
        Operation::Complete => "prompt",
        Operation::Summarize | Operation::Embed => "text",
        Operation::Extract => "extraction",
    };
    if payload.kind() != expected {
        return Err(GatewayError::validation_field(
            "payload",
            format!(
                "{} expects a {} payload, got {}",
                operation,
                expected,
                payload.kind()
            ),
        ));
    }
    Ok(())
}

fn check_payload(payload: &Payload, limits: &ValidationConfig) -> GatewayResult<()> {
    match payload {
        Payload::Messages { messages } => {
            if messages.is_empty() {
                return Err(GatewayError::validation_field("messages", "at least one message is required"));
            }
            if limits.max_messages > 0 && messages.len() > limits.max_messages {
                return Err(GatewayError::validation_field(
                    "messages",
                    format!("at most {} messages are allowed", limits.max_messages),
                ));
            }
            if messages.iter().any(|m| m.content.trim().is_empty()) {
                return Err(GatewayError::validation_field("messages", "message content must not be empty"));
            }
            if !messages.iter().any(|m| m.role == ChatRole::User) {
                return Err(GatewayError::validation_field("messages", "at least one user message is required"));
            }
        }
        Payload::Prompt { prompt } => require_text("prompt", prompt)?,
        Payload::Text { text } => require_text("text", text)?,
        Payload::Extraction { text, fields } => {
            require_text("text", text)?;
            if fields.is_empty() {
                return Err(GatewayError::validation_field("fields", "at least one field is required"));
            }
            if limits.max_extract_fields > 0 && fields.len() > limits.max_extract_fields {
                return Err(GatewayError::validation_field(
                    "fields",
                    format!("at most {} fields are allowed", limits.max_extract_fields),
                ));
            }
            if fields.iter().any(|f| f.trim().is_empty()) {
                return Err(GatewayError::validation_field("fields", "field names must not be empty"));
            }
        }
    }
    Ok(())
}

fn require_text(field: &str, value: &str) -> GatewayResult<()> {
    if value.trim().is_empty() {
        return Err(GatewayError::validation_field(field, format!("{} must not be empty", field)));
    }
    Ok(())
}
