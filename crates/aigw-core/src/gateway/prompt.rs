//! Operation shaping
//!
//! Turns a logical operation into the message list an adapter sends, and
//! interprets the raw reply for operations with structured results.

use crate::providers::InvocationRequest;
use crate::types::{ChatMessage, Operation, Payload};
use serde_json::Value;

const SUMMARIZE_INSTRUCTION: &str =
    "Summarize the text provided by the user. Reply with the summary only.";

/// Adapter request for `payload`
pub fn build_invocation(payload: &Payload, operation: Operation, max_tokens: u32, temperature: f32) -> InvocationRequest {
    match (operation, payload) {
        (Operation::Embed, Payload::Text { text }) => InvocationRequest::embedding(text.clone()),
        (_, Payload::Messages { messages }) => InvocationRequest::chat(messages.clone(), max_tokens, temperature),
        (_, Payload::Prompt { prompt }) => {
            InvocationRequest::chat(vec![ChatMessage::user(prompt.clone())], max_tokens, temperature)
        }
        (_, Payload::Text { text }) => InvocationRequest::chat(
            vec![ChatMessage::system(SUMMARIZE_INSTRUCTION), ChatMessage::user(text.clone())],
            max_tokens,
            temperature,
        ),
        (_, Payload::Extraction { text, fields }) => InvocationRequest::chat(
            vec![ChatMessage::system(extract_instruction(fields)), ChatMessage::user(text.clone())],
            max_tokens,
            temperature,
        ),
    }
}

fn extract_instruction(fields: &[String]) -> String {
    let keys = fields
        .iter()
        .map(|f| format!("\"{}\"", f.trim()))
        .collect::<Vec<_>>()
        .join(", ");
    format!(
        "Extract the following fields from the text provided by the user: {}. \
         Reply with a single JSON object using exactly these keys. \
         Use null for fields that are not present. Do not add commentary.",
        keys
    )
}

/// Parsed result for operations that return structured data
pub fn structured_result(operation: Operation, content: &str) -> Option<Value> {
    match operation {
        Operation::Extract => parse_json_object(content),
        Operation::Embed => serde_json::from_str::<Value>(content).ok().filter(Value::is_array),
        _ => None,
    }
}

/// Parse model output as a JSON object, tolerating a fenced code block
fn parse_json_object(content: &str) -> Option<Value> {
    let trimmed = strip_code_fence(content.trim());
    match serde_json::from_str::<Value>(trimmed) {
        Ok(value) if value.is_object() => Some(value),
        _ => {
            tracing::debug!("extraction reply was not a JSON object");
            None
        }
    }
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

/// Human-readable payload, captured in the audit record when enabled
pub fn payload_text(payload: &Payload) -> String {
    match payload {
        Payload::Messages { messages } => messages
            .iter()
            .map(|m| format!("{}: {}", m.role.as_str(), m.content))
            .collect::<Vec<_>>()
            .join("\n"),
        Payload::Prompt { prompt } => prompt.clone(),
        Payload::Text { text } => text.clone(),
        Payload::Extraction { text, fields } => format!("[fields: {}]\n{}", fields.join(", "), text),
    }
}
