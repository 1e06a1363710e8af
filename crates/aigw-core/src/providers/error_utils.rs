//! Provider error sanitization and classification helpers

use super::adapter::ProviderFailure;
use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

const MAX_ERROR_TEXT_CHARS: usize = 512;
const REDACTED: &str = "[REDACTED]";

static BEARER_TOKEN_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\bBearer\s+[A-Za-z0-9._\-+/=]{8,}").expect("valid bearer token regex")
});

static KEY_VALUE_SECRET_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?i)\b(api[_-]?key|access[_-]?token|refresh[_-]?token|token|secret|password|authorization|x-api-key)\b\s*[:=]\s*["']?[^"',\s}]+"#,
    )
    .expect("valid key/value secret regex")
});

static SK_KEY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\bsk-[A-Za-z0-9_\-]{8,}").expect("valid sk- key regex"));

/// Redact secrets from vendor error text and truncate large bodies
pub fn sanitize_provider_error_text(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return "<empty error response body>".to_string();
    }

    if let Ok(mut json) = serde_json::from_str::<Value>(trimmed) {
        redact_json_value(&mut json);
        let serialized =
            serde_json::to_string(&json).unwrap_or_else(|_| "<unserializable error>".to_string());
        return truncate_with_suffix(serialized);
    }

    truncate_with_suffix(redact_inline_secrets(trimmed))
}

fn redact_json_value(value: &mut Value) {
    match value {
        Value::Object(map) => {
            for (key, val) in map.iter_mut() {
                if is_sensitive_key(key) {
                    *val = Value::String(REDACTED.to_string());
                } else {
                    redact_json_value(val);
                }
            }
        }
        Value::Array(items) => items.iter_mut().for_each(redact_json_value),
        Value::String(s) => *s = redact_inline_secrets(s),
        _ => {}
    }
}

fn is_sensitive_key(key: &str) -> bool {
    let normalized = key.to_ascii_lowercase().replace(['-', ' '], "_");
    ["api_key", "token", "secret", "password", "authorization", "cookie", "private_key"]
        .iter()
        .any(|needle| normalized.contains(needle))
}

fn redact_inline_secrets(input: &str) -> String {
    let redacted = BEARER_TOKEN_RE.replace_all(input, "Bearer [REDACTED]");
    let redacted = KEY_VALUE_SECRET_RE.replace_all(&redacted, "$1=[REDACTED]");
    SK_KEY_RE.replace_all(&redacted, REDACTED).into_owned()
}

fn truncate_with_suffix(input: String) -> String {
    let char_count = input.chars().count();
    if char_count <= MAX_ERROR_TEXT_CHARS {
        return input;
    }

    let truncated: String = input.chars().take(MAX_ERROR_TEXT_CHARS).collect();
    format!("{}... [truncated {} chars]", truncated, char_count - MAX_ERROR_TEXT_CHARS)
}

/// Classify a reqwest failure; timeouts are kept distinct from other transport errors
pub fn failure_from_reqwest(err: reqwest::Error, provider: &str) -> ProviderFailure {
    if err.is_timeout() {
        return ProviderFailure::Timeout;
    }
    ProviderFailure::Transport(sanitize_provider_error_text(&format!("{} request failed: {}", provider, err)))
}

/// Build a failure from a non-success HTTP response
pub async fn failure_from_response(response: reqwest::Response, provider: &str) -> ProviderFailure {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let detail = format!("{} API error: {}", provider, sanitize_provider_error_text(&body));
    ProviderFailure::from_status(status, detail)
}

/// Read a successful response body as JSON
pub async fn json_body(response: reqwest::Response, provider: &str) -> Result<Value, ProviderFailure> {
    response.json::<Value>().await.map_err(|e| {
        if e.is_timeout() {
            ProviderFailure::Timeout
        } else {
            ProviderFailure::Transport(format!("Failed to parse {} response: {}", provider, e))
        }
    })
}

/// Unsigned token count at `value[key]`
pub fn token_count(value: &Value, key: &str) -> Option<u32> {
    value
        .get(key)
        .and_then(Value::as_u64)
        .map(|n| u32::try_from(n).unwrap_or(u32::MAX))
}
