//! Anthropic Messages API adapter

use super::adapter::{Endpoint, Invocation, InvocationKind, InvocationRequest, ProviderAdapter, ProviderFailure};
use super::error_utils::{failure_from_reqwest, failure_from_response, json_body, token_count};
use crate::types::ChatRole;
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

const NAME: &str = "Anthropic";
const DEFAULT_VERSION: &str = "2023-06-01";
/// The Messages API requires a ceiling on every call
const DEFAULT_MAX_TOKENS: u32 = 4096;

#[derive(Debug, Clone)]
pub struct AnthropicAdapter {
    http_client: Client,
}

impl AnthropicAdapter {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    fn authorize(&self, request: reqwest::RequestBuilder, endpoint: &Endpoint) -> reqwest::RequestBuilder {
        let mut request = request.header(
            "anthropic-version",
            endpoint.setting("anthropic_version").unwrap_or(DEFAULT_VERSION),
        );
        if let Some(api_key) = endpoint.api_key() {
            request = request.header("x-api-key", api_key);
        }
        request
    }
}

/// System messages travel in the top-level `system` field
fn request_body(endpoint: &Endpoint, request: &InvocationRequest) -> Value {
    let system: Vec<&str> = request
        .messages
        .iter()
        .filter(|m| m.role == ChatRole::System)
        .map(|m| m.content.as_str())
        .collect();
    let messages: Vec<Value> = request
        .messages
        .iter()
        .filter(|m| m.role != ChatRole::System)
        .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
        .collect();

    let mut body = json!({
        "model": endpoint.model,
        "max_tokens": if request.max_tokens > 0 { request.max_tokens } else { DEFAULT_MAX_TOKENS },
        "temperature": request.temperature,
        "messages": messages,
    });
    if !system.is_empty() {
        body["system"] = json!(system.join("\n\n"));
    }
    body
}

#[async_trait]
impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    #[instrument(skip(self, endpoint, request), fields(model = %endpoint.model), level = "debug")]
    async fn invoke(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure> {
        if request.kind == InvocationKind::Embedding {
            return Err(ProviderFailure::VendorRejected {
                status: 400,
                retryable: false,
                detail: format!("{} does not offer embeddings", NAME),
            });
        }

        let http = self
            .http_client
            .post(format!("{}/v1/messages", endpoint.base_url))
            .json(&request_body(endpoint, request));
        let response = self
            .authorize(http, endpoint)
            .send()
            .await
            .map_err(|e| failure_from_reqwest(e, NAME))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }

        let json = json_body(response, NAME).await?;
        let content = json["content"]
            .as_array()
            .map(|blocks| {
                blocks
                    .iter()
                    .filter(|b| b["type"] == "text")
                    .filter_map(|b| b["text"].as_str())
                    .collect::<Vec<_>>()
                    .join("\n")
            })
            .unwrap_or_default();

        Ok(Invocation {
            content,
            prompt_tokens: token_count(&json["usage"], "input_tokens"),
            completion_tokens: token_count(&json["usage"], "output_tokens"),
        })
    }

    async fn ping(&self, endpoint: &Endpoint) -> Result<(), ProviderFailure> {
        let http = self.http_client.get(format!("{}/v1/models", endpoint.base_url));
        let response = self
            .authorize(http, endpoint)
            .send()
            .await
            .map_err(|e| failure_from_reqwest(e, NAME))?;
        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ChatMessage;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_messages_call() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/messages"))
            .and(header("x-api-key", "key-123"))
            .and(header("anthropic-version", DEFAULT_VERSION))
            .and(body_partial_json(json!({ "system": "Be brief." })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "content": [{ "type": "text", "text": "Short answer" }],
                "usage": { "input_tokens": 12, "output_tokens": 3 }
            })))
            .mount(&server)
            .await;

        let adapter = AnthropicAdapter::new(Client::new());
        let endpoint = Endpoint::new(server.uri(), "claude-test").with_api_key("key-123");
        let request = InvocationRequest::chat(
            vec![ChatMessage::system("Be brief."), ChatMessage::user("Explain")],
            100,
            0.5,
        );
        let invocation = adapter.invoke(&endpoint, &request).await.unwrap();

        assert_eq!(invocation.content, "Short answer");
        assert_eq!(invocation.prompt_tokens, Some(12));
        assert_eq!(invocation.completion_tokens, Some(3));
    }

    #[tokio::test]
    async fn test_rate_limited_by_vendor_is_retryable() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let adapter = AnthropicAdapter::new(Client::new());
        let endpoint = Endpoint::new(server.uri(), "claude-test");
        let request = InvocationRequest::chat(vec![ChatMessage::user("x")], 10, 0.0);
        let failure = adapter.invoke(&endpoint, &request).await.unwrap_err();
        assert!(failure.is_retryable());
    }

    #[test]
    fn test_body_without_system_prompt() {
        let endpoint = Endpoint::new("http://unused", "claude-test");
        let body = request_body(&endpoint, &InvocationRequest::chat(vec![ChatMessage::user("x")], 5, 0.0));
        assert!(body.get("system").is_none());
        assert_eq!(body["max_tokens"], 5);
    }

    #[test]
    fn test_uncapped_request_gets_default_ceiling() {
        let endpoint = Endpoint::new("http://unused", "claude-test");
        let body = request_body(&endpoint, &InvocationRequest::chat(vec![ChatMessage::user("x")], 0, 0.0));
        assert_eq!(body["max_tokens"], DEFAULT_MAX_TOKENS);
    }
}
