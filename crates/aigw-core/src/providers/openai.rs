//! OpenAI-compatible adapter

use super::adapter::{Endpoint, Invocation, InvocationKind, InvocationRequest, ProviderAdapter, ProviderFailure};
use super::error_utils::{failure_from_reqwest, failure_from_response, json_body, token_count};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};
use tracing::instrument;

const NAME: &str = "OpenAI";

/// Adapter for `/chat/completions` and `/embeddings`
#[derive(Debug, Clone)]
pub struct OpenAiAdapter {
    http_client: Client,
}

impl OpenAiAdapter {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    fn post(&self, endpoint: &Endpoint, path: &str, body: &Value) -> reqwest::RequestBuilder {
        let mut request = self
            .http_client
            .post(format!("{}{}", endpoint.base_url, path))
            .json(body);
        if let Some(api_key) = endpoint.api_key() {
            request = request.bearer_auth(api_key);
        }
        if let Some(org) = endpoint.setting("organization") {
            request = request.header("OpenAI-Organization", org);
        }
        request
    }

    async fn chat(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure> {
        let messages: Vec<Value> = request
            .messages
            .iter()
            .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
            .collect();

        let mut body = json!({
            "model": endpoint.model,
            "messages": messages,
            "temperature": request.temperature,
        });
        if request.max_tokens > 0 {
            body["max_tokens"] = json!(request.max_tokens);
        }

        let response = self
            .post(endpoint, "/chat/completions", &body)
            .send()
            .await
            .map_err(|e| failure_from_reqwest(e, NAME))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }

        let json = json_body(response, NAME).await?;
        let content = json["choices"][0]["message"]["content"]
            .as_str()
            .unwrap_or_default()
            .to_string();

        Ok(Invocation {
            content,
            prompt_tokens: token_count(&json["usage"], "prompt_tokens"),
            completion_tokens: token_count(&json["usage"], "completion_tokens"),
        })
    }

    async fn embed(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure> {
        let body = json!({
            "model": endpoint.model,
            "input": request.joined_content(),
        });

        let response = self
            .post(endpoint, "/embeddings", &body)
            .send()
            .await
            .map_err(|e| failure_from_reqwest(e, NAME))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }

        let json = json_body(response, NAME).await?;
        let vector = json["data"][0]["embedding"].clone();
        if !vector.is_array() {
            return Err(ProviderFailure::Transport(format!("{} embedding response had no vector", NAME)));
        }

        Ok(Invocation {
            content: vector.to_string(),
            prompt_tokens: token_count(&json["usage"], "prompt_tokens"),
            completion_tokens: Some(0),
        })
    }
}

#[async_trait]
impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    #[instrument(skip(self, endpoint, request), fields(model = %endpoint.model), level = "debug")]
    async fn invoke(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure> {
        match request.kind {
            InvocationKind::Chat => self.chat(endpoint, request).await,
            InvocationKind::Embedding => self.embed(endpoint, request).await,
        }
    }

    async fn ping(&self, endpoint: &Endpoint) -> Result<(), ProviderFailure> {
        let mut request = self.http_client.get(format!("{}/models", endpoint.base_url));
        if let Some(api_key) = endpoint.api_key() {
            request = request.bearer_auth(api_key);
        }
        let response = request.send().await.map_err(|e| failure_from_reqwest(e, NAME))?;
        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }
        Ok(())
    }
}
