//! Ollama adapter

use super::adapter::{Endpoint, Invocation, InvocationKind, InvocationRequest, ProviderAdapter, ProviderFailure};
use super::error_utils::{failure_from_reqwest, failure_from_response, json_body, token_count};
use async_trait::async_trait;
use reqwest::Client;
use serde_json::{Value, json};

const NAME: &str = "Ollama";

/// Adapter for a local or remote Ollama server (`/api/chat`, `/api/embed`)
#[derive(Debug, Clone)]
pub struct OllamaAdapter {
    http_client: Client,
}

impl OllamaAdapter {
    pub fn new(http_client: Client) -> Self {
        Self { http_client }
    }

    async fn post(&self, endpoint: &Endpoint, path: &str, body: &Value) -> Result<Value, ProviderFailure> {
        let response = self
            .http_client
            .post(format!("{}{}", endpoint.base_url, path))
            .json(body)
            .send()
            .await
            .map_err(|e| failure_from_reqwest(e, NAME))?;

        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }
        json_body(response, NAME).await
    }
}

#[async_trait]
impl ProviderAdapter for OllamaAdapter {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn invoke(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure> {
        match request.kind {
            InvocationKind::Chat => {
                let messages: Vec<Value> = request
                    .messages
                    .iter()
                    .map(|m| json!({ "role": m.role.as_str(), "content": m.content }))
                    .collect();
                let mut body = json!({
                    "model": endpoint.model,
                    "messages": messages,
                    "stream": false,
                    "options": { "temperature": request.temperature },
                });
                if request.max_tokens > 0 {
                    body["options"]["num_predict"] = json!(request.max_tokens);
                }

                let json = self.post(endpoint, "/api/chat", &body).await?;
                Ok(Invocation {
                    content: json["message"]["content"].as_str().unwrap_or_default().to_string(),
                    prompt_tokens: token_count(&json, "prompt_eval_count"),
                    completion_tokens: token_count(&json, "eval_count"),
                })
            }
            InvocationKind::Embedding => {
                let body = json!({ "model": endpoint.model, "input": request.joined_content() });
                let json = self.post(endpoint, "/api/embed", &body).await?;
                let vector = json["embeddings"][0].clone();
                if !vector.is_array() {
                    return Err(ProviderFailure::Transport(format!("{} embedding response had no vector", NAME)));
                }
                Ok(Invocation {
                    content: vector.to_string(),
                    prompt_tokens: token_count(&json, "prompt_eval_count"),
                    completion_tokens: Some(0),
                })
            }
        }
    }

    async fn ping(&self, endpoint: &Endpoint) -> Result<(), ProviderFailure> {
        let response = self
            .http_client
            .get(format!("{}/api/tags", endpoint.base_url))
            .send()
            .await
            .map_err(|e| failure_from_reqwest(e, NAME))?;
        if !response.status().is_success() {
            return Err(failure_from_response(response, NAME).await);
        }
        Ok(())
    }
}
