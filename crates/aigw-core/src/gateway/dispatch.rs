//! Provider dispatch with bounded failover

use super::Gateway;
use super::prompt::build_invocation;
use crate::modules::{Candidate, RoutePlan};
use crate::providers::{Endpoint, Invocation, InvocationRequest, ProviderFailure};
use crate::registry::Provider;
use crate::types::ExecuteRequest;
use serde_json::Value;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

/// A candidate answered
pub(super) struct Dispatched {
    pub candidate: Candidate,
    pub invocation: Invocation,
    /// What was actually sent, for token estimation
    pub request: InvocationRequest,
    pub attempts: u32,
}

/// No candidate answered
pub(super) struct DispatchError {
    pub failure: ProviderFailure,
    pub attempts: u32,
    /// Candidate of the last failure, if any was tried
    pub last: Option<Candidate>,
}

impl Gateway {
    /// Try the plan's candidates in order until one succeeds
    ///
    /// Only retryable failures move on to the next candidate. A provider
    /// whose own request ceiling is reached is skipped without an attempt.
    pub(super) async fn dispatch(
        &self,
        plan: &RoutePlan,
        request: &ExecuteRequest,
        max_tokens: u32,
        temperature: f32,
    ) -> Result<Dispatched, DispatchError> {
        let cancel = request.options.cancel.as_ref();
        let mut attempts = 0u32;
        let mut last: Option<(Candidate, ProviderFailure)> = None;

        for candidate in &plan.candidates {
            if cancel.is_some_and(CancellationToken::is_cancelled) {
                return Err(DispatchError {
                    failure: ProviderFailure::Cancelled,
                    attempts,
                    last: last.map(|(c, _)| c),
                });
            }

            let provider = &candidate.provider;
            if !self
                .rate_limiter
                .try_acquire_provider(provider.id, provider.max_requests_per_minute)
            {
                warn!(provider_id = provider.id, "provider request limit reached, skipping");
                last = Some((candidate.clone(), ProviderFailure::Throttled));
                continue;
            }

            let invocation_request = build_invocation(
                &request.payload,
                request.operation,
                clamp_max_tokens(max_tokens, candidate),
                temperature,
            );

            attempts += 1;
            let started = Instant::now();
            let result = self.attempt(candidate, &invocation_request, cancel).await;
            let elapsed_ms = started.elapsed().as_millis() as u64;

            match result {
                Ok(invocation) => {
                    if last.is_some() {
                        info!(
                            provider_id = provider.id,
                            model_id = candidate.model.id,
                            attempts,
                            "request served after failover"
                        );
                    }
                    return Ok(Dispatched {
                        candidate: candidate.clone(),
                        invocation,
                        request: invocation_request,
                        attempts,
                    });
                }
                Err(ProviderFailure::Cancelled) => {
                    return Err(DispatchError {
                        failure: ProviderFailure::Cancelled,
                        attempts,
                        last: Some(candidate.clone()),
                    });
                }
                Err(failure) if !failure.is_retryable() => {
                    warn!(
                        provider_id = provider.id,
                        elapsed_ms,
                        error = %failure,
                        "provider rejected request, not failing over"
                    );
                    return Err(DispatchError {
                        failure,
                        attempts,
                        last: Some(candidate.clone()),
                    });
                }
                Err(failure) => {
                    warn!(
                        provider_id = provider.id,
                        model_id = candidate.model.id,
                        attempt = attempts,
                        elapsed_ms,
                        error = %failure,
                        "provider attempt failed"
                    );
                    last = Some((candidate.clone(), failure));
                }
            }
        }

        let (last, failure) = match last {
            Some((candidate, failure)) => (Some(candidate), failure),
            None => (None, ProviderFailure::Transport("no candidate was attempted".to_string())),
        };
        Err(DispatchError {
            failure,
            attempts,
            last,
        })
    }

    /// One timed call, aborted early when the caller cancels
    async fn attempt(
        &self,
        candidate: &Candidate,
        request: &InvocationRequest,
        cancel: Option<&CancellationToken>,
    ) -> Result<Invocation, ProviderFailure> {
        let provider = &candidate.provider;
        let Some(adapter) = self.adapters.resolve(provider) else {
            return Err(ProviderFailure::Transport(format!(
                "no adapter registered for provider type {}",
                provider.provider_type.as_str()
            )));
        };
        let endpoint = self.endpoint(provider, &candidate.model.identifier, &candidate.model.configuration)?;

        let call = tokio::time::timeout(self.config.failover.request_timeout, adapter.invoke(&endpoint, request));
        let outcome = match cancel {
            Some(token) => tokio::select! {
                biased;
                _ = token.cancelled() => return Err(ProviderFailure::Cancelled),
                outcome = call => outcome,
            },
            None => call.await,
        };

        match outcome {
            Ok(result) => result,
            Err(_) => Err(ProviderFailure::Timeout),
        }
    }

    /// Call target for `provider`, with its credential resolved
    pub(super) fn endpoint(
        &self,
        provider: &Provider,
        model_identifier: &str,
        model_configuration: &Value,
    ) -> Result<Endpoint, ProviderFailure> {
        let mut endpoint = Endpoint::new(provider.endpoint.clone(), model_identifier)
            .with_configuration(merge_configuration(&provider.configuration, model_configuration));

        if let Some(credential) = &provider.credential {
            let secret = self.vault.resolve(credential).map_err(|e| {
                warn!(provider_id = provider.id, error = %e, "credential could not be resolved");
                ProviderFailure::Transport(format!("credential for provider {} is unavailable", provider.name))
            })?;
            endpoint = endpoint.with_api_key(secret);
        }
        Ok(endpoint)
    }
}

/// Requested ceiling, capped by model and provider limits (`0` = no cap)
///
/// An uncapped request takes the tightest candidate limit. `0` is returned
/// only when nothing in the route sets one.
fn clamp_max_tokens(requested: u32, candidate: &Candidate) -> u32 {
    [candidate.model.max_tokens, candidate.provider.max_tokens_per_request]
        .into_iter()
        .filter(|limit| *limit > 0)
        .fold(requested, |max_tokens, limit| {
            if max_tokens == 0 { limit } else { max_tokens.min(limit) }
        })
}

/// Model settings win over provider settings
fn merge_configuration(provider: &Value, model: &Value) -> Value {
    match (provider, model) {
        (Value::Object(base), Value::Object(overrides)) => {
            let mut merged = base.clone();
            merged.extend(overrides.clone());
            Value::Object(merged)
        }
        (_, Value::Object(_)) => model.clone(),
        _ => provider.clone(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::{Model, ProviderType};
    use crate::types::Modality;
    use rust_decimal::Decimal;
    use serde_json::json;

    fn candidate(model_max: u32, provider_max: u32) -> Candidate {
        Candidate {
            provider: Provider {
                id: 1,
                name: "p".into(),
                provider_type: ProviderType::OpenAi,
                endpoint: "http://localhost".into(),
                credential: None,
                max_requests_per_minute: 0,
                max_tokens_per_request: provider_max,
                cost_per_token: Decimal::ZERO,
                active: true,
                priority: 1,
                configuration: Value::Null,
            },
            model: Model {
                id: 1,
                provider_id: 1,
                identifier: "m".into(),
                modality: Modality::Text,
                max_tokens: model_max,
                supports_streaming: false,
                input_cost_per_token: Decimal::ZERO,
                output_cost_per_token: Decimal::ZERO,
                active: true,
                configuration: Value::Null,
            },
        }
    }

    #[test]
    fn test_clamp_max_tokens() {
        assert_eq!(clamp_max_tokens(1024, &candidate(4096, 0)), 1024);
        assert_eq!(clamp_max_tokens(1024, &candidate(512, 0)), 512);
        assert_eq!(clamp_max_tokens(1024, &candidate(0, 256)), 256);
        assert_eq!(clamp_max_tokens(1024, &candidate(300, 200)), 200);
        assert_eq!(clamp_max_tokens(0, &candidate(4096, 0)), 4096);
        assert_eq!(clamp_max_tokens(0, &candidate(4096, 2048)), 2048);
        assert_eq!(clamp_max_tokens(0, &candidate(0, 0)), 0);
    }

    #[test]
    fn test_merge_configuration() {
        let merged = merge_configuration(
            &json!({ "organization": "org-1", "anthropic_version": "2023-06-01" }),
            &json!({ "anthropic_version": "2024-01-01" }),
        );
        assert_eq!(merged["organization"], "org-1");
        assert_eq!(merged["anthropic_version"], "2024-01-01");

        assert_eq!(merge_configuration(&Value::Null, &Value::Null), Value::Null);
        assert_eq!(merge_configuration(&json!({ "a": 1 }), &Value::Null), json!({ "a": 1 }));
    }
}
