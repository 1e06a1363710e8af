use super::Gateway;
use super::dispatch::{DispatchError, Dispatched};
use super::prompt;
use super::validation::validate;
use crate::budget::BudgetDecision;
use crate::cache::{CachedResponse, Fingerprint, FingerprintInput};
use crate::error::{GatewayError, GatewayResult, ProviderErrorKind};
use crate::ledger::{RecordOutcome, RecordStatus, RequestRecord, UsageLogEntry, UsageStatus};
use crate::modules::RoutePlan;
use crate::providers::{ProviderFailure, estimate_tokens};
use crate::rate_limit::RateDecision;
use crate::registry::TokenPrice;
use crate::types::{ActorContext, ExecuteRequest, GatewayResponse, Operation, Usage};
use chrono::Utc;
use rust_decimal::Decimal;
use tokio::time::Instant;
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

/// Per-request values shared by the completion paths
struct RequestContext<'a> {
    id: Uuid,
    actor: &'a ActorContext,
    request: &'a ExecuteRequest,
    started: Instant,
    fingerprint: Option<Fingerprint>,
    cacheable: bool,
}

impl RequestContext<'_> {
    fn elapsed_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }

    fn entry(&self) -> UsageLogEntry {
        let entry = UsageLogEntry::new(self.id, self.actor, &self.request.module, self.request.operation)
            .with_latency(self.elapsed_ms());
        match &self.fingerprint {
            Some(fp) => entry.with_fingerprint(fp.as_str()),
            None => entry,
        }
    }
}

impl Gateway {
    /// Run one logical operation for a calling module
    ///
    /// Permission, validation and rate-limit rejections leave no ledger
    /// entry. Every other outcome, including cache hits, budget rejections
    /// and exhausted failover, writes exactly one.
    #[instrument(
        skip(self, actor, request),
        fields(operation = %request.operation, module = %request.module, request_id = tracing::field::Empty)
    )]
    pub async fn execute(&self, actor: &ActorContext, request: ExecuteRequest) -> GatewayResult<GatewayResponse> {
        let mut ctx = RequestContext {
            id: Uuid::new_v4(),
            actor,
            request: &request,
            started: Instant::now(),
            fingerprint: None,
            cacheable: false,
        };
        tracing::Span::current().record("request_id", tracing::field::display(ctx.id));

        if !actor.permitted {
            warn!(actor_id = %actor.actor_id, "caller not permitted");
            return Err(GatewayError::PermissionDenied);
        }

        validate(&request, &self.config.validation)?;

        if let RateDecision::Rejected {
            scope,
            retry_after_secs,
        } = self
            .rate_limiter
            .try_acquire(&actor.actor_id, self.config.rate_limit.global_enabled)
        {
            warn!(actor_id = %actor.actor_id, %scope, retry_after_secs, "rate limited");
            return Err(GatewayError::RateLimited { retry_after_secs });
        }

        self.registry.refresh_if_stale().await;

        if let BudgetDecision::Exceeded { period } = self.budget.check_budget(&actor.tenant_id, Utc::now()).await? {
            warn!(tenant_id = %actor.tenant_id, %period, "budget exceeded");
            let err = GatewayError::BudgetExceeded {
                tenant_id: actor.tenant_id.clone(),
                period,
            };
            self.record_rejection(&ctx, &err).await;
            return Err(err);
        }

        let plan = match self.resolver.plan(
            &request.module,
            request.operation.required_modality(),
            self.config.failover.max_providers,
        ) {
            Ok(plan) => plan,
            Err(err) => {
                warn!(error = %err, "no route for request");
                self.record_rejection(&ctx, &err).await;
                return Err(err);
            }
        };

        let max_tokens = effective_max_tokens(request.options.max_tokens, plan.limits.max_tokens);
        let temperature = request.options.temperature.unwrap_or(plan.limits.temperature);

        let fingerprint = self.cache.fingerprint(&FingerprintInput {
            operation: request.operation,
            payload: &request.payload,
            max_tokens,
            temperature,
            module: &request.module,
            model_id: plan.candidates[0].model.id,
        });
        ctx.cacheable = request.operation.is_cacheable() && !request.options.skip_cache && self.cache.is_enabled();
        ctx.fingerprint = Some(fingerprint);

        if ctx.cacheable {
            if let Some(fp) = &ctx.fingerprint {
                if let Some(hit) = self.cache.get(fp).await {
                    return Ok(self.serve_cached(&ctx, hit).await);
                }
            }
        }

        let mut record = RequestRecord::pending(ctx.id, actor, &request.module, request.operation);
        if self.config.ledger.record_payloads {
            record = record.with_prompt(prompt::payload_text(&request.payload));
        }
        if let Err(e) = self.journal.open(record).await {
            warn!(error = %e, "failed to open audit record");
        }

        match self.dispatch(&plan, &request, max_tokens, temperature).await {
            Ok(dispatched) => Ok(self.complete_success(&ctx, &plan, dispatched).await),
            Err(failure) => Err(self.complete_failure(&ctx, failure).await),
        }
    }

    async fn serve_cached(&self, ctx: &RequestContext<'_>, hit: CachedResponse) -> GatewayResponse {
        let entry = ctx.entry().with_route(hit.provider_id, hit.model_id).cache_served();
        if let Err(e) = self.ledger.append(entry).await {
            error!(error = %e, "failed to write ledger entry for cache hit");
        }
        debug!(provider_id = hit.provider_id, "served from cache");

        GatewayResponse {
            request_id: ctx.id,
            content: hit.content,
            structured_result: hit.structured_result,
            usage: Usage::new(hit.prompt_tokens, hit.completion_tokens, Decimal::ZERO),
            latency_ms: ctx.elapsed_ms(),
            provider_id: hit.provider_id,
            model_id: hit.model_id,
            cached: true,
        }
    }

    async fn complete_success(&self, ctx: &RequestContext<'_>, plan: &RoutePlan, dispatched: Dispatched) -> GatewayResponse {
        let Dispatched {
            candidate,
            invocation,
            request: sent,
            attempts,
        } = dispatched;
        let operation = ctx.request.operation;
        let content = invocation.content;

        let prompt_tokens = invocation
            .prompt_tokens
            .unwrap_or_else(|| estimate_tokens(&sent.joined_content()));
        let completion_tokens = match (invocation.completion_tokens, operation) {
            (Some(tokens), _) => tokens,
            (None, Operation::Embed) => 0,
            (None, _) => estimate_tokens(&content),
        };
        let cost = TokenPrice::for_model(&candidate.model, &candidate.provider).calculate(prompt_tokens, completion_tokens);
        let usage = Usage::new(prompt_tokens, completion_tokens, cost);
        let structured_result = prompt::structured_result(operation, &content);
        let latency_ms = ctx.elapsed_ms();
        let (provider_id, model_id) = (candidate.provider.id, candidate.model.id);

        let entry = ctx.entry().with_route(provider_id, model_id).with_usage(&usage);
        if let Err(e) = self.ledger.append(entry).await {
            error!(error = %e, "failed to write ledger entry for successful request");
        }
        self.budget
            .record(&ctx.actor.tenant_id, u64::from(usage.total_tokens), usage.cost, Utc::now());

        let mut outcome = RecordOutcome::success(provider_id, model_id, usage).with_latency(latency_ms);
        if self.config.ledger.record_payloads {
            outcome = outcome.with_response(content.clone());
        }
        if let Err(e) = self.journal.complete(ctx.id, outcome).await {
            warn!(error = %e, "failed to complete audit record");
        }

        if ctx.cacheable {
            if let Some(fp) = &ctx.fingerprint {
                self.cache
                    .put(
                        fp.clone(),
                        CachedResponse {
                            content: content.clone(),
                            structured_result: structured_result.clone(),
                            prompt_tokens,
                            completion_tokens,
                            provider_id,
                            model_id,
                        },
                    )
                    .await;
            }
        }

        info!(
            provider_id,
            model_id,
            attempts,
            candidates = plan.candidates.len(),
            total_tokens = usage.total_tokens,
            latency_ms,
            "request completed"
        );

        GatewayResponse {
            request_id: ctx.id,
            content,
            structured_result,
            usage,
            latency_ms,
            provider_id,
            model_id,
            cached: false,
        }
    }

    async fn complete_failure(&self, ctx: &RequestContext<'_>, failed: DispatchError) -> GatewayError {
        let DispatchError {
            failure,
            attempts,
            last,
        } = failed;

        let (status, record_status, err) = match failure.kind() {
            None => (UsageStatus::Cancelled, RecordStatus::Cancelled, GatewayError::Cancelled),
            Some(kind) => {
                let (status, record_status) = if kind == ProviderErrorKind::Timeout {
                    (UsageStatus::Timeout, RecordStatus::Timeout)
                } else {
                    (UsageStatus::Error, RecordStatus::Error)
                };
                let err = GatewayError::Provider {
                    kind,
                    attempts,
                    reference: ctx.id.to_string(),
                };
                (status, record_status, err)
            }
        };

        let detail = failure.to_string();
        let mut entry = ctx.entry().failed(status, err.error_code(), detail.clone());
        if let Some(candidate) = &last {
            entry = entry.with_route(candidate.provider.id, candidate.model.id);
        }
        if let Err(e) = self.ledger.append(entry).await {
            error!(error = %e, "failed to write ledger entry for failed request");
        }

        let outcome = RecordOutcome::failure(record_status, err.error_code(), detail)
            .with_route(
                last.as_ref().map(|c| c.provider.id),
                last.as_ref().map(|c| c.model.id),
            )
            .with_latency(ctx.elapsed_ms());
        if let Err(e) = self.journal.complete(ctx.id, outcome).await {
            warn!(error = %e, "failed to complete audit record");
        }

        if matches!(failure, ProviderFailure::Cancelled) {
            warn!(attempts, "request cancelled by caller");
        } else {
            error!(attempts, error = %failure, code = err.error_code(), "all provider attempts failed");
        }
        err
    }

    /// Ledger a request stopped after admission but before dispatch
    async fn record_rejection(&self, ctx: &RequestContext<'_>, err: &GatewayError) {
        let entry = ctx
            .entry()
            .failed(UsageStatus::Error, err.error_code(), err.to_string());
        if let Err(e) = self.ledger.append(entry).await {
            error!(error = %e, "failed to write ledger entry for rejected request");
        }
    }
}

/// Combine the caller's ceiling with the module limit (`0` = no cap)
fn effective_max_tokens(requested: Option<u32>, module_limit: u32) -> u32 {
    match requested {
        Some(requested) if module_limit > 0 => requested.min(module_limit),
        Some(requested) => requested,
        None => module_limit,
    }
}
