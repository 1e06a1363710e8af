//! Administrative operations
//!
//! Nothing here runs on the request path. Catalog writes go through the
//! registry so the next request sees the new snapshot.

use super::Gateway;
use crate::cache::CacheStatistics;
use crate::error::{GatewayError, GatewayResult};
use crate::ledger::{Annotation, UsageLogEntry};
use crate::modules::ModuleConfiguration;
use crate::providers::ProviderFailure;
use crate::registry::{Model, ModelUpdate, NewModel, NewProvider, Provider, ProviderUpdate};
use crate::types::{ModelId, ProviderId};
use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Result of a provider connectivity check
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionReport {
    pub provider_id: ProviderId,
    pub reachable: bool,
    pub latency_ms: u64,
    /// Redacted failure description when unreachable
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl Gateway {
    /// Ping a provider's endpoint with its stored credential
    ///
    /// Works for inactive providers too, so an administrator can check a
    /// provider before enabling it.
    pub async fn test_connection(&self, provider_id: ProviderId) -> GatewayResult<ConnectionReport> {
        let provider = self.registry.get(provider_id)?;
        let adapter = self.adapters.resolve(&provider).ok_or_else(|| {
            GatewayError::config(format!(
                "no adapter registered for provider type {}",
                provider.provider_type.as_str()
            ))
        })?;

        let catalog = self.registry.snapshot();
        let model = catalog.models_of(provider_id).find(|m| m.active);
        let (identifier, configuration) = match model {
            Some(m) => (m.identifier.as_str(), m.configuration.clone()),
            None => ("", serde_json::Value::Null),
        };

        let started = Instant::now();
        let result = match self.endpoint(&provider, identifier, &configuration) {
            Ok(endpoint) => {
                match tokio::time::timeout(self.config.failover.connect_test_timeout, adapter.ping(&endpoint)).await {
                    Ok(result) => result,
                    Err(_) => Err(ProviderFailure::Timeout),
                }
            }
            Err(failure) => Err(failure),
        };
        let latency_ms = started.elapsed().as_millis() as u64;

        let report = ConnectionReport {
            provider_id,
            reachable: result.is_ok(),
            latency_ms,
            error: result.err().map(|f| f.to_string()),
        };
        info!(provider_id, reachable = report.reachable, latency_ms, "connection test finished");
        Ok(report)
    }

    /// Check every provider concurrently, in catalog order
    pub async fn test_all_connections(&self) -> Vec<ConnectionReport> {
        let ids: Vec<ProviderId> = self.registry.snapshot().providers().iter().map(|p| p.id).collect();
        let checks = ids.iter().map(|&id| async move {
            self.test_connection(id).await.unwrap_or_else(|e| ConnectionReport {
                provider_id: id,
                reachable: false,
                latency_ms: 0,
                error: Some(e.to_string()),
            })
        });
        futures::future::join_all(checks).await
    }

    /// Upsert many module configurations, checking their references first
    ///
    /// Either every configuration is valid and all are written, or none are.
    pub async fn sync_modules(&self, modules: Vec<ModuleConfiguration>) -> GatewayResult<usize> {
        let catalog = self.registry.snapshot();
        for module in &modules {
            if module.name.trim().is_empty() {
                return Err(GatewayError::validation_field("name", "module name is required"));
            }
            if let Some(provider_id) = module.default_provider_id {
                if catalog.provider(provider_id).is_none() {
                    return Err(GatewayError::not_found("provider", provider_id));
                }
            }
            if let Some(model_id) = module.default_model_id {
                let model = catalog
                    .model(model_id)
                    .ok_or_else(|| GatewayError::not_found("model", model_id))?;
                if let Some(provider_id) = module.default_provider_id.filter(|p| *p != model.provider_id) {
                    return Err(GatewayError::validation_field(
                        "default_model_id",
                        format!("model {} does not belong to provider {}", model_id, provider_id),
                    ));
                }
            }
        }

        let count = modules.len();
        for module in modules {
            self.registry.upsert_module(module).await?;
        }
        info!(count, "module configurations synced");
        Ok(count)
    }

    pub async fn create_provider(&self, new: NewProvider) -> GatewayResult<Provider> {
        self.registry.create_provider(new).await
    }

    pub async fn update_provider(&self, id: ProviderId, update: ProviderUpdate) -> GatewayResult<Provider> {
        self.registry.update_provider(id, update).await
    }

    /// Stop routing new requests to a provider; in-flight requests finish
    pub async fn deactivate_provider(&self, id: ProviderId) -> GatewayResult<Provider> {
        self.registry.update_provider(id, ProviderUpdate::deactivate()).await
    }

    /// Remove a provider and its models; module defaults pointing at it are cleared
    pub async fn delete_provider(&self, id: ProviderId) -> GatewayResult<Provider> {
        self.registry.delete_provider(id).await
    }

    pub async fn create_model(&self, new: NewModel) -> GatewayResult<Model> {
        self.registry.create_model(new).await
    }

    pub async fn update_model(&self, id: ModelId, update: ModelUpdate) -> GatewayResult<Model> {
        self.registry.update_model(id, update).await
    }

    pub async fn deactivate_model(&self, id: ModelId) -> GatewayResult<Model> {
        self.registry.update_model(id, ModelUpdate::deactivate()).await
    }

    pub async fn delete_model(&self, id: ModelId) -> GatewayResult<Model> {
        self.registry.delete_model(id).await
    }

    /// Drop every cached response
    pub async fn flush_cache(&self) -> GatewayResult<()> {
        self.cache.flush_all().await?;
        info!("response cache flushed");
        Ok(())
    }

    pub async fn cache_statistics(&self) -> GatewayResult<CacheStatistics> {
        self.cache.statistics().await
    }

    /// Flag, unflag or review a ledger entry
    pub async fn annotate_entry(&self, id: Uuid, annotation: Annotation) -> GatewayResult<UsageLogEntry> {
        self.ledger.annotate(id, annotation).await
    }

    /// Drop idle rate windows and expired cache entries
    pub async fn run_maintenance(&self) {
        self.rate_limiter.prune();
        match self.cache.cleanup_expired().await {
            Ok(removed) if removed > 0 => info!(removed, "expired cache entries removed"),
            Ok(_) => {}
            Err(e) => warn!(error = %e, "cache cleanup failed"),
        }
        if let Ok(stats) = self.cache.statistics().await {
            debug!(
                entries = stats.entry_count,
                hit_rate = format!("{:.2}", stats.hit_rate()),
                evictions = stats.evictions,
                "cache statistics"
            );
        }
        self.registry.refresh_if_stale().await;
    }
}
