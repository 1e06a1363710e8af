//! Provider registry
//!
//! The registry serves reads from a shared immutable snapshot of the catalog.
//! Snapshots are replaced wholesale after every administrative write and
//! whenever the refresh interval has elapsed, so readers never observe a
//! half-applied change.

mod catalog;
mod pricing;
mod store;
mod types;

pub use catalog::Catalog;
pub use pricing::TokenPrice;
pub use store::{CatalogStore, MemoryCatalog};
pub use types::{
    Credential, Model, ModelUpdate, NewModel, NewProvider, Provider, ProviderType, ProviderUpdate,
};

use crate::error::{GatewayError, GatewayResult};
use crate::modules::ModuleConfiguration;
use crate::types::{ModelId, ProviderId};
use parking_lot::RwLock;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::Instant;

/// Snapshot-serving facade over a `CatalogStore`
pub struct ProviderRegistry {
    store: Arc<dyn CatalogStore>,
    snapshot: RwLock<Arc<Catalog>>,
    loaded_at: RwLock<Option<Instant>>,
    refresh_interval: Duration,
    refreshing: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for ProviderRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderRegistry")
            .field("providers", &self.snapshot.read().providers().len())
            .field("refresh_interval", &self.refresh_interval)
            .finish()
    }
}

impl ProviderRegistry {
    /// Create a registry and load its first snapshot
    pub async fn new(store: Arc<dyn CatalogStore>, refresh_interval: Duration) -> GatewayResult<Self> {
        let registry = Self {
            store,
            snapshot: RwLock::new(Arc::new(Catalog::new())),
            loaded_at: RwLock::new(None),
            refresh_interval,
            refreshing: tokio::sync::Mutex::new(()),
        };
        registry.refresh().await?;
        Ok(registry)
    }

    /// Current catalog snapshot
    pub fn snapshot(&self) -> Arc<Catalog> {
        self.snapshot.read().clone()
    }

    /// Reload the snapshot from the store
    pub async fn refresh(&self) -> GatewayResult<()> {
        let catalog = self.store.load().await?;
        tracing::debug!(
            providers = catalog.providers().len(),
            models = catalog.models().len(),
            modules = catalog.modules().len(),
            "registry snapshot refreshed"
        );
        *self.snapshot.write() = Arc::new(catalog);
        *self.loaded_at.write() = Some(Instant::now());
        Ok(())
    }

    fn is_stale(&self) -> bool {
        self.loaded_at
            .read()
            .is_none_or(|at| at.elapsed() >= self.refresh_interval)
    }

    /// Reload when the snapshot is older than the refresh interval
    ///
    /// Only one caller reloads at a time; the others keep the current
    /// snapshot. A failed reload keeps serving the previous snapshot.
    pub async fn refresh_if_stale(&self) {
        if !self.is_stale() {
            return;
        }
        let Ok(_guard) = self.refreshing.try_lock() else {
            return;
        };
        // Another caller may have finished a reload before we got the lock
        if !self.is_stale() {
            return;
        }
        if let Err(e) = self.refresh().await {
            tracing::warn!(error = %e, "registry refresh failed, serving previous snapshot");
        }
    }

    /// Force the next `refresh_if_stale` to reload
    pub fn invalidate(&self) {
        *self.loaded_at.write() = None;
    }

    /// Active providers ordered by priority, optionally of one type
    pub fn list_active(&self, provider_type: Option<ProviderType>) -> Vec<Provider> {
        self.snapshot()
            .active_providers(provider_type)
            .into_iter()
            .cloned()
            .collect()
    }

    /// Look up a provider regardless of its active flag
    pub fn get(&self, id: ProviderId) -> GatewayResult<Provider> {
        self.snapshot()
            .provider(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("provider", id))
    }

    /// Look up a provider that is eligible for routing
    pub fn get_active(&self, id: ProviderId) -> GatewayResult<Provider> {
        let provider = self.get(id)?;
        if !provider.active {
            return Err(GatewayError::not_found("active provider", id));
        }
        Ok(provider)
    }

    pub fn model(&self, id: ModelId) -> GatewayResult<Model> {
        self.snapshot()
            .model(id)
            .cloned()
            .ok_or_else(|| GatewayError::not_found("model", id))
    }

    pub async fn create_provider(&self, new: NewProvider) -> GatewayResult<Provider> {
        let provider = self.store.create_provider(new).await?;
        tracing::info!(provider_id = provider.id, name = %provider.name, "provider created");
        self.refresh().await?;
        Ok(provider)
    }

    pub async fn update_provider(&self, id: ProviderId, update: ProviderUpdate) -> GatewayResult<Provider> {
        let provider = self.store.update_provider(id, update).await?;
        tracing::info!(provider_id = id, active = provider.active, "provider updated");
        self.refresh().await?;
        Ok(provider)
    }

    pub async fn delete_provider(&self, id: ProviderId) -> GatewayResult<Provider> {
        let provider = self.store.delete_provider(id).await?;
        tracing::info!(provider_id = id, "provider deleted");
        self.refresh().await?;
        Ok(provider)
    }

    pub async fn create_model(&self, new: NewModel) -> GatewayResult<Model> {
        let model = self.store.create_model(new).await?;
        tracing::info!(model_id = model.id, provider_id = model.provider_id, "model created");
        self.refresh().await?;
        Ok(model)
    }

    pub async fn update_model(&self, id: ModelId, update: ModelUpdate) -> GatewayResult<Model> {
        let model = self.store.update_model(id, update).await?;
        self.refresh().await?;
        Ok(model)
    }

    pub async fn delete_model(&self, id: ModelId) -> GatewayResult<Model> {
        let model = self.store.delete_model(id).await?;
        tracing::info!(model_id = id, "model deleted");
        self.refresh().await?;
        Ok(model)
    }

    pub async fn upsert_module(&self, module: ModuleConfiguration) -> GatewayResult<ModuleConfiguration> {
        let module = self.store.upsert_module(module).await?;
        self.refresh().await?;
        Ok(module)
    }

    pub async fn delete_module(&self, name: &str) -> GatewayResult<ModuleConfiguration> {
        let module = self.store.delete_module(name).await?;
        self.refresh().await?;
        Ok(module)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn registry() -> ProviderRegistry {
        ProviderRegistry::new(Arc::new(MemoryCatalog::empty()), Duration::from_secs(30))
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_writes_refresh_snapshot() {
        let registry = registry().await;
        let before = registry.snapshot();

        let provider = registry
            .create_provider(NewProvider::new("A", ProviderType::OpenAi, "http://a"))
            .await
            .unwrap();

        assert!(before.provider(provider.id).is_none());
        assert_eq!(registry.list_active(None).len(), 1);
        assert_eq!(registry.get(provider.id).unwrap().name, "A");
    }

    #[tokio::test]
    async fn test_get_active_rejects_inactive() {
        let registry = registry().await;
        let provider = registry
            .create_provider(NewProvider::new("A", ProviderType::OpenAi, "http://a").inactive())
            .await
            .unwrap();

        assert!(registry.get(provider.id).is_ok());
        assert!(matches!(
            registry.get_active(provider.id),
            Err(GatewayError::NotFound { .. })
        ));
        assert!(registry.list_active(None).is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_refresh_if_stale_picks_up_external_writes() {
        let store = Arc::new(MemoryCatalog::empty());
        let registry = ProviderRegistry::new(store.clone(), Duration::from_secs(30))
            .await
            .unwrap();

        store
            .create_provider(NewProvider::new("A", ProviderType::Ollama, "http://a"))
            .await
            .unwrap();

        registry.refresh_if_stale().await;
        assert!(registry.list_active(None).is_empty());

        tokio::time::advance(Duration::from_secs(31)).await;
        registry.refresh_if_stale().await;
        assert_eq!(registry.list_active(None).len(), 1);
    }

    #[tokio::test]
    async fn test_invalidate_forces_reload() {
        let store = Arc::new(MemoryCatalog::empty());
        let registry = ProviderRegistry::new(store.clone(), Duration::from_secs(3600))
            .await
            .unwrap();
        store
            .create_provider(NewProvider::new("A", ProviderType::Ollama, "http://a"))
            .await
            .unwrap();

        registry.invalidate();
        registry.refresh_if_stale().await;
        assert_eq!(registry.list_active(None).len(), 1);
    }

    /// Slow store that counts snapshot loads
    struct CountingStore {
        inner: MemoryCatalog,
        loads: std::sync::atomic::AtomicUsize,
    }

    #[async_trait::async_trait]
    impl CatalogStore for CountingStore {
        async fn load(&self) -> GatewayResult<Catalog> {
            self.loads.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(50)).await;
            self.inner.load().await
        }
        async fn create_provider(&self, new: NewProvider) -> GatewayResult<Provider> {
            self.inner.create_provider(new).await
        }
        async fn update_provider(&self, id: ProviderId, update: ProviderUpdate) -> GatewayResult<Provider> {
            self.inner.update_provider(id, update).await
        }
        async fn delete_provider(&self, id: ProviderId) -> GatewayResult<Provider> {
            self.inner.delete_provider(id).await
        }
        async fn create_model(&self, new: NewModel) -> GatewayResult<Model> {
            self.inner.create_model(new).await
        }
        async fn update_model(&self, id: ModelId, update: ModelUpdate) -> GatewayResult<Model> {
            self.inner.update_model(id, update).await
        }
        async fn delete_model(&self, id: ModelId) -> GatewayResult<Model> {
            self.inner.delete_model(id).await
        }
        async fn upsert_module(&self, module: ModuleConfiguration) -> GatewayResult<ModuleConfiguration> {
            self.inner.upsert_module(module).await
        }
        async fn delete_module(&self, name: &str) -> GatewayResult<ModuleConfiguration> {
            self.inner.delete_module(name).await
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_stale_reads_reload_once() {
        let store = Arc::new(CountingStore {
            inner: MemoryCatalog::empty(),
            loads: std::sync::atomic::AtomicUsize::new(0),
        });
        let registry = ProviderRegistry::new(store.clone(), Duration::from_secs(30))
            .await
            .unwrap();
        let loads = || store.loads.load(std::sync::atomic::Ordering::SeqCst);
        assert_eq!(loads(), 1);

        registry.invalidate();
        tokio::join!(
            registry.refresh_if_stale(),
            registry.refresh_if_stale(),
            registry.refresh_if_stale(),
        );
        assert_eq!(loads(), 2);

        // Fresh again, so nothing reloads
        registry.refresh_if_stale().await;
        assert_eq!(loads(), 2);
    }
}
