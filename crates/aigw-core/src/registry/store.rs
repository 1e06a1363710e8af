//! Catalog persistence

use super::catalog::Catalog;
use super::types::{Model, ModelUpdate, NewModel, NewProvider, Provider, ProviderUpdate};
use crate::error::GatewayResult;
use crate::modules::ModuleConfiguration;
use crate::types::{ModelId, ProviderId};
use async_trait::async_trait;
use parking_lot::RwLock;

/// Durable home of the provider/model/module catalog
///
/// The registry reads whole snapshots via `load`; writes go through the
/// individual mutation methods and must keep the cascade rules of `Catalog`.
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Load the complete current catalog
    async fn load(&self) -> GatewayResult<Catalog>;

    async fn create_provider(&self, new: NewProvider) -> GatewayResult<Provider>;

    async fn update_provider(&self, id: ProviderId, update: ProviderUpdate) -> GatewayResult<Provider>;

    /// Delete a provider and its models
    async fn delete_provider(&self, id: ProviderId) -> GatewayResult<Provider>;

    async fn create_model(&self, new: NewModel) -> GatewayResult<Model>;

    async fn update_model(&self, id: ModelId, update: ModelUpdate) -> GatewayResult<Model>;

    async fn delete_model(&self, id: ModelId) -> GatewayResult<Model>;

    async fn upsert_module(&self, module: ModuleConfiguration) -> GatewayResult<ModuleConfiguration>;

    async fn delete_module(&self, name: &str) -> GatewayResult<ModuleConfiguration>;
}

/// Process-local catalog store
#[derive(Debug, Default)]
pub struct MemoryCatalog {
    inner: RwLock<Catalog>,
}

impl MemoryCatalog {
    pub fn new(catalog: Catalog) -> Self {
        Self {
            inner: RwLock::new(catalog),
        }
    }

    pub fn empty() -> Self {
        Self::new(Catalog::new())
    }
}

#[async_trait]
impl CatalogStore for MemoryCatalog {
    async fn load(&self) -> GatewayResult<Catalog> {
        Ok(self.inner.read().clone())
    }

    async fn create_provider(&self, new: NewProvider) -> GatewayResult<Provider> {
        self.inner.write().add_provider(new)
    }

    async fn update_provider(&self, id: ProviderId, update: ProviderUpdate) -> GatewayResult<Provider> {
        self.inner.write().update_provider(id, update)
    }

    async fn delete_provider(&self, id: ProviderId) -> GatewayResult<Provider> {
        self.inner.write().remove_provider(id)
    }

    async fn create_model(&self, new: NewModel) -> GatewayResult<Model> {
        self.inner.write().add_model(new)
    }

    async fn update_model(&self, id: ModelId, update: ModelUpdate) -> GatewayResult<Model> {
        self.inner.write().update_model(id, update)
    }

    async fn delete_model(&self, id: ModelId) -> GatewayResult<Model> {
        self.inner.write().remove_model(id)
    }

    async fn upsert_module(&self, module: ModuleConfiguration) -> GatewayResult<ModuleConfiguration> {
        Ok(self.inner.write().upsert_module(module))
    }

    async fn delete_module(&self, name: &str) -> GatewayResult<ModuleConfiguration> {
        self.inner.write().remove_module(name)
    }
}
