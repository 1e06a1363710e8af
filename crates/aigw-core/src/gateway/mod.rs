//! Request orchestration
//!
//! `Gateway` is the single entry point calling modules use. It owns one
//! instance of every component and runs each request through validation,
//! admission, budget, routing, cache and dispatch in that order.

mod admin;
mod dispatch;
mod execute;
mod prompt;
mod usage;
mod validation;

pub use admin::ConnectionReport;
pub use prompt::structured_result;
pub use validation::validate;

use crate::budget::BudgetGuard;
use crate::cache::{CacheStorage, MemoryStorage, ResponseCache};
use crate::config::GatewayConfig;
use crate::error::GatewayResult;
use crate::ledger::{JsonlLedger, MemoryJournal, MemoryLedger, RequestJournal, UsageLedger};
use crate::modules::ModuleResolver;
use crate::providers::{AdapterSet, CredentialVault, EnvVault, http_client};
use crate::rate_limit::RateLimiter;
use crate::registry::{Catalog, CatalogStore, MemoryCatalog, ProviderRegistry};
use std::sync::Arc;

/// The AI request gateway
pub struct Gateway {
    config: GatewayConfig,
    registry: Arc<ProviderRegistry>,
    resolver: ModuleResolver,
    rate_limiter: RateLimiter,
    budget: BudgetGuard,
    cache: ResponseCache,
    ledger: Arc<dyn UsageLedger>,
    journal: Arc<dyn RequestJournal>,
    adapters: AdapterSet,
    vault: Arc<dyn CredentialVault>,
}

impl std::fmt::Debug for Gateway {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Gateway")
            .field("registry", &self.registry)
            .field("rate_limiter", &self.rate_limiter)
            .field("cache", &self.cache)
            .field("adapters", &self.adapters)
            .finish_non_exhaustive()
    }
}

impl Gateway {
    /// Start a builder from configuration
    pub fn builder(config: GatewayConfig) -> GatewayBuilder {
        GatewayBuilder::new(config)
    }

    /// Build a gateway entirely from configuration
    ///
    /// Providers and modules come from the seed sections, the ledger is a
    /// JSONL file when `ledger.path` is set, and credentials resolve through
    /// the process environment.
    pub async fn from_config(config: GatewayConfig) -> GatewayResult<Self> {
        GatewayBuilder::new(config).build().await
    }

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn registry(&self) -> &Arc<ProviderRegistry> {
        &self.registry
    }

    pub fn resolver(&self) -> &ModuleResolver {
        &self.resolver
    }

    pub fn ledger(&self) -> &Arc<dyn UsageLedger> {
        &self.ledger
    }

    pub fn journal(&self) -> &Arc<dyn RequestJournal> {
        &self.journal
    }

    pub fn budget(&self) -> &BudgetGuard {
        &self.budget
    }
}

/// Builder for `Gateway`; every collaborator not supplied gets a default
pub struct GatewayBuilder {
    config: GatewayConfig,
    catalog: Option<Arc<dyn CatalogStore>>,
    ledger: Option<Arc<dyn UsageLedger>>,
    journal: Option<Arc<dyn RequestJournal>>,
    adapters: Option<AdapterSet>,
    vault: Option<Arc<dyn CredentialVault>>,
    cache_storage: Option<Arc<dyn CacheStorage>>,
}

impl GatewayBuilder {
    pub fn new(config: GatewayConfig) -> Self {
        Self {
            config,
            catalog: None,
            ledger: None,
            journal: None,
            adapters: None,
            vault: None,
            cache_storage: None,
        }
    }

    /// Persistence for providers, models and module configurations
    pub fn catalog_store(mut self, store: Arc<dyn CatalogStore>) -> Self {
        self.catalog = Some(store);
        self
    }

    pub fn ledger(mut self, ledger: Arc<dyn UsageLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    pub fn journal(mut self, journal: Arc<dyn RequestJournal>) -> Self {
        self.journal = Some(journal);
        self
    }

    pub fn adapters(mut self, adapters: AdapterSet) -> Self {
        self.adapters = Some(adapters);
        self
    }

    pub fn vault(mut self, vault: Arc<dyn CredentialVault>) -> Self {
        self.vault = Some(vault);
        self
    }

    pub fn cache_storage(mut self, storage: Arc<dyn CacheStorage>) -> Self {
        self.cache_storage = Some(storage);
        self
    }

    pub async fn build(self) -> GatewayResult<Gateway> {
        let config = self.config;
        config.validate()?;

        let catalog: Arc<dyn CatalogStore> = match self.catalog {
            Some(store) => store,
            None => Arc::new(MemoryCatalog::new(Catalog::from_seeds(
                &config.providers,
                &config.modules,
            )?)),
        };
        let registry = Arc::new(ProviderRegistry::new(catalog, config.registry.refresh_interval).await?);

        let ledger: Arc<dyn UsageLedger> = match (self.ledger, &config.ledger.path) {
            (Some(ledger), _) => ledger,
            (None, Some(path)) => Arc::new(JsonlLedger::open(path).await?),
            (None, None) => Arc::new(MemoryLedger::new()),
        };
        let journal = self
            .journal
            .unwrap_or_else(|| Arc::new(MemoryJournal::with_capacity(config.ledger.journal_capacity)));

        let adapters = match self.adapters {
            Some(adapters) => adapters,
            None => AdapterSet::with_defaults(http_client(config.failover.connect_test_timeout)?),
        };
        let vault = self.vault.unwrap_or_else(|| Arc::new(EnvVault::new()));

        let storage = self
            .cache_storage
            .unwrap_or_else(|| Arc::new(MemoryStorage::new(config.cache.capacity)));
        let cache = ResponseCache::with_storage(storage, &config.cache);

        let resolver = ModuleResolver::new(registry.clone(), config.defaults.clone());
        let rate_limiter = RateLimiter::new(&config.rate_limit);
        let budget = BudgetGuard::new(ledger.clone(), config.budget.clone());

        tracing::info!(
            providers = registry.snapshot().providers().len(),
            modules = registry.snapshot().modules().len(),
            cache_enabled = cache.is_enabled(),
            "gateway initialized"
        );

        Ok(Gateway {
            config,
            registry,
            resolver,
            rate_limiter,
            budget,
            cache,
            ledger,
            journal,
            adapters,
            vault,
        })
    }
}
