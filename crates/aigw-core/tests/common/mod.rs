//! Shared fixtures for gateway integration tests

#![allow(dead_code)]

use aigw_core::config::GatewayConfig;
use aigw_core::ledger::{MemoryJournal, MemoryLedger};
use aigw_core::providers::{
    AdapterSet, Endpoint, Invocation, InvocationRequest, PlainVault, ProviderAdapter, ProviderFailure,
};
use aigw_core::registry::{Catalog, MemoryCatalog, NewModel, NewProvider, ProviderType};
use aigw_core::{ActorContext, Gateway, Modality, ModelId, ProviderId};
use async_trait::async_trait;
use mockall::mock;
use parking_lot::Mutex;
use rust_decimal::Decimal;
use std::collections::VecDeque;
use std::str::FromStr;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

/// One scripted adapter response
#[derive(Debug, Clone)]
pub enum Step {
    Reply(Invocation),
    Fail(ProviderFailure),
    /// Never answers; only a timeout or cancellation ends the attempt
    Hang,
}

/// Adapter that plays back a script, then repeats its fallback step
#[derive(Debug)]
pub struct ScriptedAdapter {
    script: Mutex<VecDeque<Step>>,
    fallback: Step,
    calls: AtomicUsize,
    requests: Mutex<Vec<InvocationRequest>>,
}

impl ScriptedAdapter {
    pub fn new(script: Vec<Step>, fallback: Step) -> Arc<Self> {
        Arc::new(Self {
            script: Mutex::new(script.into()),
            fallback,
            calls: AtomicUsize::new(0),
            requests: Mutex::new(Vec::new()),
        })
    }

    /// Always answers `content` with 12 prompt and 8 completion tokens
    pub fn replying(content: &str) -> Arc<Self> {
        Self::new(vec![], Step::Reply(Invocation::new(content).with_usage(12, 8)))
    }

    /// Always answers `content` without reporting usage
    pub fn replying_without_usage(content: &str) -> Arc<Self> {
        Self::new(vec![], Step::Reply(Invocation::new(content)))
    }

    pub fn failing(failure: ProviderFailure) -> Arc<Self> {
        Self::new(vec![], Step::Fail(failure))
    }

    pub fn hanging() -> Arc<Self> {
        Self::new(vec![], Step::Hang)
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub fn last_request(&self) -> Option<InvocationRequest> {
        self.requests.lock().last().cloned()
    }
}

#[async_trait]
impl ProviderAdapter for ScriptedAdapter {
    fn name(&self) -> &'static str {
        "scripted"
    }

    async fn invoke(&self, _endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.requests.lock().push(request.clone());
        let step = self.script.lock().pop_front().unwrap_or_else(|| self.fallback.clone());
        match step {
            Step::Reply(invocation) => Ok(invocation),
            Step::Fail(failure) => Err(failure),
            Step::Hang => std::future::pending().await,
        }
    }

    async fn ping(&self, _endpoint: &Endpoint) -> Result<(), ProviderFailure> {
        Ok(())
    }
}

mock! {
    pub Adapter {}

    #[async_trait]
    impl ProviderAdapter for Adapter {
        fn name(&self) -> &'static str;
        async fn invoke(&self, endpoint: &Endpoint, request: &InvocationRequest) -> Result<Invocation, ProviderFailure>;
        async fn ping(&self, endpoint: &Endpoint) -> Result<(), ProviderFailure>;
    }
}

/// Provider/model ids created by `catalog_with`
#[derive(Debug, Clone, Copy)]
pub struct Route {
    pub provider_id: ProviderId,
    pub model_id: ModelId,
}

pub fn price(value: &str) -> Decimal {
    Decimal::from_str(value).unwrap()
}

/// One OpenAI-type provider per `(name, priority)`, each with a priced text model
pub fn catalog_with(providers: &[(&str, i32)]) -> (Catalog, Vec<Route>) {
    let mut catalog = Catalog::new();
    let mut routes = Vec::new();
    for (name, priority) in providers {
        let provider = catalog
            .add_provider(
                NewProvider::new(*name, ProviderType::OpenAi, format!("http://{}.test", name.to_lowercase()))
                    .with_priority(*priority)
                    .with_credential(format!("key-{}", name)),
            )
            .unwrap();
        let model = catalog
            .add_model(
                NewModel::new(provider.id, format!("{}-model", name.to_lowercase()), Modality::Text)
                    .with_pricing(price("0.000001"), price("0.000002")),
            )
            .unwrap();
        routes.push(Route {
            provider_id: provider.id,
            model_id: model.id,
        });
    }
    (catalog, routes)
}

/// Gateway plus handles on its in-memory stores
pub struct Fixture {
    pub gateway: Gateway,
    pub ledger: Arc<MemoryLedger>,
    pub journal: Arc<MemoryJournal>,
}

pub async fn gateway(
    config: GatewayConfig,
    catalog: Catalog,
    adapters: Vec<(ProviderId, Arc<dyn ProviderAdapter>)>,
) -> Fixture {
    let ledger = Arc::new(MemoryLedger::new());
    let journal = Arc::new(MemoryJournal::new());
    let adapters = adapters
        .into_iter()
        .fold(AdapterSet::new(), |set, (id, adapter)| set.with_provider(id, adapter));

    let gateway = Gateway::builder(config)
        .catalog_store(Arc::new(MemoryCatalog::new(catalog)))
        .ledger(ledger.clone())
        .journal(journal.clone())
        .adapters(adapters)
        .vault(Arc::new(PlainVault))
        .build()
        .await
        .unwrap();

    Fixture {
        gateway,
        ledger,
        journal,
    }
}

pub fn actor() -> ActorContext {
    ActorContext::new("user-1", "acme")
}

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter("aigw_core=debug")
        .with_test_writer()
        .try_init();
}
