//! Module to provider/model resolution

use super::types::{ModuleConfiguration, ModuleLimits};
use crate::config::DefaultsConfig;
use crate::error::{GatewayError, GatewayResult};
use crate::registry::{Catalog, Model, Provider, ProviderRegistry};
use crate::types::Modality;
use std::sync::Arc;

/// A routable provider/model pair
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    pub provider: Provider,
    pub model: Model,
}

/// Primary resolution for a module
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub provider: Provider,
    pub model: Model,
    pub limits: ModuleLimits,
}

/// Ordered failover plan for a module
#[derive(Debug, Clone, PartialEq)]
pub struct RoutePlan {
    /// Distinct providers, first is the primary
    pub candidates: Vec<Candidate>,
    pub limits: ModuleLimits,
}

/// Resolves calling modules to providers using the registry snapshot
#[derive(Debug)]
pub struct ModuleResolver {
    registry: Arc<ProviderRegistry>,
    defaults: DefaultsConfig,
}

impl ModuleResolver {
    pub fn new(registry: Arc<ProviderRegistry>, defaults: DefaultsConfig) -> Self {
        Self { registry, defaults }
    }

    /// Active configuration for a module, if any
    pub fn configuration(&self, module: &str) -> Option<ModuleConfiguration> {
        self.registry
            .snapshot()
            .module(module)
            .filter(|m| m.active)
            .cloned()
    }

    /// Resolve the provider/model a module's request goes to first
    pub fn resolve(&self, module: &str, modality: Modality) -> GatewayResult<Resolution> {
        let plan = self.plan(module, modality, 1)?;
        let limits = plan.limits;
        let primary = plan
            .candidates
            .into_iter()
            .next()
            .ok_or_else(|| no_provider(module, modality))?;
        Ok(Resolution {
            provider: primary.provider,
            model: primary.model,
            limits,
        })
    }

    /// Build up to `max_providers` candidates in failover order
    ///
    /// The module's default pair leads when both records are active and the
    /// model serves the required modality. Remaining providers follow in
    /// ascending priority (ties by id), each contributing its lowest-id
    /// eligible model, filtered by the module's allow-lists.
    pub fn plan(&self, module: &str, modality: Modality, max_providers: usize) -> GatewayResult<RoutePlan> {
        let catalog = self.registry.snapshot();
        let config = catalog.module(module).filter(|m| m.active);
        let limits = ModuleLimits::resolve(config, &self.defaults);

        let candidates = build_candidates(&catalog, config, modality, max_providers);
        if candidates.is_empty() {
            tracing::debug!(module, %modality, "no eligible provider");
            return Err(no_provider(module, modality));
        }

        tracing::debug!(
            module,
            %modality,
            primary = candidates[0].provider.id,
            candidates = candidates.len(),
            "resolved route"
        );
        Ok(RoutePlan { candidates, limits })
    }
}

fn no_provider(module: &str, modality: Modality) -> GatewayError {
    GatewayError::NoProviderAvailable {
        module: module.to_string(),
        modality,
    }
}

fn build_candidates(
    catalog: &Catalog,
    config: Option<&ModuleConfiguration>,
    modality: Modality,
    max_providers: usize,
) -> Vec<Candidate> {
    let mut candidates: Vec<Candidate> = Vec::new();
    if max_providers == 0 {
        return candidates;
    }

    if let Some(default) = config.and_then(|c| default_pair(catalog, c, modality)) {
        candidates.push(default);
    }

    for provider in catalog.active_providers(None) {
        if candidates.len() >= max_providers {
            break;
        }
        if candidates.iter().any(|c| c.provider.id == provider.id) {
            continue;
        }
        if config.is_some_and(|c| !c.allows_provider(provider.id)) {
            continue;
        }
        let model = catalog.models_of(provider.id).find(|m| {
            m.active
                && m.modality.satisfies(modality)
                && config.is_none_or(|c| c.allows_model(m.id))
        });
        if let Some(model) = model {
            candidates.push(Candidate {
                provider: provider.clone(),
                model: model.clone(),
            });
        }
    }

    candidates
}

fn default_pair(catalog: &Catalog, config: &ModuleConfiguration, modality: Modality) -> Option<Candidate> {
    let provider = catalog.provider(config.default_provider_id?)?;
    let model = catalog.model(config.default_model_id?)?;
    let usable = provider.active
        && model.active
        && model.provider_id == provider.id
        && model.modality.satisfies(modality);
    usable.then(|| Candidate {
        provider: provider.clone(),
        model: model.clone(),
    })
}
