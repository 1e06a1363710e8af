//! In-memory catalog of providers, models and module configurations

use super::types::{Credential, Model, ModelUpdate, NewModel, NewProvider, Provider, ProviderType, ProviderUpdate};
use crate::config::{ModuleSeed, ProviderSeed};
use crate::error::{GatewayError, GatewayResult};
use crate::modules::ModuleConfiguration;
use crate::types::{ModelId, ProviderId};
use serde::{Deserialize, Serialize};

/// Complete catalog state
///
/// Deleting a provider removes its models. Deleting a provider or model
/// clears any module default that pointed at it.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    providers: Vec<Provider>,
    models: Vec<Model>,
    modules: Vec<ModuleConfiguration>,
    next_provider_id: ProviderId,
    next_model_id: ModelId,
}

impl Catalog {
    pub fn new() -> Self {
        Self {
            next_provider_id: 1,
            next_model_id: 1,
            ..Default::default()
        }
    }

    /// Build a catalog from configuration seeds, resolving names to ids
    pub fn from_seeds(providers: &[ProviderSeed], modules: &[ModuleSeed]) -> GatewayResult<Self> {
        let mut catalog = Self::new();

        for seed in providers {
            let provider = catalog.add_provider(NewProvider {
                name: seed.name.clone(),
                provider_type: seed.provider_type,
                endpoint: seed.endpoint.clone(),
                credential: seed.credential.clone().map(Credential::new),
                max_requests_per_minute: seed.max_requests_per_minute,
                max_tokens_per_request: seed.max_tokens_per_request,
                cost_per_token: seed.cost_per_token,
                active: seed.active,
                priority: seed.priority,
                configuration: seed.configuration.clone(),
            })?;

            for model in &seed.models {
                catalog.add_model(NewModel {
                    provider_id: provider.id,
                    identifier: model.identifier.clone(),
                    modality: model.modality,
                    max_tokens: model.max_tokens,
                    supports_streaming: model.supports_streaming,
                    input_cost_per_token: model.input_cost_per_token,
                    output_cost_per_token: model.output_cost_per_token,
                    active: model.active,
                    configuration: model.configuration.clone(),
                })?;
            }
        }

        for seed in modules {
            let module = catalog.module_from_seed(seed)?;
            catalog.upsert_module(module);
        }

        Ok(catalog)
    }

    fn module_from_seed(&self, seed: &ModuleSeed) -> GatewayResult<ModuleConfiguration> {
        let context = || format!("Resolving module '{}'", seed.name);

        let default_provider_id = seed
            .default_provider
            .as_deref()
            .map(|name| {
                self.provider_by_name(name).map(|p| p.id).ok_or_else(|| {
                    GatewayError::config_with_context(format!("unknown provider '{}'", name), context())
                })
            })
            .transpose()?;

        let default_model_id = match (&seed.default_model, default_provider_id) {
            (Some(identifier), Some(provider_id)) => Some(
                self.model_by_identifier(provider_id, identifier)
                    .map(|m| m.id)
                    .ok_or_else(|| {
                        GatewayError::config_with_context(
                            format!("unknown model '{}'", identifier),
                            context(),
                        )
                    })?,
            ),
            (Some(_), None) => {
                return Err(GatewayError::config_with_context(
                    "default_model requires default_provider",
                    context(),
                ));
            }
            (None, _) => None,
        };

        let mut allowed_provider_ids = Vec::with_capacity(seed.allowed_providers.len());
        for name in &seed.allowed_providers {
            let provider = self.provider_by_name(name).ok_or_else(|| {
                GatewayError::config_with_context(format!("unknown provider '{}'", name), context())
            })?;
            allowed_provider_ids.push(provider.id);
        }

        let mut allowed_model_ids = Vec::new();
        for identifier in &seed.allowed_models {
            let matches: Vec<ModelId> = self
                .models
                .iter()
                .filter(|m| &m.identifier == identifier)
                .map(|m| m.id)
                .collect();
            if matches.is_empty() {
                return Err(GatewayError::config_with_context(
                    format!("unknown model '{}'", identifier),
                    context(),
                ));
            }
            allowed_model_ids.extend(matches);
        }

        Ok(ModuleConfiguration {
            name: seed.name.clone(),
            display_name: seed.display_name.clone(),
            description: seed.description.clone(),
            default_provider_id,
            default_model_id,
            allowed_provider_ids,
            allowed_model_ids,
            max_tokens: seed.max_tokens,
            temperature: seed.temperature,
            streaming_enabled: seed.streaming_enabled,
            active: seed.active,
            priority: seed.priority,
        })
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn models(&self) -> &[Model] {
        &self.models
    }

    pub fn modules(&self) -> &[ModuleConfiguration] {
        &self.modules
    }

    pub fn provider(&self, id: ProviderId) -> Option<&Provider> {
        self.providers.iter().find(|p| p.id == id)
    }

    pub fn provider_by_name(&self, name: &str) -> Option<&Provider> {
        self.providers.iter().find(|p| p.name == name)
    }

    pub fn model(&self, id: ModelId) -> Option<&Model> {
        self.models.iter().find(|m| m.id == id)
    }

    pub fn model_by_identifier(&self, provider_id: ProviderId, identifier: &str) -> Option<&Model> {
        self.models
            .iter()
            .find(|m| m.provider_id == provider_id && m.identifier == identifier)
    }

    pub fn module(&self, name: &str) -> Option<&ModuleConfiguration> {
        self.modules.iter().find(|m| m.name == name)
    }

    /// Models of one provider, ordered by id
    pub fn models_of(&self, provider_id: ProviderId) -> impl Iterator<Item = &Model> {
        self.models.iter().filter(move |m| m.provider_id == provider_id)
    }

    /// Active providers ordered by ascending priority, ties broken by id
    pub fn active_providers(&self, provider_type: Option<ProviderType>) -> Vec<&Provider> {
        let mut providers: Vec<&Provider> = self
            .providers
            .iter()
            .filter(|p| p.active)
            .filter(|p| provider_type.is_none_or(|t| p.provider_type == t))
            .collect();
        providers.sort_by_key(|p| (p.priority, p.id));
        providers
    }

    pub fn add_provider(&mut self, new: NewProvider) -> GatewayResult<Provider> {
        if new.name.trim().is_empty() {
            return Err(GatewayError::validation_field("name", "provider name must not be empty"));
        }
        if self.provider_by_name(&new.name).is_some() {
            return Err(GatewayError::validation_field(
                "name",
                format!("provider '{}' already exists", new.name),
            ));
        }
        if new.cost_per_token.is_sign_negative() {
            return Err(GatewayError::validation_field("cost_per_token", "must not be negative"));
        }

        let provider = Provider {
            id: self.next_provider_id.max(1),
            name: new.name,
            provider_type: new.provider_type,
            endpoint: new.endpoint,
            credential: new.credential,
            max_requests_per_minute: new.max_requests_per_minute,
            max_tokens_per_request: new.max_tokens_per_request,
            cost_per_token: new.cost_per_token,
            active: new.active,
            priority: new.priority,
            configuration: new.configuration,
        };
        self.next_provider_id = provider.id + 1;
        self.providers.push(provider.clone());
        Ok(provider)
    }

    pub fn update_provider(&mut self, id: ProviderId, update: ProviderUpdate) -> GatewayResult<Provider> {
        if let Some(name) = &update.name {
            if self.providers.iter().any(|p| p.id != id && &p.name == name) {
                return Err(GatewayError::validation_field(
                    "name",
                    format!("provider '{}' already exists", name),
                ));
            }
        }
        let provider = self
            .providers
            .iter_mut()
            .find(|p| p.id == id)
            .ok_or_else(|| GatewayError::not_found("provider", id))?;
        update.apply(provider);
        Ok(provider.clone())
    }

    /// Remove a provider together with its models
    pub fn remove_provider(&mut self, id: ProviderId) -> GatewayResult<Provider> {
        let index = self
            .providers
            .iter()
            .position(|p| p.id == id)
            .ok_or_else(|| GatewayError::not_found("provider", id))?;
        let provider = self.providers.remove(index);

        let removed_models: Vec<ModelId> = self.models_of(id).map(|m| m.id).collect();
        self.models.retain(|m| m.provider_id != id);

        for module in &mut self.modules {
            if module.default_provider_id == Some(id) {
                module.default_provider_id = None;
                module.default_model_id = None;
            }
            if module.default_model_id.is_some_and(|m| removed_models.contains(&m)) {
                module.default_model_id = None;
            }
            module.allowed_provider_ids.retain(|p| *p != id);
            module.allowed_model_ids.retain(|m| !removed_models.contains(m));
        }

        Ok(provider)
    }

    pub fn add_model(&mut self, new: NewModel) -> GatewayResult<Model> {
        if self.provider(new.provider_id).is_none() {
            return Err(GatewayError::not_found("provider", new.provider_id));
        }
        if new.identifier.trim().is_empty() {
            return Err(GatewayError::validation_field("identifier", "model identifier must not be empty"));
        }
        if self.model_by_identifier(new.provider_id, &new.identifier).is_some() {
            return Err(GatewayError::validation_field(
                "identifier",
                format!("model '{}' already exists for this provider", new.identifier),
            ));
        }
        if new.input_cost_per_token.is_sign_negative() || new.output_cost_per_token.is_sign_negative() {
            return Err(GatewayError::validation_field("cost_per_token", "must not be negative"));
        }

        let model = Model {
            id: self.next_model_id.max(1),
            provider_id: new.provider_id,
            identifier: new.identifier,
            modality: new.modality,
            max_tokens: new.max_tokens,
            supports_streaming: new.supports_streaming,
            input_cost_per_token: new.input_cost_per_token,
            output_cost_per_token: new.output_cost_per_token,
            active: new.active,
            configuration: new.configuration,
        };
        self.next_model_id = model.id + 1;
        self.models.push(model.clone());
        Ok(model)
    }

    pub fn update_model(&mut self, id: ModelId, update: ModelUpdate) -> GatewayResult<Model> {
        let model = self
            .models
            .iter_mut()
            .find(|m| m.id == id)
            .ok_or_else(|| GatewayError::not_found("model", id))?;
        update.apply(model);
        Ok(model.clone())
    }

    pub fn remove_model(&mut self, id: ModelId) -> GatewayResult<Model> {
        let index = self
            .models
            .iter()
            .position(|m| m.id == id)
            .ok_or_else(|| GatewayError::not_found("model", id))?;
        let model = self.models.remove(index);

        for module in &mut self.modules {
            if module.default_model_id == Some(id) {
                module.default_model_id = None;
            }
            module.allowed_model_ids.retain(|m| *m != id);
        }

        Ok(model)
    }

    /// Insert or replace a module configuration by name
    pub fn upsert_module(&mut self, module: ModuleConfiguration) -> ModuleConfiguration {
        match self.modules.iter_mut().find(|m| m.name == module.name) {
            Some(existing) => *existing = module.clone(),
            None => self.modules.push(module.clone()),
        }
        module
    }

    pub fn remove_module(&mut self, name: &str) -> GatewayResult<ModuleConfiguration> {
        let index = self
            .modules
            .iter()
            .position(|m| m.name == name)
            .ok_or_else(|| GatewayError::not_found("module", name))?;
        Ok(self.modules.remove(index))
    }
}
