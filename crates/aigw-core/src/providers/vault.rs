//! Credential resolution

use crate::error::{GatewayError, GatewayResult};
use crate::registry::Credential;
use std::collections::HashMap;

const ENV_SCHEME: &str = "env:";

/// Turns a stored provider credential into a usable secret right before dispatch
pub trait CredentialVault: Send + Sync {
    fn resolve(&self, credential: &Credential) -> GatewayResult<String>;
}

/// Returns the stored value unchanged
#[derive(Debug, Default, Clone, Copy)]
pub struct PlainVault;

impl CredentialVault for PlainVault {
    fn resolve(&self, credential: &Credential) -> GatewayResult<String> {
        Ok(credential.stored().to_string())
    }
}

/// Resolves `env:NAME` references from the environment; other values pass through
#[derive(Debug, Default, Clone)]
pub struct EnvVault {
    vars: Option<HashMap<String, String>>,
}

impl EnvVault {
    /// Read from the process environment
    pub fn new() -> Self {
        Self::default()
    }

    /// Read from an explicit variable map
    pub fn from_vars(vars: HashMap<String, String>) -> Self {
        Self { vars: Some(vars) }
    }

    fn lookup(&self, name: &str) -> Option<String> {
        match &self.vars {
            Some(vars) => vars.get(name).cloned(),
            None => std::env::var(name).ok(),
        }
    }
}

impl CredentialVault for EnvVault {
    fn resolve(&self, credential: &Credential) -> GatewayResult<String> {
        let stored = credential.stored();
        let Some(name) = stored.strip_prefix(ENV_SCHEME) else {
            return Ok(stored.to_string());
        };

        self.lookup(name.trim())
            .filter(|value| !value.is_empty())
            .ok_or_else(|| {
                GatewayError::config_with_context(
                    format!("environment variable {} is not set", name.trim()),
                    "Resolving provider credential",
                )
            })
    }
}
