//! Configuration loading

use super::GatewayConfig;
use crate::error::{GatewayError, GatewayResult};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Prefix for environment overrides
pub const ENV_PREFIX: &str = "AIGW_";

/// Loads a `GatewayConfig` from a file plus environment overrides
#[derive(Debug, Default)]
pub struct ConfigLoader {
    path: Option<PathBuf>,
    env: Option<HashMap<String, String>>,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new() -> Self {
        Self::default()
    }

    /// Read configuration from this TOML file; a missing file yields defaults
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.path = Some(path.as_ref().to_path_buf());
        self
    }

    /// Apply overrides from the process environment
    pub fn with_env(self) -> Self {
        self.with_env_vars(std::env::vars().collect())
    }

    /// Apply overrides from an explicit variable map
    pub fn with_env_vars(mut self, vars: HashMap<String, String>) -> Self {
        self.env = Some(vars);
        self
    }

    /// Load, override and validate
    pub fn load(self) -> GatewayResult<GatewayConfig> {
        let mut config = match &self.path {
            Some(path) => Self::load_from_file(path)?,
            None => GatewayConfig::default(),
        };

        if let Some(vars) = &self.env {
            Self::apply_env(&mut config, vars)?;
        }

        config.validate()?;
        Ok(config)
    }

    fn load_from_file(path: &Path) -> GatewayResult<GatewayConfig> {
        if !path.exists() {
            tracing::debug!("Config file {} not found, using defaults", path.display());
            return Ok(GatewayConfig::default());
        }

        tracing::debug!("Loading config from file: {}", path.display());
        let content = std::fs::read_to_string(path).map_err(|e| {
            GatewayError::io_with_path(
                format!("Failed to read config file: {}", e),
                path.display().to_string(),
            )
        })?;

        GatewayConfig::from_toml_str(&content).map_err(|e| match e {
            GatewayError::Config { message, .. } => GatewayError::config_with_context(
                message,
                format!("Parsing configuration from '{}'", path.display()),
            ),
            other => other,
        })
    }

    fn apply_env(config: &mut GatewayConfig, vars: &HashMap<String, String>) -> GatewayResult<()> {
        let get = |name: &str| vars.get(&format!("{}{}", ENV_PREFIX, name));

        if let Some(value) = get("GLOBAL_RPM") {
            config.rate_limit.global_rpm = parse_env("GLOBAL_RPM", value)?;
        }
        if let Some(value) = get("PER_ACTOR_RPM") {
            config.rate_limit.per_actor_rpm = parse_env("PER_ACTOR_RPM", value)?;
        }
        if let Some(value) = get("CACHE_ENABLED") {
            config.cache.enabled = parse_env("CACHE_ENABLED", value)?;
        }
        if let Some(value) = get("LEDGER_PATH") {
            config.ledger.path = Some(PathBuf::from(value));
        }
        if let Some(value) = get("LOG_LEVEL") {
            config.logging.level = value.clone();
        }
        Ok(())
    }
}

fn parse_env<T: std::str::FromStr>(name: &str, value: &str) -> GatewayResult<T>
where
    T::Err: std::fmt::Display,
{
    value.trim().parse::<T>().map_err(|e| {
        GatewayError::config_with_context(
            format!("invalid value '{}': {}", value, e),
            format!("Reading environment variable {}{}", ENV_PREFIX, name),
        )
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_missing_file_yields_defaults() {
        let config = ConfigLoader::new()
            .with_file("/definitely/not/here/aigw.toml")
            .load()
            .unwrap();
        assert_eq!(config.failover.max_providers, 3);
    }

    #[test]
    fn test_file_then_env_override() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit]\nglobal_rpm = 60\nper_actor_rpm = 10").unwrap();

        let mut vars = HashMap::new();
        vars.insert("AIGW_GLOBAL_RPM".to_string(), "120".to_string());
        vars.insert("AIGW_CACHE_ENABLED".to_string(), "false".to_string());

        let config = ConfigLoader::new()
            .with_file(file.path())
            .with_env_vars(vars)
            .load()
            .unwrap();

        assert_eq!(config.rate_limit.global_rpm, 120);
        assert_eq!(config.rate_limit.per_actor_rpm, 10);
        assert!(!config.cache.enabled);
    }

    #[test]
    fn test_invalid_env_value() {
        let mut vars = HashMap::new();
        vars.insert("AIGW_GLOBAL_RPM".to_string(), "lots".to_string());
        let result = ConfigLoader::new().with_env_vars(vars).load();
        assert!(matches!(result, Err(GatewayError::Config { .. })));
    }

    #[test]
    fn test_malformed_file_reports_path() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[rate_limit\nbroken").unwrap();
        match ConfigLoader::new().with_file(file.path()).load() {
            Err(GatewayError::Config { context, .. }) => {
                assert!(context.unwrap().contains("Parsing configuration"));
            }
            other => panic!("expected config error, got {:?}", other),
        }
    }
}
