//! Configuration
//!
//! [`ConfigService`] is a key/value store seeded from the process
//! environment. [`CompilerConfig`] reads the compiler switches from it, or
//! from JSON.

use dashmap::DashMap;
use serde::Deserialize;
use std::env;
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;

pub const STRICT_INJECT: &str = "MESHESTRA_STRICT_INJECT";
pub const REINSTANTIATE_IMPORTS: &str = "MESHESTRA_REINSTANTIATE_IMPORTS";
pub const HOOK_TIMEOUT_MS: &str = "MESHESTRA_HOOK_TIMEOUT_MS";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: String, value: String },

    #[error("Invalid compiler configuration: {0}")]
    Json(#[from] serde_json::Error),
}

/// Configuration service
#[derive(Clone, Default)]
pub struct ConfigService {
    config: Arc<DashMap<String, String>>,
}

impl ConfigService {
    /// A service holding every environment variable of the process.
    pub fn new() -> Self {
        let service = Self::default();
        for (key, value) in env::vars() {
            service.set(&key, &value);
        }
        service
    }

    pub fn get(&self, key: &str) -> Option<String> {
        self.config.get(key).map(|v| v.clone())
    }

    pub fn set(&self, key: &str, value: &str) {
        self.config.insert(key.to_string(), value.to_string());
    }

    /// Parse the value stored under `key`, if any.
    pub fn parse<T: FromStr>(&self, key: &str) -> Result<Option<T>, ConfigError> {
        match self.get(key) {
            Some(value) => value
                .trim()
                .parse()
                .map(Some)
                .map_err(|_| ConfigError::Invalid {
                    key: key.to_string(),
                    value,
                }),
            None => Ok(None),
        }
    }
}

/// Switches for one compile pass.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct CompilerConfig {
    /// Fail with `MissingInjectToken` when a factory parameter is not an
    /// injectable export of the module's imports. When off, the parameter is
    /// left unsupplied.
    pub strict_inject: bool,
    /// Instantiate every non-global import a second time after resolving it,
    /// replacing the registered object and extracting its hooks again.
    pub reinstantiate_imports: bool,
    /// Upper bound for running each hook phase.
    pub hook_timeout_ms: Option<u64>,
}

impl Default for CompilerConfig {
    fn default() -> Self {
        Self {
            strict_inject: true,
            reinstantiate_imports: false,
            hook_timeout_ms: None,
        }
    }
}

impl CompilerConfig {
    /// Read the `MESHESTRA_*` keys; absent keys keep their defaults.
    pub fn from_service(service: &ConfigService) -> Result<Self, ConfigError> {
        let defaults = Self::default();
        Ok(Self {
            strict_inject: service
                .parse(STRICT_INJECT)?
                .unwrap_or(defaults.strict_inject),
            reinstantiate_imports: service
                .parse(REINSTANTIATE_IMPORTS)?
                .unwrap_or(defaults.reinstantiate_imports),
            hook_timeout_ms: service.parse(HOOK_TIMEOUT_MS)?.or(defaults.hook_timeout_ms),
        })
    }

    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_service(&ConfigService::new())
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn hook_timeout(&self) -> Option<Duration> {
        self.hook_timeout_ms.map(Duration::from_millis)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = CompilerConfig::from_service(&ConfigService::default()).unwrap();
        assert_eq!(config, CompilerConfig::default());
        assert!(config.strict_inject);
        assert!(!config.reinstantiate_imports);
        assert_eq!(config.hook_timeout(), None);
    }

    #[test]
    fn test_reads_service_keys() {
        let service = ConfigService::default();
        service.set(STRICT_INJECT, "false");
        service.set(REINSTANTIATE_IMPORTS, " true ");
        service.set(HOOK_TIMEOUT_MS, "250");

        let config = CompilerConfig::from_service(&service).unwrap();

        assert!(!config.strict_inject);
        assert!(config.reinstantiate_imports);
        assert_eq!(config.hook_timeout(), Some(Duration::from_millis(250)));
    }

    #[test]
    fn test_rejects_malformed_values() {
        let service = ConfigService::default();
        service.set(HOOK_TIMEOUT_MS, "soon");

        let err = CompilerConfig::from_service(&service).unwrap_err();
        assert!(matches!(err, ConfigError::Invalid { ref key, .. } if key == HOOK_TIMEOUT_MS));
    }

    #[test]
    fn test_from_json_fills_missing_fields() {
        let config = CompilerConfig::from_json(r#"{ "reinstantiate_imports": true }"#).unwrap();
        assert!(config.strict_inject);
        assert!(config.reinstantiate_imports);

        assert!(matches!(
            CompilerConfig::from_json("{ nope"),
            Err(ConfigError::Json(_))
        ));
    }
}
