//! Core configuration traits for the Provisio configuration system

use crate::errors::{ProvisionError, Result};
use std::collections::{BTreeMap, HashMap};
use std::path::Path;

/// String-keyed configuration lookup supplied by the host.
///
/// Absent keys fall back to the hard defaults of the consuming config type.
pub trait ConfigSource {
    /// Raw value stored under `key`, if any
    fn get_value(&self, key: &str) -> Option<String>;
}

impl ConfigSource for HashMap<String, String> {
    fn get_value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl ConfigSource for BTreeMap<String, String> {
    fn get_value(&self, key: &str) -> Option<String> {
        self.get(key).cloned()
    }
}

impl<T: ConfigSource + ?Sized> ConfigSource for &T {
    fn get_value(&self, key: &str) -> Option<String> {
        (**self).get_value(key)
    }
}

/// Configuration source reading `PREFIX_KEY` environment variables.
#[derive(Debug, Clone)]
pub struct EnvSource {
    prefix: String,
}

impl EnvSource {
    /// Source for variables named `<prefix>_<KEY>`
    pub fn new(prefix: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
        }
    }
}

impl Default for EnvSource {
    fn default() -> Self {
        Self::new("PROVISIO")
    }
}

impl ConfigSource for EnvSource {
    fn get_value(&self, key: &str) -> Option<String> {
        std::env::var(format!("{}_{}", self.prefix, key.to_ascii_uppercase())).ok()
    }
}

/// Core trait for Provisio configuration types
pub trait ProvisioConfig: Clone + Default + Send + Sync + 'static {
    /// Keys understood by `set_from_string`
    const KEYS: &'static [&'static str];

    /// Get default configuration values
    fn defaults() -> Self {
        Self::default()
    }

    /// Load configuration from a TOML or JSON file
    fn load_from_file(path: &Path) -> Result<Self>;

    /// Validate the configuration
    fn validate(&self) -> Result<()>;

    /// Set a configuration value from a string
    fn set_from_string(&mut self, key: &str, value: &str) -> Result<()>;

    /// Overlay every known key present in `source`.
    fn merge_with_source(&mut self, source: &dyn ConfigSource) -> Result<()> {
        for key in Self::KEYS {
            if let Some(value) = source.get_value(key) {
                self.set_from_string(key, &value)?;
            }
        }
        Ok(())
    }

    /// Merge with `PROVISIO_*` environment variables
    fn merge_with_env(&mut self) -> Result<()> {
        self.merge_with_source(&EnvSource::default())
    }

    /// Build from defaults plus a string-keyed source, then validate.
    fn from_source(source: &dyn ConfigSource) -> Result<Self> {
        let mut config = Self::defaults();
        config.merge_with_source(source)?;
        config.validate()?;
        Ok(config)
    }
}

/// Read a config file and decode it by extension.
pub fn read_config_file<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| ProvisionError::config(format!("Failed to read config file: {e}")))?;
    tracing::debug!(path = %path.display(), "loading configuration file");

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("toml") => Ok(toml::from_str(&content)?),
        Some("json") => Ok(serde_json::from_str(&content)?),
        _ => Err(ProvisionError::config(format!(
            "Unsupported config file format: {}",
            path.display()
        ))),
    }
}
