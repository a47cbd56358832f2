//! Configuration management for the CLI

use anyhow::{Context, Result};
use bigml_lib::ApiConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CLI configuration, stored at `~/.config/bigml/config.json`
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    /// Account name
    pub username: Option<String>,
    /// API key
    pub api_key: Option<String>,
    /// Service domain
    pub domain: Option<String>,
    /// Use the development environment
    pub dev_mode: Option<bool>,
    /// Directory where fetched resources are kept
    pub storage: Option<String>,
    /// Default output format
    pub default_format: Option<String>,
}

/// Connection settings given on the command line
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub username: Option<String>,
    pub api_key: Option<String>,
    pub domain: Option<String>,
    pub storage: Option<String>,
    pub dev_mode: bool,
}

impl Config {
    /// Load configuration from the default file, if there is one
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load configuration from `path`; a missing file yields the defaults
    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;

        serde_json::from_str(&content).context("Failed to parse config file")
    }

    /// Client settings: command line values win over the file
    pub fn api_config(&self, overrides: Overrides) -> ApiConfig {
        let dev_mode = overrides.dev_mode || self.dev_mode.unwrap_or(false);
        let mut api = ApiConfig::default().with_dev_mode(dev_mode);
        if let Some(domain) = overrides.domain.or_else(|| self.domain.clone()) {
            api = api.with_domain(domain);
        }
        if let Some(storage) = overrides.storage.or_else(|| self.storage.clone()) {
            api = api.with_storage(storage);
        }
        api.username = overrides.username.or_else(|| self.username.clone());
        api.api_key = overrides.api_key.or_else(|| self.api_key.clone());
        api
    }

    /// Get the configuration file path
    fn config_path() -> Result<PathBuf> {
        let home = dirs_next::home_dir().context("Could not determine home directory")?;
        Ok(home.join(".config").join("bigml").join("config.json"))
    }
}
