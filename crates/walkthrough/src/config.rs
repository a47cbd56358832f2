//! Walkthrough configuration

use anyhow::{Context, Result};
use bigml_lib::api::DEFAULT_DOMAIN;
use bigml_lib::ApiConfig;
use serde::Deserialize;
use std::time::Duration;

/// Walkthrough configuration, read from `BIGML_*` environment variables
#[derive(Debug, Clone, Deserialize)]
pub struct WalkthroughConfig {
    /// Account name (BIGML_USERNAME)
    #[serde(default)]
    pub username: Option<String>,

    /// API key (BIGML_API_KEY)
    #[serde(default)]
    pub api_key: Option<String>,

    /// Service domain (BIGML_DOMAIN)
    #[serde(default = "default_domain")]
    pub domain: String,

    /// Directory where fetched resources are kept (BIGML_STORAGE)
    #[serde(default)]
    pub storage: Option<String>,

    /// Request timeout in seconds (BIGML_TIMEOUT_SECS)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u64,

    /// Run against the development environment (BIGML_DEV_MODE)
    #[serde(default = "default_dev_mode")]
    pub dev_mode: bool,
}

fn default_domain() -> String {
    DEFAULT_DOMAIN.to_string()
}

fn default_timeout() -> u64 {
    30
}

fn default_dev_mode() -> bool {
    true
}

impl Default for WalkthroughConfig {
    fn default() -> Self {
        Self {
            username: None,
            api_key: None,
            domain: default_domain(),
            storage: None,
            timeout_secs: default_timeout(),
            dev_mode: default_dev_mode(),
        }
    }
}

impl WalkthroughConfig {
    /// Load configuration from the environment
    pub fn load() -> Result<Self> {
        let config = config::Config::builder()
            .add_source(config::Environment::with_prefix("BIGML").try_parsing(true))
            .build()?;

        config
            .try_deserialize()
            .context("Invalid BIGML_* configuration")
    }

    /// Client settings for the prediction service
    pub fn api_config(&self) -> ApiConfig {
        let mut api = ApiConfig::default()
            .with_dev_mode(self.dev_mode)
            .with_domain(self.domain.clone());
        api.username = self.username.clone();
        api.api_key = self.api_key.clone();
        api.storage = self.storage.as_ref().map(Into::into);
        api.timeout = Duration::from_secs(self.timeout_secs);
        api
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_use_dev_mode() {
        let config = WalkthroughConfig::default();
        let api = config.api_config();
        assert!(api.dev_mode);
        assert_eq!(api.domain, "https://bigml.io");
        assert_eq!(api.timeout, Duration::from_secs(30));
        assert!(api.username.is_none());
    }

    #[test]
    fn test_api_config_carries_settings() {
        let config = WalkthroughConfig {
            username: Some("alice".to_string()),
            api_key: Some("secret".to_string()),
            storage: Some("./storage".to_string()),
            timeout_secs: 5,
            ..WalkthroughConfig::default()
        };
        let api = config.api_config();
        assert_eq!(api.username.as_deref(), Some("alice"));
        assert_eq!(api.api_key.as_deref(), Some("secret"));
        assert_eq!(api.storage, Some("./storage".into()));
        assert_eq!(
            api.base_url().unwrap().as_str(),
            "https://bigml.io/dev/andromeda/"
        );
    }
}
