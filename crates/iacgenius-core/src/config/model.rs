//! Configuration data model

use std::time::Duration;

use serde::{Deserialize, Serialize};

use super::traits::{ConfigError, ConfigResult};
use crate::env::Environment;
use crate::types::GenerationOptions;

/// Overrides the default provider
pub const ENV_PROVIDER: &str = "IACGENIUS_PROVIDER";
/// Overrides the default model
pub const ENV_MODEL: &str = "IACGENIUS_MODEL";
/// Comma-separated fallback chain
pub const ENV_FALLBACK: &str = "IACGENIUS_FALLBACK";
/// Per-attempt timeout in seconds
pub const ENV_TIMEOUT_SECS: &str = "IACGENIUS_TIMEOUT_SECS";

/// Top-level configuration file structure
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GeneratorConfig {
    #[serde(default)]
    pub defaults: DefaultSettings,

    #[serde(default)]
    pub retry: RetrySettings,

    /// Per-provider overrides of the built-in catalog
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub providers: Vec<ProviderOverride>,
}

/// Default provider, model and fallback chain
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DefaultSettings {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider: Option<String>,

    /// Default model for the default provider
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Ordered alternates tried after the primary candidate fails
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fallback_chain: Vec<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

impl DefaultSettings {
    pub fn generation_options(&self) -> GenerationOptions {
        GenerationOptions {
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        }
    }
}

/// Retry and timeout policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetrySettings {
    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    #[serde(default = "default_base_delay_ms")]
    pub base_delay_ms: u64,

    #[serde(default = "default_max_delay_ms")]
    pub max_delay_ms: u64,

    #[serde(default = "default_attempt_timeout_secs")]
    pub attempt_timeout_secs: u64,
}

fn default_max_attempts() -> u32 {
    3
}

fn default_base_delay_ms() -> u64 {
    1000
}

fn default_max_delay_ms() -> u64 {
    8000
}

fn default_attempt_timeout_secs() -> u64 {
    60
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_attempts: default_max_attempts(),
            base_delay_ms: default_base_delay_ms(),
            max_delay_ms: default_max_delay_ms(),
            attempt_timeout_secs: default_attempt_timeout_secs(),
        }
    }
}

impl RetrySettings {
    pub fn base_delay(&self) -> Duration {
        Duration::from_millis(self.base_delay_ms)
    }

    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }
}

/// Override of one provider's catalog entry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderOverride {
    pub name: String,

    /// Replacement base URL (e.g. a remote Ollama host)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_base: Option<String>,

    /// Extra models accepted for this provider
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub models: Vec<String>,

    /// Model used when this provider is a fallback candidate
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_model: Option<String>,
}

impl ProviderOverride {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            api_base: None,
            models: Vec::new(),
            default_model: None,
        }
    }

    pub fn with_api_base(mut self, api_base: impl Into<String>) -> Self {
        self.api_base = Some(api_base.into());
        self
    }

    pub fn with_models(mut self, models: Vec<String>) -> Self {
        self.models = models;
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }
}

impl GeneratorConfig {
    /// Parse configuration from YAML text
    pub fn from_yaml(content: &str) -> ConfigResult<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    pub fn to_yaml(&self) -> ConfigResult<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Apply `IACGENIUS_*` environment overrides on top of the loaded values
    pub fn apply_env(&mut self, env: &dyn Environment) -> ConfigResult<()> {
        if let Some(provider) = env.var(ENV_PROVIDER) {
            let provider = provider.trim().to_lowercase();
            let changed = self
                .defaults
                .provider
                .as_deref()
                .map_or(true, |current| !current.eq_ignore_ascii_case(&provider));
            // A stored model belongs to the stored provider
            if changed {
                self.defaults.model = None;
            }
            self.defaults.provider = Some(provider);
        }
        if let Some(model) = env.var(ENV_MODEL) {
            self.defaults.model = Some(model.trim().to_string());
        }
        if let Some(chain) = env.var(ENV_FALLBACK) {
            self.defaults.fallback_chain = parse_provider_list(&chain);
        }
        if let Some(timeout) = env.var(ENV_TIMEOUT_SECS) {
            self.retry.attempt_timeout_secs = timeout
                .trim()
                .parse()
                .map_err(|_| ConfigError::invalid_value(ENV_TIMEOUT_SECS, format!("not a number: {}", timeout)))?;
        }
        Ok(())
    }

    /// Check values that serde cannot
    pub fn validate(&self) -> ConfigResult<()> {
        if self.retry.max_attempts == 0 {
            return Err(ConfigError::invalid_value("retry.max_attempts", "must be at least 1"));
        }
        if self.retry.attempt_timeout_secs == 0 {
            return Err(ConfigError::invalid_value("retry.attempt_timeout_secs", "must be at least 1"));
        }
        if let Some(t) = self.defaults.temperature {
            if !(0.0..=2.0).contains(&t) {
                return Err(ConfigError::invalid_value("defaults.temperature", "must be between 0.0 and 2.0"));
            }
        }
        Ok(())
    }

    /// Find the override for `provider`, if any
    pub fn provider_override(&self, provider: &str) -> Option<&ProviderOverride> {
        self.providers
            .iter()
            .find(|p| p.name.eq_ignore_ascii_case(provider))
    }
}

/// Split a comma-separated provider list, dropping blanks
pub fn parse_provider_list(value: &str) -> Vec<String> {
    value
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}
