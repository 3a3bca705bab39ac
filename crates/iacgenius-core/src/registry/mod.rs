//! Provider registry
//!
//! The registry is built once at start-up from the built-in catalog plus
//! configuration overrides, then passed explicitly to whatever needs it.
//! It is never mutated afterwards, so sharing it across requests is safe.

mod catalog;
mod descriptor;

use std::collections::HashMap;

use thiserror::Error;
use tracing::{debug, warn};

use crate::config::GeneratorConfig;

pub use catalog::{builtin_providers, DEFAULT_PROVIDER};
pub use descriptor::{CredentialSource, ProviderDescriptor, ProviderFamily};

/// Lookup failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error("model '{model}' is not supported by {provider}")]
    UnsupportedModel { provider: String, model: String },
}

impl RegistryError {
    pub fn unknown_provider(name: impl Into<String>) -> Self {
        Self::UnknownProvider { name: name.into() }
    }

    pub fn unsupported_model(provider: impl Into<String>, model: impl Into<String>) -> Self {
        Self::UnsupportedModel {
            provider: provider.into(),
            model: model.into(),
        }
    }
}

pub type RegistryResult<T> = Result<T, RegistryError>;

/// Immutable catalog of providers keyed by name
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    descriptors: Vec<ProviderDescriptor>,
    index: HashMap<String, usize>,
    default_provider: String,
}

impl ProviderRegistry {
    /// Build from explicit descriptors
    ///
    /// Fails with `UnknownProvider` when `default_provider` is not among them.
    pub fn new(
        descriptors: Vec<ProviderDescriptor>,
        default_provider: impl Into<String>,
    ) -> RegistryResult<Self> {
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.to_lowercase(), i))
            .collect::<HashMap<_, _>>();
        let default_provider = default_provider.into().to_lowercase();
        if !index.contains_key(&default_provider) {
            return Err(RegistryError::unknown_provider(default_provider));
        }
        Ok(Self {
            descriptors,
            index,
            default_provider,
        })
    }

    /// The built-in catalog with `deepseek` as the default
    pub fn builtin() -> Self {
        let descriptors = builtin_providers();
        let index = descriptors
            .iter()
            .enumerate()
            .map(|(i, d)| (d.name.clone(), i))
            .collect();
        Self {
            descriptors,
            index,
            default_provider: DEFAULT_PROVIDER.to_string(),
        }
    }

    /// The built-in catalog with configuration overrides applied
    ///
    /// Overrides may replace a base URL, add models and change the default
    /// model. The default provider and override names must be known; an
    /// unknown fallback entry is only warned about, and generation skips it
    /// when its turn comes.
    pub fn from_config(config: &GeneratorConfig) -> RegistryResult<Self> {
        let mut descriptors = builtin_providers();

        for ov in &config.providers {
            let name = ov.name.to_lowercase();
            let descriptor = descriptors
                .iter_mut()
                .find(|d| d.name == name)
                .ok_or_else(|| RegistryError::unknown_provider(&ov.name))?;

            if let Some(base) = &ov.api_base {
                descriptor.base_url = base.trim_end_matches('/').to_string();
            }
            for model in &ov.models {
                if !descriptor.supported_models.contains(model) {
                    descriptor.supported_models.push(model.clone());
                }
            }
            if let Some(model) = &ov.default_model {
                if !descriptor.supports_model(model) {
                    return Err(RegistryError::unsupported_model(&descriptor.name, model));
                }
                descriptor.default_model = model.clone();
            }
            debug!(provider = %descriptor.name, base_url = %descriptor.base_url, "applied provider override");
        }

        let default_provider = config
            .defaults
            .provider
            .clone()
            .unwrap_or_else(|| DEFAULT_PROVIDER.to_string());
        let registry = Self::new(descriptors, default_provider)?;

        for name in &config.defaults.fallback_chain {
            if let Err(err) = registry.describe(name) {
                warn!(fallback = %name, "{}; it will be skipped", err);
            }
        }
        Ok(registry)
    }

    /// Look up a provider by name (case-insensitive)
    pub fn describe(&self, name: &str) -> RegistryResult<&ProviderDescriptor> {
        self.index
            .get(&name.trim().to_lowercase())
            .map(|&i| &self.descriptors[i])
            .ok_or_else(|| RegistryError::unknown_provider(name))
    }

    pub fn default_provider(&self) -> &str {
        &self.default_provider
    }

    /// `false` for unknown providers as well as unknown models
    pub fn is_model_supported(&self, provider: &str, model: &str) -> bool {
        self.describe(provider)
            .map(|d| d.supports_model(model))
            .unwrap_or(false)
    }

    /// The model to use for `provider`
    ///
    /// An explicit model must be supported; it is never swapped for the
    /// default.
    pub fn resolve_model(&self, provider: &str, requested: Option<&str>) -> RegistryResult<String> {
        let descriptor = self.describe(provider)?;
        match requested {
            Some(model) if descriptor.supports_model(model) => Ok(model.to_string()),
            Some(model) => Err(RegistryError::unsupported_model(&descriptor.name, model)),
            None => Ok(descriptor.default_model.clone()),
        }
    }

    /// Descriptors in catalog order
    pub fn list(&self) -> impl Iterator<Item = &ProviderDescriptor> {
        self.descriptors.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.descriptors.iter().map(|d| d.name.as_str()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProviderOverride;

    #[test]
    fn test_describe_unknown_provider() {
        let registry = ProviderRegistry::builtin();
        for name in ["", "gemini", "deep-seek", "azure"] {
            assert_eq!(
                registry.describe(name).unwrap_err(),
                RegistryError::unknown_provider(name)
            );
        }
    }

    #[test]
    fn test_describe_is_idempotent() {
        let registry = ProviderRegistry::builtin();
        for name in registry.names() {
            let first = registry.describe(name).unwrap().clone();
            let second = registry.describe(name).unwrap().clone();
            assert_eq!(first, second);
            assert_eq!(
                serde_json::to_string(&first).unwrap(),
                serde_json::to_string(&second).unwrap()
            );
        }
    }

    #[test]
    fn test_describe_is_case_insensitive() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.describe("DeepSeek").unwrap().name, "deepseek");
    }

    #[test]
    fn test_builtin_defaults() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.default_provider(), "deepseek");
        assert_eq!(registry.describe("deepseek").unwrap().default_model, "deepseek-chat");
        assert_eq!(registry.describe("openai").unwrap().default_model, "gpt-3.5-turbo");
        assert_eq!(registry.describe("ollama").unwrap().default_model, "llama3");
        assert_eq!(
            registry.names(),
            vec!["deepseek", "openai", "anthropic", "openrouter", "bedrock", "ollama"]
        );
    }

    #[test]
    fn test_every_default_model_is_supported() {
        let registry = ProviderRegistry::builtin();
        for d in registry.list() {
            assert!(d.supports_model(&d.default_model), "{} default", d.name);
        }
    }

    #[test]
    fn test_model_support() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.is_model_supported("openai", "gpt-4o"));
        assert!(!registry.is_model_supported("openai", "deepseek-chat"));
        assert!(!registry.is_model_supported("nope", "gpt-4o"));
        // Bedrock accepts raw model ids by prefix
        assert!(registry.is_model_supported("bedrock", "anthropic.claude-v2"));
        assert!(!registry.is_model_supported("bedrock", "gpt-4o"));
        // Ollama serves whatever is pulled locally
        assert!(registry.is_model_supported("ollama", "qwen2.5-coder"));
    }

    #[test]
    fn test_resolve_model_never_substitutes() {
        let registry = ProviderRegistry::builtin();
        assert_eq!(registry.resolve_model("openai", None).unwrap(), "gpt-3.5-turbo");
        assert_eq!(registry.resolve_model("openai", Some("gpt-4o")).unwrap(), "gpt-4o");
        assert_eq!(
            registry.resolve_model("openai", Some("gpt-9")).unwrap_err(),
            RegistryError::unsupported_model("openai", "gpt-9")
        );
    }

    #[test]
    fn test_credential_sources() {
        let registry = ProviderRegistry::builtin();
        assert!(registry.describe("deepseek").unwrap().requires_credential());
        assert_eq!(registry.describe("bedrock").unwrap().credential_source, CredentialSource::Chain);
        assert_eq!(registry.describe("ollama").unwrap().credential_source, CredentialSource::None);
    }

    #[test]
    fn test_from_config_overrides() {
        let mut config = GeneratorConfig::default();
        config.defaults.provider = Some("ollama".to_string());
        config.defaults.fallback_chain = vec!["openai".to_string()];
        config.providers.push(
            ProviderOverride::new("ollama")
                .with_api_base("http://gpu-box:11434/")
                .with_default_model("qwen2.5-coder"),
        );
        config.providers.push(
            ProviderOverride::new("openai")
                .with_models(vec!["gpt-4.1".to_string()])
                .with_default_model("gpt-4.1"),
        );

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert_eq!(registry.default_provider(), "ollama");

        let ollama = registry.describe("ollama").unwrap();
        assert_eq!(ollama.base_url, "http://gpu-box:11434");
        assert_eq!(ollama.default_model, "qwen2.5-coder");

        let openai = registry.describe("openai").unwrap();
        assert!(openai.supports_model("gpt-4.1"));
        assert_eq!(openai.default_model, "gpt-4.1");
    }

    #[test]
    fn test_from_config_tolerates_unknown_fallback() {
        let mut config = GeneratorConfig::default();
        config.defaults.fallback_chain = vec!["openai".to_string(), "cohere".to_string()];

        let registry = ProviderRegistry::from_config(&config).unwrap();
        assert!(registry.describe("openai").is_ok());
        assert_eq!(
            registry.describe("cohere").unwrap_err(),
            RegistryError::unknown_provider("cohere")
        );
    }

    #[test]
    fn test_from_config_rejects_unknown_names() {
        let mut config = GeneratorConfig::default();
        config.defaults.provider = Some("gemini".to_string());
        assert!(matches!(
            ProviderRegistry::from_config(&config),
            Err(RegistryError::UnknownProvider { .. })
        ));

        let mut config = GeneratorConfig::default();
        config.providers.push(ProviderOverride::new("openai").with_default_model("gpt-9"));
        assert_eq!(
            ProviderRegistry::from_config(&config).unwrap_err(),
            RegistryError::unsupported_model("openai", "gpt-9")
        );
    }
}
