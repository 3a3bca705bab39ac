//! Provider descriptor types

use serde::{Deserialize, Serialize};

/// Wire protocol family; selects the client adapter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProviderFamily {
    /// OpenAI-style `/chat/completions` (OpenAI, DeepSeek, OpenRouter)
    ChatCompletions,
    /// Anthropic Messages API
    Anthropic,
    /// AWS Bedrock `InvokeModel`
    Bedrock,
    /// Local Ollama server
    Ollama,
}

/// How a provider authenticates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CredentialSource {
    /// An API key resolved by the credential resolver
    ApiKey,
    /// Ambient credentials picked up by the adapter (cloud SDK chain)
    Chain,
    /// No credential at all
    None,
}

/// Catalog entry for one provider
///
/// Immutable once the registry is built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderDescriptor {
    pub name: String,
    pub display_name: String,
    pub base_url: String,
    /// Known models, in catalog order
    pub supported_models: Vec<String>,
    pub default_model: String,
    pub family: ProviderFamily,
    pub credential_source: CredentialSource,
    /// Static headers sent with every request
    pub extra_headers: Vec<(String, String)>,
    /// Raw model ids with one of these prefixes are accepted as-is
    pub model_prefixes: Vec<String>,
    /// Accept any model name (local servers serve whatever is pulled)
    pub accepts_any_model: bool,
}

impl ProviderDescriptor {
    pub fn new(
        name: impl Into<String>,
        display_name: impl Into<String>,
        family: ProviderFamily,
        base_url: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            display_name: display_name.into(),
            base_url: base_url.into(),
            supported_models: Vec::new(),
            default_model: String::new(),
            family,
            credential_source: CredentialSource::ApiKey,
            extra_headers: Vec::new(),
            model_prefixes: Vec::new(),
            accepts_any_model: false,
        }
    }

    /// Set the known models; the first one becomes the default
    pub fn with_models(mut self, models: &[&str]) -> Self {
        self.supported_models = models.iter().map(|m| m.to_string()).collect();
        if let Some(first) = self.supported_models.first() {
            self.default_model = first.clone();
        }
        self
    }

    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = model.into();
        self
    }

    pub fn with_credential_source(mut self, source: CredentialSource) -> Self {
        self.credential_source = source;
        self
    }

    pub fn with_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra_headers.push((name.into(), value.into()));
        self
    }

    pub fn with_model_prefixes(mut self, prefixes: &[&str]) -> Self {
        self.model_prefixes = prefixes.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn accepting_any_model(mut self) -> Self {
        self.accepts_any_model = true;
        self
    }

    pub fn requires_credential(&self) -> bool {
        self.credential_source == CredentialSource::ApiKey
    }

    pub fn supports_model(&self, model: &str) -> bool {
        self.accepts_any_model
            || self.supported_models.iter().any(|m| m == model)
            || self.model_prefixes.iter().any(|p| model.starts_with(p.as_str()))
    }
}
