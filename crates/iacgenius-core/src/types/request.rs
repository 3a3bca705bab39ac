//! Generation request types

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::infra::InfraType;

/// Cloud environment the generated configuration targets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudContext {
    /// Cloud provider name as shown to the model (e.g. "AWS", "Azure", "GCP")
    pub cloud: String,
    pub region: Option<String>,
    /// Resource tags, kept sorted so prompts are reproducible
    #[serde(default)]
    pub tags: BTreeMap<String, String>,
    /// Free-form tool/provider version constraints (e.g. "terraform >= 1.5")
    pub target_versions: Option<String>,
}

impl Default for CloudContext {
    fn default() -> Self {
        Self {
            cloud: "AWS".to_string(),
            region: None,
            tags: BTreeMap::new(),
            target_versions: None,
        }
    }
}

impl CloudContext {
    pub fn new(cloud: impl Into<String>) -> Self {
        Self {
            cloud: cloud.into(),
            ..Default::default()
        }
    }

    pub fn with_region(mut self, region: impl Into<String>) -> Self {
        self.region = Some(region.into());
        self
    }

    pub fn with_tag(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.tags.insert(key.into(), value.into());
        self
    }

    pub fn with_target_versions(mut self, versions: impl Into<String>) -> Self {
        self.target_versions = Some(versions.into());
        self
    }
}

/// Sampling options forwarded to the provider
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationOptions {
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
}

impl GenerationOptions {
    /// Defaults used when neither the request nor configuration sets a value
    pub const DEFAULT_TEMPERATURE: f32 = 0.2;
    pub const DEFAULT_MAX_TOKENS: u32 = 2048;

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    /// Fill unset fields from `other`
    pub fn or(self, other: GenerationOptions) -> Self {
        Self {
            temperature: self.temperature.or(other.temperature),
            max_tokens: self.max_tokens.or(other.max_tokens),
        }
    }

    pub fn temperature_or_default(&self) -> f32 {
        self.temperature.unwrap_or(Self::DEFAULT_TEMPERATURE)
    }

    pub fn max_tokens_or_default(&self) -> u32 {
        self.max_tokens.unwrap_or(Self::DEFAULT_MAX_TOKENS)
    }
}

/// Previous output plus the user's requested changes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Revision {
    pub previous_code: String,
    pub feedback: String,
}

impl Revision {
    pub fn new(previous_code: impl Into<String>, feedback: impl Into<String>) -> Self {
        Self {
            previous_code: previous_code.into(),
            feedback: feedback.into(),
        }
    }
}

/// A single request to generate (or revise) an artifact
///
/// Built once per invocation and not modified afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub infra_type: InfraType,
    pub description: String,
    /// Explicit provider; when absent the configured default is used
    pub provider: Option<String>,
    /// Explicit model for the explicit/default provider
    pub model: Option<String>,
    #[serde(default)]
    pub context: CloudContext,
    #[serde(default)]
    pub options: GenerationOptions,
    pub revision: Option<Revision>,
}

impl GenerationRequest {
    pub fn new(infra_type: InfraType, description: impl Into<String>) -> Self {
        Self {
            infra_type,
            description: description.into(),
            provider: None,
            model: None,
            context: CloudContext::default(),
            options: GenerationOptions::default(),
            revision: None,
        }
    }

    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider = Some(provider.into());
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_context(mut self, context: CloudContext) -> Self {
        self.context = context;
        self
    }

    pub fn with_options(mut self, options: GenerationOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_revision(mut self, revision: Revision) -> Self {
        self.revision = Some(revision);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_builder() {
        let req = GenerationRequest::new(InfraType::Terraform, "S3 bucket")
            .with_provider("openai")
            .with_model("gpt-4o")
            .with_context(CloudContext::new("AWS").with_region("eu-west-1").with_tag("team", "infra"));

        assert_eq!(req.provider.as_deref(), Some("openai"));
        assert_eq!(req.model.as_deref(), Some("gpt-4o"));
        assert_eq!(req.context.region.as_deref(), Some("eu-west-1"));
        assert_eq!(req.context.tags.get("team").map(String::as_str), Some("infra"));
        assert!(req.revision.is_none());
    }

    #[test]
    fn test_options_fallback() {
        let configured = GenerationOptions::default().with_temperature(0.5).with_max_tokens(1000);
        let merged = GenerationOptions::default().with_max_tokens(4000).or(configured);

        assert_eq!(merged.temperature, Some(0.5));
        assert_eq!(merged.max_tokens, Some(4000));
        assert_eq!(GenerationOptions::default().temperature_or_default(), 0.2);
        assert_eq!(GenerationOptions::default().max_tokens_or_default(), 2048);
    }
}
