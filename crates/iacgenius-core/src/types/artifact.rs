//! Provider responses and generated artifacts

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Raw outcome of one provider call that got an answer
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderResponse {
    pub raw_text: String,
    pub provider_name: String,
    pub model_name: String,
    pub latency: Duration,
    /// `false` when the provider answered but flagged the output itself
    /// (content filter, refusal). Such a response never becomes an artifact.
    pub success: bool,
}

impl ProviderResponse {
    pub fn new(
        raw_text: impl Into<String>,
        provider_name: impl Into<String>,
        model_name: impl Into<String>,
        latency: Duration,
    ) -> Self {
        Self {
            raw_text: raw_text.into(),
            provider_name: provider_name.into(),
            model_name: model_name.into(),
            latency,
            success: true,
        }
    }

    /// Mark the response as flagged by the provider
    pub fn flagged(mut self) -> Self {
        self.success = false;
        self
    }
}

/// The code extracted from a provider response
///
/// Traces back to exactly one successful [`ProviderResponse`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GeneratedArtifact {
    pub code_body: String,
    /// Language tag from the code fence. Advisory only.
    pub detected_format: Option<String>,
    pub source_provider: String,
    pub source_model: String,
}
