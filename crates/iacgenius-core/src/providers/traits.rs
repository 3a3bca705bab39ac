//! Provider client traits

use std::sync::Arc;

use async_trait::async_trait;

use super::error::ProviderResult;
use crate::credentials::Credential;
use crate::prompt::PromptSpec;
use crate::registry::ProviderDescriptor;
use crate::types::{GenerationOptions, ProviderResponse};

/// Transport to one provider family
///
/// Each call to [`send`](ProviderClient::send) makes exactly one network
/// request. Adapters never retry; retry and fallback belong to the
/// orchestrator.
#[async_trait]
pub trait ProviderClient: Send + Sync {
    /// Name of the provider this client talks to
    fn provider(&self) -> &str;

    /// Send a prompt and return the normalized response text
    ///
    /// `credential` is `None` for providers that authenticate through an
    /// ambient chain or need nothing.
    async fn send(
        &self,
        prompt: &PromptSpec,
        credential: Option<&Credential>,
        model: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<ProviderResponse>;

    /// Models the provider offers right now, as reported by its API
    async fn list_models(&self, credential: Option<&Credential>) -> ProviderResult<Vec<String>>;

    /// Check that the provider is reachable and accepts `credential`
    ///
    /// Costs one cheap read-only request; nothing is generated.
    async fn validate(&self, credential: Option<&Credential>) -> ProviderResult<()> {
        self.list_models(credential).await.map(|_| ())
    }
}

/// Produces the client for a descriptor
///
/// Selection happens on [`ProviderFamily`](crate::registry::ProviderFamily),
/// never on provider names.
pub trait ClientFactory: Send + Sync {
    fn create(&self, descriptor: &ProviderDescriptor) -> Arc<dyn ProviderClient>;
}
