//! Provider clients
//!
//! One adapter per provider family, behind the [`ProviderClient`] trait:
//! - `OpenAiCompatibleClient`: OpenAI, DeepSeek, OpenRouter
//! - `AnthropicClient`: Anthropic Messages API
//! - `BedrockClient`: AWS Bedrock with SigV4
//! - `OllamaClient`: local inference server
//! - `MockProviderClient`: scripted responses for tests

mod error;
mod traits;
mod http;
mod openai_compat;
mod anthropic;
mod bedrock;
mod ollama;
mod mock;
pub mod sigv4;

use std::sync::Arc;
use std::time::Duration;

pub use error::{ProviderError, ProviderResult};
pub use traits::{ClientFactory, ProviderClient};
pub use openai_compat::OpenAiCompatibleClient;
pub use anthropic::AnthropicClient;
pub use bedrock::{bedrock_model_id, BedrockClient};
pub use ollama::OllamaClient;
pub use mock::{MockCall, MockClientFactory, MockProviderClient, MockReply};

use crate::env::Environment;
use crate::logging::SharedLogger;
use crate::registry::{ProviderDescriptor, ProviderFamily};

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Production factory: real HTTP adapters sharing one connection pool
pub struct HttpClientFactory {
    http: reqwest::Client,
    env: Arc<dyn Environment>,
    logger: SharedLogger,
}

impl HttpClientFactory {
    pub fn new(env: Arc<dyn Environment>, logger: SharedLogger) -> ProviderResult<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("iacgenius/", env!("CARGO_PKG_VERSION")))
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ProviderError::transport("http", e.to_string()))?;
        Ok(Self::with_client(http, env, logger))
    }

    pub fn with_client(http: reqwest::Client, env: Arc<dyn Environment>, logger: SharedLogger) -> Self {
        Self { http, env, logger }
    }
}

impl ClientFactory for HttpClientFactory {
    fn create(&self, descriptor: &ProviderDescriptor) -> Arc<dyn ProviderClient> {
        let descriptor = descriptor.clone();
        let http = self.http.clone();
        let logger = self.logger.clone();
        match descriptor.family {
            ProviderFamily::ChatCompletions => Arc::new(OpenAiCompatibleClient::new(descriptor, http, logger)),
            ProviderFamily::Anthropic => Arc::new(AnthropicClient::new(descriptor, http, logger)),
            ProviderFamily::Bedrock => Arc::new(BedrockClient::new(descriptor, http, self.env.clone(), logger)),
            ProviderFamily::Ollama => Arc::new(OllamaClient::new(descriptor, http, logger)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;
    use crate::logging::NoOpLogger;
    use crate::registry::ProviderRegistry;

    #[test]
    fn test_factory_covers_every_builtin() {
        let factory = HttpClientFactory::new(Arc::new(MapEnvironment::new()), Arc::new(NoOpLogger)).unwrap();
        for descriptor in ProviderRegistry::builtin().list() {
            let client = factory.create(descriptor);
            assert_eq!(client.provider(), descriptor.name);
        }
    }
}
