//! Local Ollama server adapter

use std::time::Instant;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::error::{ProviderError, ProviderResult};
use super::http::{join_url, send_json};
use super::traits::ProviderClient;
use crate::credentials::Credential;
use crate::logging::SharedLogger;
use crate::prompt::PromptSpec;
use crate::registry::ProviderDescriptor;
use crate::types::{GenerationOptions, ProviderResponse};

#[derive(Debug, Serialize)]
struct OllamaChatRequest<'a> {
    model: &'a str,
    messages: [OllamaMessage<'a>; 2],
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    temperature: f32,
    num_predict: u32,
}

#[derive(Debug, Deserialize)]
struct OllamaChatResponse {
    message: Option<OllamaResponseMessage>,
}

#[derive(Debug, Deserialize)]
struct OllamaTags {
    #[serde(default)]
    models: Vec<OllamaTag>,
}

#[derive(Debug, Deserialize)]
struct OllamaTag {
    name: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponseMessage {
    #[serde(default)]
    content: String,
}

/// Client for `POST /api/chat` on a local (or remote) Ollama server
pub struct OllamaClient {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
    logger: SharedLogger,
}

impl OllamaClient {
    pub fn new(descriptor: ProviderDescriptor, http: reqwest::Client, logger: SharedLogger) -> Self {
        Self {
            descriptor,
            http,
            logger,
        }
    }
}

#[async_trait]
impl ProviderClient for OllamaClient {
    fn provider(&self) -> &str {
        &self.descriptor.name
    }

    async fn send(
        &self,
        prompt: &PromptSpec,
        _credential: Option<&Credential>,
        model: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<ProviderResponse> {
        let provider = self.descriptor.name.as_str();
        let body = OllamaChatRequest {
            model,
            messages: [
                OllamaMessage {
                    role: "system",
                    content: &prompt.system_instructions,
                },
                OllamaMessage {
                    role: "user",
                    content: &prompt.user_content,
                },
            ],
            stream: false,
            options: OllamaOptions {
                temperature: options.temperature_or_default(),
                num_predict: options.max_tokens_or_default(),
            },
        };
        let url = join_url(&self.descriptor.base_url, "api/chat");

        crate::log_debug!(self.logger, "POST {} model={}", url, model);
        let started = Instant::now();
        let response: OllamaChatResponse = send_json(provider, self.http.post(&url).json(&body)).await?;

        let text = response
            .message
            .map(|m| m.content)
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid_response(provider, "response contained no message"))?;

        Ok(ProviderResponse::new(text, provider, model, started.elapsed()))
    }

    /// Models pulled on the server
    async fn list_models(&self, _credential: Option<&Credential>) -> ProviderResult<Vec<String>> {
        let provider = self.descriptor.name.as_str();
        let url = join_url(&self.descriptor.base_url, "api/tags");
        crate::log_debug!(self.logger, "GET {}", url);
        let tags: OllamaTags = send_json(provider, self.http.get(&url)).await?;

        let mut models: Vec<String> = tags.models.into_iter().map(|m| m.name).collect();
        models.sort();
        Ok(models)
    }
}
