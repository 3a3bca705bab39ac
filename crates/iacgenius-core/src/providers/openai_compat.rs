//! OpenAI-style chat completions adapter (OpenAI, DeepSeek, OpenRouter)

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
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 2],
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_completion_tokens: Option<u32>,
    stream: bool,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ModelList {
    #[serde(default)]
    data: Vec<ModelEntry>,
}

#[derive(Debug, Deserialize)]
struct ModelEntry {
    id: String,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

/// Client for any `/chat/completions` endpoint
pub struct OpenAiCompatibleClient {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
    logger: SharedLogger,
}

impl OpenAiCompatibleClient {
    pub fn new(descriptor: ProviderDescriptor, http: reqwest::Client, logger: SharedLogger) -> Self {
        Self {
            descriptor,
            http,
            logger,
        }
    }

    fn endpoint(&self) -> String {
        join_url(&self.descriptor.base_url, "chat/completions")
    }

    fn authorized(&self, request: reqwest::RequestBuilder, credential: &Credential) -> reqwest::RequestBuilder {
        let mut request = request.bearer_auth(credential.expose());
        for (name, value) in &self.descriptor.extra_headers {
            request = request.header(name.as_str(), value.as_str());
        }
        request
    }
}

/// OpenAI's o-series reject `temperature` and `max_tokens`
fn is_openai_reasoning_model(model: &str) -> bool {
    let base = model.rsplit('/').next().unwrap_or(model);
    base.starts_with("o1") || base.starts_with("o3")
}

#[async_trait]
impl ProviderClient for OpenAiCompatibleClient {
    fn provider(&self) -> &str {
        &self.descriptor.name
    }

    async fn send(
        &self,
        prompt: &PromptSpec,
        credential: Option<&Credential>,
        model: &str,
        options: &GenerationOptions,
    ) -> ProviderResult<ProviderResponse> {
        let provider = self.descriptor.name.as_str();
        let credential = credential
            .ok_or_else(|| ProviderError::not_configured(provider, "an API key is required"))?;

        let reasoning = is_openai_reasoning_model(model);
        let max_tokens = options.max_tokens_or_default();
        let body = ChatRequest {
            model,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_content,
                },
            ],
            temperature: (!reasoning).then(|| options.temperature_or_default()),
            max_tokens: (!reasoning).then_some(max_tokens),
            max_completion_tokens: reasoning.then_some(max_tokens),
            stream: false,
        };

        let request = self.authorized(self.http.post(self.endpoint()), credential).json(&body);

        crate::log_debug!(self.logger, "POST {} model={}", self.endpoint(), model);
        let started = Instant::now();
        let response: ChatResponse = send_json(provider, request).await?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ProviderError::invalid_response(provider, "response contained no choices"))?;
        if choice.finish_reason.as_deref() == Some("content_filter") {
            let text = choice.message.content.unwrap_or_default();
            return Ok(ProviderResponse::new(text, provider, model, started.elapsed()).flagged());
        }

        let text = choice
            .message
            .content
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| ProviderError::invalid_response(provider, "response contained no message content"))?;

        Ok(ProviderResponse::new(text, provider, model, started.elapsed()))
    }

    async fn list_models(&self, credential: Option<&Credential>) -> ProviderResult<Vec<String>> {
        let provider = self.descriptor.name.as_str();
        let credential = credential
            .ok_or_else(|| ProviderError::not_configured(provider, "an API key is required"))?;

        let url = join_url(&self.descriptor.base_url, "models");
        crate::log_debug!(self.logger, "GET {}", url);
        let list: ModelList = send_json(provider, self.authorized(self.http.get(&url), credential)).await?;

        let mut models: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }
}
