//! Anthropic Messages API adapter

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

const ANTHROPIC_VERSION: &str = "2023-06-01";

#[derive(Debug, Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    temperature: f32,
    system: &'a str,
    messages: [UserMessage<'a>; 1],
}

#[derive(Debug, Serialize)]
struct UserMessage<'a> {
    role: &'static str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct MessagesResponse {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    stop_reason: Option<String>,
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
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: String,
}

/// Client for `POST /v1/messages`
pub struct AnthropicClient {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
    logger: SharedLogger,
}

impl AnthropicClient {
    pub fn new(descriptor: ProviderDescriptor, http: reqwest::Client, logger: SharedLogger) -> Self {
        Self {
            descriptor,
            http,
            logger,
        }
    }

    fn authorized(&self, request: reqwest::RequestBuilder, credential: &Credential) -> reqwest::RequestBuilder {
        request
            .header("x-api-key", credential.expose())
            .header("anthropic-version", ANTHROPIC_VERSION)
    }
}

#[async_trait]
impl ProviderClient for AnthropicClient {
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

        let body = MessagesRequest {
            model,
            max_tokens: options.max_tokens_or_default(),
            temperature: options.temperature_or_default(),
            system: &prompt.system_instructions,
            messages: [UserMessage {
                role: "user",
                content: &prompt.user_content,
            }],
        };
        let url = join_url(&self.descriptor.base_url, "messages");
        let request = self.authorized(self.http.post(&url), credential).json(&body);

        crate::log_debug!(self.logger, "POST {} model={}", url, model);
        let started = Instant::now();
        let response: MessagesResponse = send_json(provider, request).await?;

        // Concatenate text blocks; thinking/tool blocks are ignored
        let text: String = response
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .map(|b| b.text.as_str())
            .collect();
        if response.stop_reason.as_deref() == Some("refusal") {
            return Ok(ProviderResponse::new(text, provider, model, started.elapsed()).flagged());
        }
        if text.trim().is_empty() {
            return Err(ProviderError::invalid_response(provider, "response contained no text blocks"));
        }

        Ok(ProviderResponse::new(text, provider, model, started.elapsed()))
    }

    async fn list_models(&self, credential: Option<&Credential>) -> ProviderResult<Vec<String>> {
        let provider = self.descriptor.name.as_str();
        let credential = credential
            .ok_or_else(|| ProviderError::not_configured(provider, "an API key is required"))?;

        let url = join_url(&self.descriptor.base_url, "models?limit=1000");
        crate::log_debug!(self.logger, "GET {}", url);
        let list: ModelList = send_json(provider, self.authorized(self.http.get(&url), credential)).await?;

        let mut models: Vec<String> = list.data.into_iter().map(|m| m.id).collect();
        models.sort();
        Ok(models)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    use mockito::{Matcher, Server};
    use serde_json::json;

    use crate::credentials::CredentialOrigin;
    use crate::logging::NoOpLogger;
    use crate::registry::ProviderRegistry;

    fn client(base_url: &str) -> AnthropicClient {
        let mut descriptor = ProviderRegistry::builtin().describe("anthropic").unwrap().clone();
        descriptor.base_url = base_url.to_string();
        AnthropicClient::new(descriptor, reqwest::Client::new(), Arc::new(NoOpLogger))
    }

    fn prompt() -> PromptSpec {
        PromptSpec {
            system_instructions: "be terse".to_string(),
            user_content: "an s3 bucket".to_string(),
            target_language_hint: "hcl".to_string(),
        }
    }

    #[tokio::test]
    async fn test_send_success() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("POST", "/messages")
            .match_header("x-api-key", "sk-ant")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .match_body(Matcher::PartialJson(json!({
                "model": "claude-3-haiku-latest",
                "system": "be terse",
                "messages": [{"role": "user", "content": "an s3 bucket"}]
            })))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"```hcl\n"},{"type":"text","text":"x\n```"}]}"#)
            .create_async()
            .await;

        let cred = Credential::new("anthropic", "sk-ant", CredentialOrigin::SecretStore("memory".to_string()));
        let response = client(&server.url())
            .send(&prompt(), Some(&cred), "claude-3-haiku-latest", &GenerationOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.raw_text, "```hcl\nx\n```");
        assert_eq!(response.provider_name, "anthropic");
    }

    #[tokio::test]
    async fn test_refusal_is_flagged() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/messages")
            .with_status(200)
            .with_body(r#"{"content":[],"stop_reason":"refusal"}"#)
            .create_async()
            .await;

        let cred = Credential::new("anthropic", "sk-ant", CredentialOrigin::SecretStore("memory".to_string()));
        let response = client(&server.url())
            .send(&prompt(), Some(&cred), "claude-3-haiku-latest", &GenerationOptions::default())
            .await
            .unwrap();
        assert!(!response.success);
    }

    #[tokio::test]
    async fn test_list_models() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/models")
            .match_query(Matcher::UrlEncoded("limit".into(), "1000".into()))
            .match_header("x-api-key", "sk-ant")
            .match_header("anthropic-version", ANTHROPIC_VERSION)
            .with_status(200)
            .with_body(r#"{"data":[{"type":"model","id":"claude-3-haiku-latest"},{"type":"model","id":"claude-3-5-sonnet-latest"}],"has_more":false}"#)
            .create_async()
            .await;

        let cred = Credential::new("anthropic", "sk-ant", CredentialOrigin::SecretStore("memory".to_string()));
        let models = client(&server.url()).list_models(Some(&cred)).await.unwrap();

        mock.assert_async().await;
        assert_eq!(models, vec!["claude-3-5-sonnet-latest", "claude-3-haiku-latest"]);
    }

    #[tokio::test]
    async fn test_rate_limit_is_transient() {
        let mut server = Server::new_async().await;
        let _m = server
            .mock("POST", "/messages")
            .with_status(429)
            .with_body(r#"{"type":"error","error":{"type":"rate_limit_error","message":"slow down"}}"#)
            .create_async()
            .await;

        let cred = Credential::new("anthropic", "sk-ant", CredentialOrigin::SecretStore("memory".to_string()));
        let err = client(&server.url())
            .send(&prompt(), Some(&cred), "claude-3-haiku-latest", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited { .. }));
        assert!(err.to_string().contains("slow down"));
    }
}
