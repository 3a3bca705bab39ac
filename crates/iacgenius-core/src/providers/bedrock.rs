//! AWS Bedrock `InvokeModel` adapter
//!
//! Authenticates with ambient AWS credentials and SigV4. Request and
//! response envelopes depend on the model vendor, selected by the model id
//! prefix (`anthropic.`, `meta.`, `amazon.`, `cohere.`, `ai21.`).

use std::sync::Arc;
use std::time::Instant;

use async_trait::async_trait;
use chrono::Utc;
use serde::Deserialize;
use serde_json::{json, Value};

use super::error::{ProviderError, ProviderResult};
use super::http::send_json;
use super::sigv4::{sign, uri_encode_segment, SignableRequest, SigningScope};
use super::traits::ProviderClient;
use crate::credentials::{aws_region, AwsCredentials, Credential};
use crate::env::Environment;
use crate::logging::SharedLogger;
use crate::prompt::PromptSpec;
use crate::registry::ProviderDescriptor;
use crate::types::{GenerationOptions, ProviderResponse};

const SERVICE: &str = "bedrock";
const REGION_PLACEHOLDER: &str = "{region}";

/// Short model names accepted in place of full Bedrock model ids
const MODEL_ALIASES: &[(&str, &str)] = &[
    ("claude-3.5-sonnet", "anthropic.claude-3-5-sonnet-20240620-v1:0"),
    ("claude-3-opus", "anthropic.claude-3-opus-20240229-v1:0"),
    ("claude-3-haiku", "anthropic.claude-3-haiku-20240307-v1:0"),
    ("llama3-8b-instruct", "meta.llama3-8b-instruct-v1:0"),
    ("llama3-70b-instruct", "meta.llama3-70b-instruct-v1:0"),
    ("titan-text-express", "amazon.titan-text-express-v1"),
];

/// Full Bedrock model id for a short alias; full ids pass through
pub fn bedrock_model_id(model: &str) -> &str {
    MODEL_ALIASES
        .iter()
        .find(|(alias, _)| *alias == model)
        .map(|(_, id)| *id)
        .unwrap_or(model)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Vendor {
    Anthropic,
    Meta,
    Amazon,
    Cohere,
    Ai21,
}

impl Vendor {
    fn of(model_id: &str) -> Option<Self> {
        let prefix = model_id.split('.').next()?;
        match prefix {
            "anthropic" => Some(Vendor::Anthropic),
            "meta" => Some(Vendor::Meta),
            "amazon" => Some(Vendor::Amazon),
            "cohere" => Some(Vendor::Cohere),
            "ai21" => Some(Vendor::Ai21),
            _ => None,
        }
    }

    fn request_body(&self, prompt: &PromptSpec, options: &GenerationOptions) -> Value {
        let max_tokens = options.max_tokens_or_default();
        let temperature = options.temperature_or_default();
        match self {
            Vendor::Anthropic => json!({
                "anthropic_version": "bedrock-2023-05-31",
                "max_tokens": max_tokens,
                "temperature": temperature,
                "system": prompt.system_instructions,
                "messages": [{
                    "role": "user",
                    "content": [{"type": "text", "text": prompt.user_content}]
                }]
            }),
            Vendor::Meta => json!({
                "prompt": format!(
                    "<s>[INST] System: {}\nUser: {} [/INST]",
                    prompt.system_instructions, prompt.user_content
                ),
                "max_gen_len": max_tokens,
                "temperature": temperature,
            }),
            Vendor::Amazon => json!({
                "inputText": combined_prompt(prompt),
                "textGenerationConfig": {
                    "maxTokenCount": max_tokens,
                    "temperature": temperature,
                    "stopSequences": []
                }
            }),
            Vendor::Cohere => json!({
                "prompt": combined_prompt(prompt),
                "max_tokens": max_tokens,
                "temperature": temperature,
            }),
            Vendor::Ai21 => json!({
                "prompt": combined_prompt(prompt),
                "maxTokens": max_tokens,
                "temperature": temperature,
            }),
        }
    }

    fn response_text(&self, body: &Value) -> Option<String> {
        let text = match self {
            Vendor::Anthropic => body
                .get("content")?
                .as_array()?
                .iter()
                .filter(|b| b.get("type").and_then(Value::as_str) == Some("text"))
                .filter_map(|b| b.get("text").and_then(Value::as_str))
                .collect::<String>(),
            Vendor::Meta => body.get("generation")?.as_str()?.to_string(),
            Vendor::Amazon => body.pointer("/results/0/outputText")?.as_str()?.to_string(),
            Vendor::Cohere => body.pointer("/generations/0/text")?.as_str()?.to_string(),
            Vendor::Ai21 => body.pointer("/completions/0/data/text")?.as_str()?.to_string(),
        };
        Some(text).filter(|t| !t.trim().is_empty())
    }
}

fn combined_prompt(prompt: &PromptSpec) -> String {
    format!("{}\n\n{}", prompt.system_instructions, prompt.user_content)
}

/// Client for `POST /model/{modelId}/invoke`
///
/// Model listing goes to the control-plane `bedrock` endpoint instead of
/// `bedrock-runtime`.
pub struct BedrockClient {
    descriptor: ProviderDescriptor,
    http: reqwest::Client,
    env: Arc<dyn Environment>,
    logger: SharedLogger,
}

/// A resolved endpoint ready for signing
struct Target {
    base: reqwest::Url,
    host: String,
    region: String,
}

impl Target {
    /// Path prefix of the base URL, without a trailing slash
    fn base_path(&self) -> &str {
        self.base.path().trim_end_matches('/')
    }

    fn url(&self, path_and_query: &str) -> String {
        format!("{}{}", self.base.as_str().trim_end_matches('/'), path_and_query)
    }
}

impl BedrockClient {
    pub fn new(
        descriptor: ProviderDescriptor,
        http: reqwest::Client,
        env: Arc<dyn Environment>,
        logger: SharedLogger,
    ) -> Self {
        Self {
            descriptor,
            http,
            env,
            logger,
        }
    }

    /// Runtime endpoint and signing region
    ///
    /// A base URL without a `{region}` placeholder (a configured override)
    /// is used as-is; the signing region still comes from the environment.
    fn endpoint(&self) -> ProviderResult<(String, String)> {
        let region = aws_region(self.env.as_ref());
        let base = self.descriptor.base_url.trim_end_matches('/');
        if base.contains(REGION_PLACEHOLDER) {
            let region = region.ok_or_else(|| {
                ProviderError::not_configured(&self.descriptor.name, "no AWS region set (AWS_REGION or AWS_DEFAULT_REGION)")
            })?;
            Ok((base.replace(REGION_PLACEHOLDER, &region), region))
        } else {
            Ok((base.to_string(), region.unwrap_or_else(|| "us-east-1".to_string())))
        }
    }

    fn target(&self, control_plane: bool) -> ProviderResult<Target> {
        let provider = self.descriptor.name.as_str();
        let (mut endpoint, region) = self.endpoint()?;
        if control_plane {
            endpoint = endpoint.replacen("://bedrock-runtime.", "://bedrock.", 1);
        }

        let base = reqwest::Url::parse(&endpoint)
            .map_err(|e| ProviderError::not_configured(provider, format!("invalid endpoint {}: {}", endpoint, e)))?;
        let host = match (base.host_str(), base.port()) {
            (Some(host), Some(port)) => format!("{}:{}", host, port),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ProviderError::not_configured(provider, format!("endpoint has no host: {}", endpoint))),
        };
        Ok(Target { base, host, region })
    }

    fn credentials(&self) -> ProviderResult<AwsCredentials> {
        AwsCredentials::from_chain(self.env.as_ref()).ok_or_else(|| {
            ProviderError::not_configured(
                &self.descriptor.name,
                "no AWS credentials found in environment or shared credentials file",
            )
        })
    }

    /// SigV4 headers for one request against `target`
    fn sign(
        &self,
        target: &Target,
        method: &str,
        canonical_path: &str,
        canonical_query: &str,
        payload: &[u8],
        with_content_type: bool,
    ) -> ProviderResult<Vec<(String, String)>> {
        let aws = self.credentials()?;
        let mut headers = vec![("host".to_string(), target.host.clone())];
        if with_content_type {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        let signable = SignableRequest {
            method,
            canonical_uri: canonical_path,
            canonical_query,
            headers,
            payload,
        };
        let scope = SigningScope {
            region: &target.region,
            service: SERVICE,
            time: Utc::now(),
        };
        sign(&signable, &aws, scope).map_err(|e| ProviderError::transport(&self.descriptor.name, e.to_string()))
    }
}

#[async_trait]
impl ProviderClient for BedrockClient {
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
        let model_id = bedrock_model_id(model);
        let vendor = Vendor::of(model_id).ok_or_else(|| {
            ProviderError::not_configured(provider, format!("unsupported Bedrock model family: {}", model_id))
        })?;
        let target = self.target(false)?;

        let encoded_id = uri_encode_segment(model_id);
        let url = target.url(&format!("/model/{}/invoke", encoded_id));
        // Non-S3 services sign the path with each segment encoded a second time
        let canonical_path = format!("{}/model/{}/invoke", target.base_path(), uri_encode_segment(&encoded_id));

        let payload = serde_json::to_vec(&vendor.request_body(prompt, options))
            .map_err(|e| ProviderError::transport(provider, e.to_string()))?;
        let signed = self.sign(&target, "POST", &canonical_path, "", &payload, true)?;

        let mut request = self
            .http
            .post(&url)
            .header("content-type", "application/json")
            .header("accept", "application/json")
            .body(payload);
        for (name, value) in signed {
            request = request.header(name, value);
        }

        crate::log_debug!(self.logger, "POST {} region={}", url, target.region);
        let started = Instant::now();
        let body: Value = send_json(provider, request).await?;

        let text = vendor
            .response_text(&body)
            .ok_or_else(|| ProviderError::invalid_response(provider, "response contained no generated text"))?;

        Ok(ProviderResponse::new(text, provider, model, started.elapsed()))
    }

    /// On-demand foundation models with text output
    async fn list_models(&self, _credential: Option<&Credential>) -> ProviderResult<Vec<String>> {
        let provider = self.descriptor.name.as_str();
        let target = self.target(true)?;
        let query = LIST_MODELS_QUERY;
        let canonical_path = format!("{}/foundation-models", target.base_path());
        let signed = self.sign(&target, "GET", &canonical_path, query, b"", false)?;

        let url = target.url(&format!("/foundation-models?{}", query));
        let mut request = self.http.get(&url).header("accept", "application/json");
        for (name, value) in signed {
            request = request.header(name, value);
        }

        crate::log_debug!(self.logger, "GET {} region={}", url, target.region);
        let body: FoundationModels = send_json(provider, request).await?;
        let mut models: Vec<String> = body.model_summaries.into_iter().map(|m| m.model_id).collect();
        models.sort();
        Ok(models)
    }
}

/// Sorted, already-encoded query for `ListFoundationModels`
const LIST_MODELS_QUERY: &str = "byInferenceType=ON_DEMAND&byOutputModality=TEXT";

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundationModels {
    #[serde(default)]
    model_summaries: Vec<FoundationModelSummary>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FoundationModelSummary {
    model_id: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    use mockito::{Matcher, Server};

    use crate::env::MapEnvironment;
    use crate::logging::NoOpLogger;
    use crate::registry::ProviderRegistry;

    fn prompt() -> PromptSpec {
        PromptSpec {
            system_instructions: "sys".to_string(),
            user_content: "vpc".to_string(),
            target_language_hint: "yaml".to_string(),
        }
    }

    fn aws_env() -> MapEnvironment {
        MapEnvironment::new()
            .with_var("AWS_ACCESS_KEY_ID", "AKIDTEST")
            .with_var("AWS_SECRET_ACCESS_KEY", "secret")
            .with_var("AWS_REGION", "eu-west-1")
    }

    fn client(base_url: Option<&str>, env: MapEnvironment) -> BedrockClient {
        let mut descriptor = ProviderRegistry::builtin().describe("bedrock").unwrap().clone();
        if let Some(base) = base_url {
            descriptor.base_url = base.to_string();
        }
        BedrockClient::new(descriptor, reqwest::Client::new(), Arc::new(env), Arc::new(NoOpLogger))
    }

    #[test]
    fn test_model_aliases() {
        assert_eq!(bedrock_model_id("claude-3-haiku"), "anthropic.claude-3-haiku-20240307-v1:0");
        assert_eq!(bedrock_model_id("titan-text-express"), "amazon.titan-text-express-v1");
        assert_eq!(bedrock_model_id("meta.llama3-1-8b-instruct-v1:0"), "meta.llama3-1-8b-instruct-v1:0");
    }

    #[test]
    fn test_vendor_envelopes() {
        let options = GenerationOptions::default();

        let body = Vendor::Anthropic.request_body(&prompt(), &options);
        assert_eq!(body["anthropic_version"], "bedrock-2023-05-31");
        assert_eq!(body["system"], "sys");
        assert_eq!(body["messages"][0]["content"][0]["text"], "vpc");

        let body = Vendor::Meta.request_body(&prompt(), &options);
        assert_eq!(body["prompt"], "<s>[INST] System: sys\nUser: vpc [/INST]");
        assert_eq!(body["max_gen_len"], 2048);

        let body = Vendor::Amazon.request_body(&prompt(), &options);
        assert_eq!(body["inputText"], "sys\n\nvpc");
        assert_eq!(body["textGenerationConfig"]["maxTokenCount"], 2048);
    }

    #[test]
    fn test_vendor_responses() {
        assert_eq!(
            Vendor::Meta.response_text(&json!({"generation": "x"})).as_deref(),
            Some("x")
        );
        assert_eq!(
            Vendor::Amazon
                .response_text(&json!({"results": [{"outputText": "y"}]}))
                .as_deref(),
            Some("y")
        );
        assert_eq!(
            Vendor::Anthropic
                .response_text(&json!({"content": [{"type": "text", "text": "a"}, {"type": "text", "text": "b"}]}))
                .as_deref(),
            Some("ab")
        );
        assert!(Vendor::Meta.response_text(&json!({"generation": "  "})).is_none());
        assert!(Vendor::Amazon.response_text(&json!({})).is_none());
    }

    #[test]
    fn test_endpoint_from_region() {
        let c = client(None, aws_env());
        let (endpoint, region) = c.endpoint().unwrap();
        assert_eq!(endpoint, "https://bedrock-runtime.eu-west-1.amazonaws.com");
        assert_eq!(region, "eu-west-1");
    }

    #[tokio::test]
    async fn test_missing_region_is_not_configured() {
        let env = MapEnvironment::new()
            .with_var("AWS_ACCESS_KEY_ID", "AKIDTEST")
            .with_var("AWS_SECRET_ACCESS_KEY", "secret");
        let err = client(None, env)
            .send(&prompt(), None, "claude-3-haiku", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
        assert!(!err.is_transient());
    }

    #[tokio::test]
    async fn test_missing_aws_credentials() {
        let env = MapEnvironment::new()
            .with_var("AWS_REGION", "us-east-1")
            .with_var("AWS_SHARED_CREDENTIALS_FILE", "/nonexistent/credentials");
        let err = client(None, env)
            .send(&prompt(), None, "claude-3-haiku", &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::NotConfigured { .. }));
    }

    #[tokio::test]
    async fn test_signed_invoke() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock(
                "POST",
                Matcher::Regex(r"^/model/anthropic\.claude-3-haiku-20240307-v1(%3A|:)0/invoke".to_string()),
            )
            .match_header(
                "authorization",
                Matcher::Regex(r"^AWS4-HMAC-SHA256 Credential=AKIDTEST/\d{8}/eu-west-1/bedrock/aws4_request, SignedHeaders=content-type;host;x-amz-date, Signature=[0-9a-f]{64}$".to_string()),
            )
            .match_header("x-amz-date", Matcher::Regex(r"^\d{8}T\d{6}Z$".to_string()))
            .with_status(200)
            .with_body(r#"{"content":[{"type":"text","text":"```yaml\nResources: {}\n```"}]}"#)
            .create_async()
            .await;

        let response = client(Some(&server.url()), aws_env())
            .send(&prompt(), None, "claude-3-haiku", &GenerationOptions::default())
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(response.raw_text, "```yaml\nResources: {}\n```");
        assert_eq!(response.model_name, "claude-3-haiku");
    }

    #[tokio::test]
    async fn test_list_models_is_signed_and_sorted() {
        let mut server = Server::new_async().await;
        let mock = server
            .mock("GET", "/foundation-models")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("byOutputModality".into(), "TEXT".into()),
                Matcher::UrlEncoded("byInferenceType".into(), "ON_DEMAND".into()),
            ]))
            .match_header(
                "authorization",
                Matcher::Regex(r"^AWS4-HMAC-SHA256 Credential=AKIDTEST/\d{8}/eu-west-1/bedrock/aws4_request, SignedHeaders=host;x-amz-date, ".to_string()),
            )
            .with_status(200)
            .with_body(
                r#"{"modelSummaries":[{"modelId":"meta.llama3-8b-instruct-v1:0"},{"modelId":"anthropic.claude-3-haiku-20240307-v1:0"}]}"#,
            )
            .create_async()
            .await;

        let models = client(Some(&server.url()), aws_env()).list_models(None).await.unwrap();

        mock.assert_async().await;
        assert_eq!(
            models,
            vec!["anthropic.claude-3-haiku-20240307-v1:0", "meta.llama3-8b-instruct-v1:0"]
        );
    }

    #[test]
    fn test_control_plane_endpoint() {
        let c = client(None, aws_env());
        assert_eq!(c.target(true).unwrap().host, "bedrock.eu-west-1.amazonaws.com");
        assert_eq!(c.target(false).unwrap().host, "bedrock-runtime.eu-west-1.amazonaws.com");
    }
}
