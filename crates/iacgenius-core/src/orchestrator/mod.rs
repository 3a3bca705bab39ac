//! Generation orchestrator
//!
//! Drives one request through credential resolution, prompt construction,
//! the provider attempt loop and response extraction:
//!
//! ```text
//! Resolving -> Prompting -> Attempting(provider_i) -> Success
//!                                                  -> Attempting(provider_i+1)
//!                                                  -> Exhausted
//! ```
//!
//! Candidates are tried strictly in order, one network call at a time.
//! Transient failures are retried against the same candidate with
//! exponential backoff; everything else moves on to the next candidate.

mod retry;

use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::{DefaultSettings, GeneratorConfig};
use crate::credentials::{Credential, CredentialResolver};
use crate::error::{CandidateFailure, GenerationError, GenerationResult};
use crate::extract::{ExtractionError, ResponseExtractor};
use crate::logging::{NoOpLogger, SharedLogger};
use crate::prompt::{PromptBuilder, PromptSpec};
use crate::providers::{ClientFactory, ProviderClient, ProviderError};
use crate::registry::ProviderRegistry;
use crate::types::{CancellationToken, GeneratedArtifact, GenerationOptions, GenerationRequest, ProviderResponse};

pub use retry::RetryPolicy;

/// Result of one network attempt
#[derive(Debug, Clone, PartialEq)]
pub enum AttemptOutcome {
    Success,
    Failed(ProviderError),
    Cancelled,
}

/// One network attempt against one candidate
#[derive(Debug, Clone, PartialEq)]
pub struct AttemptRecord {
    pub provider: String,
    pub model: String,
    /// 1-based, per candidate
    pub attempt: u32,
    pub latency: Duration,
    pub outcome: AttemptOutcome,
}

/// An artifact together with every attempt that led to it
#[derive(Debug, Clone)]
pub struct Generation {
    pub artifact: GeneratedArtifact,
    pub attempts: Vec<AttemptRecord>,
}

/// A provider to try, with the model explicitly asked for (if any)
#[derive(Debug, Clone, PartialEq, Eq)]
struct Candidate {
    provider: String,
    model: Option<String>,
}

/// Why a candidate's attempt loop stopped without a response
enum CandidateStop {
    Failed { attempts: u32, error: GenerationError },
    Cancelled,
}

pub struct GenerationOrchestrator {
    registry: Arc<ProviderRegistry>,
    resolver: CredentialResolver,
    factory: Arc<dyn ClientFactory>,
    prompts: PromptBuilder,
    extractor: ResponseExtractor,
    defaults: DefaultSettings,
    retry: RetryPolicy,
    logger: SharedLogger,
}

impl GenerationOrchestrator {
    pub fn new(
        registry: Arc<ProviderRegistry>,
        resolver: CredentialResolver,
        factory: Arc<dyn ClientFactory>,
    ) -> Self {
        Self {
            registry,
            resolver,
            factory,
            prompts: PromptBuilder::new(),
            extractor: ResponseExtractor::new(),
            defaults: DefaultSettings::default(),
            retry: RetryPolicy::default(),
            logger: Arc::new(NoOpLogger),
        }
    }

    /// Build the registry, defaults and retry policy from `config`
    pub fn from_config(
        config: &GeneratorConfig,
        resolver: CredentialResolver,
        factory: Arc<dyn ClientFactory>,
    ) -> GenerationResult<Self> {
        let registry = ProviderRegistry::from_config(config)?;
        Ok(Self::new(Arc::new(registry), resolver, factory)
            .with_defaults(config.defaults.clone())
            .with_retry(RetryPolicy::from(&config.retry)))
    }

    pub fn with_defaults(mut self, defaults: DefaultSettings) -> Self {
        self.defaults = defaults;
        self
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    pub fn with_logger(mut self, logger: SharedLogger) -> Self {
        self.logger = logger;
        self
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &CredentialResolver {
        &self.resolver
    }

    /// Generate an artifact for `request`
    pub async fn generate(&self, request: &GenerationRequest) -> GenerationResult<GeneratedArtifact> {
        let cancel = CancellationToken::new();
        self.generate_detailed(request, &cancel)
            .await
            .map(|generation| generation.artifact)
    }

    /// Generate an artifact, observing `cancel`, and report every attempt
    pub async fn generate_detailed(
        &self,
        request: &GenerationRequest,
        cancel: &CancellationToken,
    ) -> GenerationResult<Generation> {
        let candidates = self.candidates(request);
        let options = request.options.or(self.defaults.generation_options());
        let mut attempts = Vec::new();
        let mut failures = Vec::new();

        crate::log_debug!(
            self.logger,
            "Generating {} with candidates: {}",
            request.infra_type,
            candidates.iter().map(|c| c.provider.as_str()).collect::<Vec<_>>().join(", ")
        );

        for candidate in &candidates {
            if cancel.is_cancelled() {
                return Err(GenerationError::Cancelled);
            }

            // Resolving
            let descriptor = match self.registry.describe(&candidate.provider) {
                Ok(descriptor) => descriptor,
                Err(err) => {
                    crate::log_warn!(self.logger, "Skipping {}: {}", candidate.provider, err);
                    failures.push(CandidateFailure::new(&candidate.provider, None, 0, err.into()));
                    continue;
                }
            };
            let model = match self.registry.resolve_model(&descriptor.name, candidate.model.as_deref()) {
                Ok(model) => model,
                Err(err) => {
                    crate::log_warn!(self.logger, "Skipping {}: {}", descriptor.name, err);
                    failures.push(CandidateFailure::new(&descriptor.name, candidate.model.clone(), 0, err.into()));
                    continue;
                }
            };
            let resolution = match self.resolver.resolve(descriptor) {
                Ok(resolution) => resolution,
                Err(err) => {
                    crate::log_warn!(self.logger, "Skipping {}: {}", descriptor.name, err);
                    failures.push(CandidateFailure::new(&descriptor.name, Some(model), 0, err.into()));
                    continue;
                }
            };
            crate::log_debug!(
                self.logger,
                "Using {} ({}), authentication: {}",
                descriptor.name,
                model,
                resolution.describe_source()
            );

            // Prompting
            let prompt = self.prompts.build_for_model(request, descriptor, &model);

            // Attempting
            let client = self.factory.create(descriptor);
            let stop = match self
                .attempt_candidate(client.as_ref(), &prompt, resolution.credential(), &model, &options, cancel, &mut attempts)
                .await
            {
                Ok(response) => {
                    crate::log_info!(
                        self.logger,
                        "{} ({}) responded in {} ms",
                        response.provider_name,
                        response.model_name,
                        response.latency.as_millis()
                    );
                    let artifact = self.extract(&response)?;
                    return Ok(Generation { artifact, attempts });
                }
                Err(stop) => stop,
            };

            match stop {
                CandidateStop::Cancelled => return Err(GenerationError::Cancelled),
                CandidateStop::Failed { attempts: count, error } => {
                    crate::log_warn!(self.logger, "{} ({}) failed: {}", descriptor.name, model, error);
                    failures.push(CandidateFailure::new(&descriptor.name, Some(model), count, error));
                }
            }
        }

        Err(GenerationError::AllProvidersExhausted { failures })
    }

    /// Ordered, de-duplicated candidate list
    ///
    /// The explicit provider (or the configured default, or the catalog
    /// default) comes first, then the fallback chain.
    fn candidates(&self, request: &GenerationRequest) -> Vec<Candidate> {
        let configured_default = self
            .defaults
            .provider
            .clone()
            .unwrap_or_else(|| self.registry.default_provider().to_string());
        let primary = request.provider.clone().unwrap_or_else(|| configured_default.clone());

        let default_model_for = |name: &str| {
            if name.eq_ignore_ascii_case(&configured_default) {
                self.defaults.model.clone()
            } else {
                None
            }
        };

        let mut candidates = vec![Candidate {
            model: request.model.clone().or_else(|| default_model_for(&primary)),
            provider: primary,
        }];
        for name in &self.defaults.fallback_chain {
            if candidates.iter().any(|c| c.provider.eq_ignore_ascii_case(name)) {
                continue;
            }
            candidates.push(Candidate {
                provider: name.clone(),
                model: default_model_for(name),
            });
        }
        candidates
    }

    /// Call one candidate until it succeeds, fails for good or runs out of
    /// attempts
    #[allow(clippy::too_many_arguments)]
    async fn attempt_candidate(
        &self,
        client: &dyn ProviderClient,
        prompt: &PromptSpec,
        credential: Option<&Credential>,
        model: &str,
        options: &GenerationOptions,
        cancel: &CancellationToken,
        records: &mut Vec<AttemptRecord>,
    ) -> Result<ProviderResponse, CandidateStop> {
        let provider = client.provider().to_string();
        let max_attempts = self.retry.attempts();
        let mut attempt = 1;

        loop {
            let delay = self.retry.delay_before(attempt);
            if !delay.is_zero() {
                crate::log_debug!(self.logger, "Retrying {} in {} ms", provider, delay.as_millis());
                if cancel.run_until_cancelled(tokio::time::sleep(delay)).await.is_none() {
                    return Err(CandidateStop::Cancelled);
                }
            }

            let started = Instant::now();
            let call = tokio::time::timeout(
                self.retry.attempt_timeout,
                client.send(prompt, credential, model, options),
            );
            let result = match cancel.run_until_cancelled(call).await {
                Some(Ok(result)) => result,
                Some(Err(_elapsed)) => Err(ProviderError::timeout(
                    &provider,
                    format!("no response within {}s", self.retry.attempt_timeout.as_secs()),
                )),
                None => {
                    records.push(AttemptRecord {
                        provider: provider.clone(),
                        model: model.to_string(),
                        attempt,
                        latency: started.elapsed(),
                        outcome: AttemptOutcome::Cancelled,
                    });
                    return Err(CandidateStop::Cancelled);
                }
            };

            let result = result.and_then(|response| {
                if response.success {
                    Ok(response)
                } else {
                    Err(ProviderError::invalid_response(&provider, "the provider flagged its response as unsuccessful"))
                }
            });

            let outcome = match &result {
                Ok(_) => AttemptOutcome::Success,
                Err(err) => AttemptOutcome::Failed(err.clone()),
            };
            records.push(AttemptRecord {
                provider: provider.clone(),
                model: model.to_string(),
                attempt,
                latency: started.elapsed(),
                outcome,
            });

            match result {
                Ok(response) => return Ok(response),
                Err(err) if err.is_transient() && attempt < max_attempts => {
                    crate::log_warn!(
                        self.logger,
                        "{} attempt {}/{} failed: {}",
                        provider,
                        attempt,
                        max_attempts,
                        err
                    );
                    attempt += 1;
                }
                Err(err) if err.is_transient() => {
                    return Err(CandidateStop::Failed {
                        attempts: attempt,
                        error: GenerationError::TransientProvider {
                            provider,
                            attempts: attempt,
                            source: err,
                        },
                    });
                }
                Err(err) => {
                    return Err(CandidateStop::Failed {
                        attempts: attempt,
                        error: GenerationError::NonTransientProvider { provider, source: err },
                    });
                }
            }
        }
    }

    /// Extraction failures are final; the next candidate is not tried
    fn extract(&self, response: &ProviderResponse) -> GenerationResult<GeneratedArtifact> {
        self.extractor
            .extract_artifact(response)
            .map_err(|err| match err {
                ExtractionError::NoCodeBlockFound => GenerationError::NoCodeBlockFound {
                    provider: response.provider_name.clone(),
                    model: response.model_name.clone(),
                },
                other => GenerationError::Extraction {
                    provider: response.provider_name.clone(),
                    model: response.model_name.clone(),
                    source: other,
                },
            })
    }
}

impl std::fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("default_provider", &self.registry.default_provider())
            .field("defaults", &self.defaults)
            .field("retry", &self.retry)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::env::MapEnvironment;
    use crate::logging::RecordingLogger;
    use crate::providers::{MockClientFactory, MockProviderClient, MockReply};
    use crate::secrets::MemorySecretStore;
    use crate::types::InfraType;

    const REPLY: &str = "```hcl\nresource \"aws_s3_bucket\" \"b\" {}\n```";

    fn env_with_keys() -> MapEnvironment {
        MapEnvironment::new()
            .with_var("DEEPSEEK_API_KEY", "ds-key")
            .with_var("OPENAI_API_KEY", "oa-key")
            .with_var("ANTHROPIC_API_KEY", "an-key")
    }

    fn orchestrator(env: MapEnvironment, clients: Vec<Arc<MockProviderClient>>) -> GenerationOrchestrator {
        let factory = clients
            .into_iter()
            .fold(MockClientFactory::new(), |factory, client| factory.with_client(client));
        let resolver = CredentialResolver::new(Arc::new(env), Some(Arc::new(MemorySecretStore::new())));
        GenerationOrchestrator::new(Arc::new(ProviderRegistry::builtin()), resolver, Arc::new(factory))
            .with_retry(RetryPolicy::default().with_base_delay(Duration::ZERO))
    }

    fn request() -> GenerationRequest {
        GenerationRequest::new(InfraType::Terraform, "S3 bucket with versioning")
    }

    fn fallback(names: &[&str]) -> DefaultSettings {
        DefaultSettings {
            fallback_chain: names.iter().map(|s| s.to_string()).collect(),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_default_provider_success() {
        let deepseek = Arc::new(MockProviderClient::fixed("deepseek", REPLY));
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone()]);

        let artifact = orch.generate(&request()).await.unwrap();
        assert_eq!(artifact.source_provider, "deepseek");
        assert_eq!(artifact.source_model, "deepseek-chat");
        assert_eq!(artifact.code_body, "resource \"aws_s3_bucket\" \"b\" {}");
        assert!(deepseek.calls()[0].had_credential);
    }

    #[tokio::test]
    async fn test_transient_errors_are_retried() {
        let deepseek = Arc::new(
            MockProviderClient::scripted(
                "deepseek",
                vec![MockReply::status("deepseek", 503), MockReply::status("deepseek", 429)],
            )
            .repeating(MockReply::text(REPLY)),
        );
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone()]);

        let generation = orch.generate_detailed(&request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(generation.attempts.len(), 3);
        assert_eq!(
            generation.attempts.iter().map(|a| a.attempt).collect::<Vec<_>>(),
            vec![1, 2, 3]
        );
        assert_eq!(generation.attempts[2].outcome, AttemptOutcome::Success);
        assert_eq!(deepseek.call_count(), 3);
    }

    #[tokio::test]
    async fn test_non_transient_error_moves_on_after_one_attempt() {
        let deepseek = Arc::new(MockProviderClient::failing(
            "deepseek",
            ProviderError::from_status("deepseek", 401, "invalid key"),
        ));
        let openai = Arc::new(MockProviderClient::fixed("openai", REPLY));
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone(), openai.clone()])
            .with_defaults(fallback(&["openai"]));

        let generation = orch.generate_detailed(&request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(deepseek.call_count(), 1);
        assert_eq!(generation.artifact.source_provider, "openai");
        assert_eq!(generation.attempts.len(), 2);
        assert_eq!(generation.attempts[0].provider, "deepseek");
    }

    #[tokio::test]
    async fn test_flagged_response_moves_on() {
        let deepseek = Arc::new(MockProviderClient::new("deepseek").repeating(MockReply::Flagged(REPLY.to_string())));
        let openai = Arc::new(MockProviderClient::fixed("openai", REPLY));
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone(), openai.clone()])
            .with_defaults(fallback(&["openai"]));

        let generation = orch.generate_detailed(&request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(deepseek.call_count(), 1);
        assert_eq!(generation.artifact.source_provider, "openai");
        assert!(matches!(
            generation.attempts[0].outcome,
            AttemptOutcome::Failed(ProviderError::InvalidResponse { .. })
        ));
    }

    #[tokio::test]
    async fn test_retry_budget_exhaustion() {
        let deepseek = Arc::new(MockProviderClient::failing(
            "deepseek",
            ProviderError::from_status("deepseek", 500, "boom"),
        ));
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone()]);

        let err = orch.generate(&request()).await.unwrap_err();
        assert_eq!(deepseek.call_count(), 3);
        match err.sole_failure() {
            Some(GenerationError::TransientProvider { attempts, .. }) => assert_eq!(*attempts, 3),
            other => panic!("unexpected failure: {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_missing_credential_skips_without_calling() {
        let deepseek = Arc::new(MockProviderClient::fixed("deepseek", REPLY));
        let openai = Arc::new(MockProviderClient::fixed("openai", REPLY));
        let env = MapEnvironment::new().with_var("OPENAI_API_KEY", "oa-key");
        let orch = orchestrator(env, vec![deepseek.clone(), openai.clone()]).with_defaults(fallback(&["openai"]));

        let artifact = orch.generate(&request()).await.unwrap();
        assert_eq!(artifact.source_provider, "openai");
        assert_eq!(deepseek.call_count(), 0);
    }

    #[tokio::test]
    async fn test_exhaustion_reports_candidates_in_order() {
        let openai = Arc::new(MockProviderClient::failing(
            "openai",
            ProviderError::from_status("openai", 400, "bad request"),
        ));
        let env = MapEnvironment::new().with_var("OPENAI_API_KEY", "oa-key");
        let orch = orchestrator(env, vec![openai]).with_defaults(fallback(&["no-such-provider", "openai", "anthropic"]));

        let err = orch.generate(&request()).await.unwrap_err();
        let GenerationError::AllProvidersExhausted { failures } = err else {
            panic!("expected exhaustion");
        };
        let providers: Vec<_> = failures.iter().map(|f| f.provider.as_str()).collect();
        assert_eq!(providers, vec!["deepseek", "no-such-provider", "openai", "anthropic"]);
        assert!(matches!(*failures[0].reason, GenerationError::CredentialNotFound { .. }));
        assert!(matches!(*failures[1].reason, GenerationError::UnknownProvider { .. }));
        assert!(matches!(*failures[2].reason, GenerationError::NonTransientProvider { .. }));
        assert_eq!(failures[2].attempts, 1);
        assert!(matches!(*failures[3].reason, GenerationError::CredentialNotFound { .. }));
    }

    #[tokio::test]
    async fn test_explicit_model_is_never_substituted() {
        let openai = Arc::new(MockProviderClient::fixed("openai", REPLY));
        let orch = orchestrator(env_with_keys(), vec![openai.clone()]);

        let err = orch
            .generate(&request().with_provider("openai").with_model("gpt-99"))
            .await
            .unwrap_err();
        assert!(matches!(
            err.sole_failure(),
            Some(GenerationError::UnsupportedModel { model, .. }) if model == "gpt-99"
        ));
        assert_eq!(openai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_model_selection_per_candidate() {
        let deepseek = Arc::new(MockProviderClient::failing(
            "deepseek",
            ProviderError::from_status("deepseek", 403, "forbidden"),
        ));
        let openai = Arc::new(MockProviderClient::fixed("openai", REPLY));
        let defaults = DefaultSettings {
            model: Some("deepseek-coder".to_string()),
            ..fallback(&["openai"])
        };
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone(), openai.clone()]).with_defaults(defaults);

        let artifact = orch.generate(&request()).await.unwrap();
        assert_eq!(deepseek.calls()[0].model, "deepseek-coder");
        assert_eq!(openai.calls()[0].model, "gpt-3.5-turbo");
        assert_eq!(artifact.source_model, "gpt-3.5-turbo");
    }

    #[tokio::test]
    async fn test_candidates_are_deduplicated() {
        let orch = orchestrator(env_with_keys(), vec![]).with_defaults(fallback(&["OpenAI", "deepseek", "openai"]));
        let candidates = orch.candidates(&request().with_provider("openai").with_model("gpt-4o"));
        assert_eq!(
            candidates,
            vec![
                Candidate { provider: "openai".to_string(), model: Some("gpt-4o".to_string()) },
                Candidate { provider: "deepseek".to_string(), model: None },
            ]
        );
    }

    #[tokio::test]
    async fn test_extraction_failure_does_not_fall_back() {
        let deepseek = Arc::new(MockProviderClient::fixed("deepseek", "I cannot do that. Sorry."));
        let openai = Arc::new(MockProviderClient::fixed("openai", REPLY));
        let orch = orchestrator(env_with_keys(), vec![deepseek, openai.clone()]).with_defaults(fallback(&["openai"]));

        let err = orch.generate(&request()).await.unwrap_err();
        assert!(matches!(err, GenerationError::NoCodeBlockFound { ref provider, .. } if provider == "deepseek"));
        assert_eq!(openai.call_count(), 0);
    }

    #[tokio::test]
    async fn test_keyless_provider() {
        let ollama = Arc::new(MockProviderClient::fixed("ollama", REPLY));
        let orch = orchestrator(MapEnvironment::new(), vec![ollama.clone()]);

        let artifact = orch
            .generate(&request().with_provider("ollama").with_model("codellama:13b"))
            .await
            .unwrap();
        assert_eq!(artifact.source_model, "codellama:13b");
        assert!(!ollama.calls()[0].had_credential);
    }

    #[tokio::test(start_paused = true)]
    async fn test_attempt_timeout_is_transient() {
        let deepseek = Arc::new(
            MockProviderClient::scripted("deepseek", vec![MockReply::Hang]).repeating(MockReply::text(REPLY)),
        );
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone()])
            .with_retry(RetryPolicy::default().with_attempt_timeout(Duration::from_secs(5)));

        let generation = orch.generate_detailed(&request(), &CancellationToken::new()).await.unwrap();
        assert_eq!(generation.attempts.len(), 2);
        assert!(matches!(
            generation.attempts[0].outcome,
            AttemptOutcome::Failed(ProviderError::Timeout { .. })
        ));
    }

    #[tokio::test]
    async fn test_logs_name_the_source_but_never_the_key() {
        let deepseek = Arc::new(
            MockProviderClient::scripted("deepseek", vec![MockReply::status("deepseek", 503)])
                .repeating(MockReply::text(REPLY)),
        );
        let logger = Arc::new(RecordingLogger::new());
        let orch = orchestrator(env_with_keys(), vec![deepseek]).with_logger(logger.clone());

        orch.generate(&request()).await.unwrap();
        assert!(logger.contains("environment variable DEEPSEEK_API_KEY"));
        assert!(logger.contains("attempt 1/3 failed"));
        assert!(!logger.contains("ds-key"));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        let deepseek = Arc::new(MockProviderClient::fixed("deepseek", REPLY));
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone()]);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = orch.generate_detailed(&request(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(deepseek.call_count(), 0);
    }

    #[tokio::test]
    async fn test_cancel_aborts_in_flight_call() {
        let deepseek = Arc::new(MockProviderClient::new("deepseek").repeating(MockReply::Hang));
        let orch = orchestrator(env_with_keys(), vec![deepseek.clone()]);
        let cancel = CancellationToken::new();

        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(20)).await;
            trigger.cancel();
        });

        let err = orch.generate_detailed(&request(), &cancel).await.unwrap_err();
        assert!(err.is_cancelled());
        assert_eq!(deepseek.call_count(), 1);
    }
}
