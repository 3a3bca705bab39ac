//! IaCGenius Core
//!
//! Turns a natural-language infrastructure description into an
//! Infrastructure-as-Code artifact by delegating to an LLM provider.
//!
//! ## Pipeline
//!
//! - `credentials`: which API key to use, from ordered sources
//! - `registry`: immutable provider catalog
//! - `prompt`: deterministic prompt construction per infrastructure type
//! - `providers`: one HTTP adapter per provider family
//! - `orchestrator`: candidate ordering, retry with backoff, fallback
//! - `extract`: pulls the fenced code out of the reply
//!
//! ```rust,ignore
//! use iacgenius_core::{GenerationOrchestrator, GenerationRequest, InfraType};
//!
//! let orchestrator = GenerationOrchestrator::from_config(&config, resolver, factory)?;
//! let request = GenerationRequest::new(InfraType::Terraform, "S3 bucket with versioning");
//! let artifact = orchestrator.generate(&request).await?;
//! println!("{}", artifact.code_body);
//! ```

pub mod types;
pub mod env;
pub mod secrets;
pub mod logging;
pub mod config;
pub mod credentials;
pub mod registry;
pub mod prompt;
pub mod providers;
pub mod extract;
pub mod error;
pub mod orchestrator;

// Re-export commonly used types
pub use types::{
    CancellationToken, CloudContext, GeneratedArtifact, GenerationOptions, GenerationRequest,
    InfraType, ProviderResponse, Revision,
};

pub use env::{Environment, MapEnvironment, ProcessEnvironment};

pub use secrets::{KeychainSecretStore, MemorySecretStore, SecretStore, SecretStoreError};

pub use logging::{Logger, NoOpLogger, SharedLogger, TracingLogger};

pub use config::{ConfigProvider, FileConfigProvider, GeneratorConfig, MemoryConfigProvider};

pub use credentials::{Credential, CredentialResolution, CredentialResolver};

pub use registry::{ProviderDescriptor, ProviderRegistry};

pub use prompt::{PromptBuilder, PromptSpec};

pub use providers::{ClientFactory, HttpClientFactory, ProviderClient, ProviderError};

pub use extract::{CodeBlock, ExtractionError, ResponseExtractor};

pub use error::{CandidateFailure, GenerationError, GenerationResult};

pub use orchestrator::{AttemptOutcome, AttemptRecord, Generation, GenerationOrchestrator, RetryPolicy};
