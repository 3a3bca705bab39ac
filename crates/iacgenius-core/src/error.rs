//! Top-level generation errors

use std::fmt;

use thiserror::Error;

use crate::config::ConfigError;
use crate::credentials::CredentialError;
use crate::extract::ExtractionError;
use crate::providers::ProviderError;
use crate::registry::RegistryError;

/// Everything `generate` can fail with
#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("no credential found for {provider} (checked {})", checked.join(", "))]
    CredentialNotFound { provider: String, checked: Vec<String> },

    #[error("unknown provider: {name}")]
    UnknownProvider { name: String },

    #[error("model '{model}' is not supported by {provider}")]
    UnsupportedModel { provider: String, model: String },

    /// Still failing transiently when the retry budget ran out
    #[error("{source} (gave up after {attempts} attempts)")]
    TransientProvider {
        provider: String,
        attempts: u32,
        #[source]
        source: ProviderError,
    },

    #[error("{source}")]
    NonTransientProvider {
        provider: String,
        #[source]
        source: ProviderError,
    },

    #[error("all providers failed:\n{}", format_failures(failures))]
    AllProvidersExhausted { failures: Vec<CandidateFailure> },

    #[error("no code block found in the response from {provider} ({model})")]
    NoCodeBlockFound { provider: String, model: String },

    #[error("could not extract code from the {provider} ({model}) response: {source}")]
    Extraction {
        provider: String,
        model: String,
        #[source]
        source: ExtractionError,
    },

    #[error("generation cancelled")]
    Cancelled,

    #[error(transparent)]
    Config(#[from] ConfigError),
}

pub type GenerationResult<T> = Result<T, GenerationError>;

impl GenerationError {
    /// The single underlying failure when exactly one candidate was tried
    ///
    /// Lets callers report "missing credential" rather than "all providers
    /// failed" when there was nothing to fall back to.
    pub fn sole_failure(&self) -> Option<&GenerationError> {
        match self {
            GenerationError::AllProvidersExhausted { failures } if failures.len() == 1 => {
                failures.first().map(|f| f.reason.as_ref())
            }
            _ => None,
        }
    }

    pub fn is_cancelled(&self) -> bool {
        matches!(self, GenerationError::Cancelled)
    }
}

impl From<RegistryError> for GenerationError {
    fn from(err: RegistryError) -> Self {
        match err {
            RegistryError::UnknownProvider { name } => GenerationError::UnknownProvider { name },
            RegistryError::UnsupportedModel { provider, model } => {
                GenerationError::UnsupportedModel { provider, model }
            }
        }
    }
}

impl From<CredentialError> for GenerationError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::NotFound { provider, checked } => {
                GenerationError::CredentialNotFound { provider, checked }
            }
        }
    }
}

/// Why one candidate provider was abandoned
#[derive(Debug)]
pub struct CandidateFailure {
    pub provider: String,
    /// `None` when the failure happened before a model was chosen
    pub model: Option<String>,
    /// Network attempts made; zero when skipped before any call
    pub attempts: u32,
    pub reason: Box<GenerationError>,
}

impl CandidateFailure {
    pub fn new(provider: impl Into<String>, model: Option<String>, attempts: u32, reason: GenerationError) -> Self {
        Self {
            provider: provider.into(),
            model,
            attempts,
            reason: Box::new(reason),
        }
    }
}

impl fmt::Display for CandidateFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.model {
            Some(model) => write!(f, "{} ({}): {}", self.provider, model, self.reason),
            None => write!(f, "{}: {}", self.provider, self.reason),
        }
    }
}

fn format_failures(failures: &[CandidateFailure]) -> String {
    failures
        .iter()
        .enumerate()
        .map(|(i, failure)| format!("  {}. {}", i + 1, failure))
        .collect::<Vec<_>>()
        .join("\n")
}
