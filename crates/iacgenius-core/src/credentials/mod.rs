//! Credential resolution
//!
//! Works out which API key to use for a provider from ordered sources:
//!
//! 1. `{PROVIDER}_API_KEY` environment variable
//! 2. The secure secret store (`{provider}_api_key`)
//! 3. `IACGENIUS_API_KEY`, a provider-agnostic override
//!
//! Providers that authenticate through an ambient chain (Bedrock) or need
//! no credential (Ollama) skip all three. Results are never cached: each
//! call reflects the environment and store as they are at that moment.

mod aws;
mod resolver;

use std::fmt;

use secrecy::{ExposeSecret, SecretString};
use thiserror::Error;

pub use aws::{AwsCredentials, aws_region};
pub use resolver::{CredentialResolution, CredentialResolver, LookupStrategy, GENERIC_API_KEY_VAR};

/// Where a credential came from. Safe to log.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CredentialOrigin {
    ProviderEnvVar(String),
    SecretStore(String),
    GenericEnvVar(String),
}

impl fmt::Display for CredentialOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CredentialOrigin::ProviderEnvVar(var) => write!(f, "environment variable {}", var),
            CredentialOrigin::SecretStore(store) => write!(f, "{} secret store", store),
            CredentialOrigin::GenericEnvVar(var) => write!(f, "environment variable {}", var),
        }
    }
}

/// A secret bound to one provider
///
/// The value is held in a [`SecretString`]: it is zeroized on drop, `Debug`
/// redacts it and there is no `Display`. Use [`expose`] only when building
/// the request.
///
/// [`expose`]: Credential::expose
#[derive(Clone)]
pub struct Credential {
    provider: String,
    secret: SecretString,
    origin: CredentialOrigin,
}

impl Credential {
    pub fn new(provider: impl Into<String>, secret: impl Into<String>, origin: CredentialOrigin) -> Self {
        Self {
            provider: provider.into(),
            secret: SecretString::from(secret.into()),
            origin,
        }
    }

    pub fn provider(&self) -> &str {
        &self.provider
    }

    pub fn origin(&self) -> &CredentialOrigin {
        &self.origin
    }

    pub fn expose(&self) -> &str {
        self.secret.expose_secret()
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("provider", &self.provider)
            .field("secret", &self.secret)
            .field("origin", &self.origin)
            .finish()
    }
}

/// Credential resolution failures
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CredentialError {
    #[error("no credential found for {provider} (checked {})", checked.join(", "))]
    NotFound { provider: String, checked: Vec<String> },
}

pub type CredentialResult<T> = Result<T, CredentialError>;
