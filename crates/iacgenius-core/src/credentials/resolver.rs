//! Ordered credential lookup

use std::sync::Arc;

use tracing::debug;

use super::{Credential, CredentialError, CredentialOrigin, CredentialResult};
use crate::env::Environment;
use crate::registry::{CredentialSource, ProviderDescriptor};
use crate::secrets::{provider_secret_key, SecretStore};

/// Provider-agnostic override consulted last
pub const GENERIC_API_KEY_VAR: &str = "IACGENIUS_API_KEY";

/// One step of the precedence chain
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LookupStrategy {
    /// `{PROVIDER}_API_KEY`
    ProviderEnvVar,
    /// `{provider}_api_key` in the secret store
    SecretStore,
    /// `IACGENIUS_API_KEY`
    GenericEnvVar,
}

impl LookupStrategy {
    /// The precedence order; first hit wins
    pub const DEFAULT_ORDER: [LookupStrategy; 3] = [
        LookupStrategy::ProviderEnvVar,
        LookupStrategy::SecretStore,
        LookupStrategy::GenericEnvVar,
    ];

    /// Environment variable holding a provider's key
    pub fn provider_env_var(provider: &str) -> String {
        format!("{}_API_KEY", provider.to_uppercase().replace('-', "_"))
    }

    fn describe(&self, provider: &str, store: Option<&dyn SecretStore>) -> String {
        match self {
            LookupStrategy::ProviderEnvVar => Self::provider_env_var(provider),
            LookupStrategy::SecretStore => match store {
                Some(s) => format!("{} store ({})", s.name(), provider_secret_key(provider)),
                None => "secret store (not configured)".to_string(),
            },
            LookupStrategy::GenericEnvVar => GENERIC_API_KEY_VAR.to_string(),
        }
    }

    fn lookup(
        &self,
        provider: &str,
        env: &dyn Environment,
        store: Option<&dyn SecretStore>,
    ) -> Option<(String, CredentialOrigin)> {
        match self {
            LookupStrategy::ProviderEnvVar => {
                let var = Self::provider_env_var(provider);
                env.var(&var).map(|v| (v, CredentialOrigin::ProviderEnvVar(var)))
            }
            LookupStrategy::SecretStore => {
                let store = store?;
                if !store.is_available() {
                    return None;
                }
                store
                    .get(&provider_secret_key(provider))
                    .filter(|v| !v.is_empty())
                    .map(|v| (v, CredentialOrigin::SecretStore(store.name().to_string())))
            }
            LookupStrategy::GenericEnvVar => env
                .var(GENERIC_API_KEY_VAR)
                .map(|v| (v, CredentialOrigin::GenericEnvVar(GENERIC_API_KEY_VAR.to_string()))),
        }
    }
}

/// Outcome of a successful resolution
#[derive(Debug, Clone)]
pub enum CredentialResolution {
    Key(Credential),
    /// The provider authenticates some other way (or not at all)
    NotRequired(CredentialSource),
}

impl CredentialResolution {
    pub fn credential(&self) -> Option<&Credential> {
        match self {
            CredentialResolution::Key(c) => Some(c),
            CredentialResolution::NotRequired(_) => None,
        }
    }

    /// Short description of where authentication comes from. Safe to log.
    pub fn describe_source(&self) -> String {
        match self {
            CredentialResolution::Key(c) => c.origin().to_string(),
            CredentialResolution::NotRequired(CredentialSource::Chain) => "ambient credential chain".to_string(),
            CredentialResolution::NotRequired(_) => "not required".to_string(),
        }
    }
}

/// Resolves provider credentials from the environment and a secret store
///
/// A pure function of (provider, environment, store contents).
pub struct CredentialResolver {
    env: Arc<dyn Environment>,
    store: Option<Arc<dyn SecretStore>>,
    strategies: Vec<LookupStrategy>,
}

impl CredentialResolver {
    pub fn new(env: Arc<dyn Environment>, store: Option<Arc<dyn SecretStore>>) -> Self {
        Self {
            env,
            store,
            strategies: LookupStrategy::DEFAULT_ORDER.to_vec(),
        }
    }

    /// Replace the lookup order (e.g. to drop the secret store step)
    pub fn with_strategies(mut self, strategies: Vec<LookupStrategy>) -> Self {
        self.strategies = strategies;
        self
    }

    pub fn strategies(&self) -> &[LookupStrategy] {
        &self.strategies
    }

    /// Resolve the credential for `descriptor`
    ///
    /// Fails with `NotFound` only for providers that need an API key.
    pub fn resolve(&self, descriptor: &ProviderDescriptor) -> CredentialResult<CredentialResolution> {
        if descriptor.credential_source != CredentialSource::ApiKey {
            return Ok(CredentialResolution::NotRequired(descriptor.credential_source));
        }

        let provider = descriptor.name.as_str();
        let store = self.store.as_deref();
        for strategy in &self.strategies {
            if let Some((secret, origin)) = strategy.lookup(provider, self.env.as_ref(), store) {
                debug!(provider, source = %origin, "resolved credential");
                return Ok(CredentialResolution::Key(Credential::new(provider, secret, origin)));
            }
        }

        Err(CredentialError::NotFound {
            provider: provider.to_string(),
            checked: self
                .strategies
                .iter()
                .map(|s| s.describe(provider, store))
                .collect(),
        })
    }
}

impl std::fmt::Debug for CredentialResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CredentialResolver")
            .field("store", &self.store.as_ref().map(|s| s.name().to_string()))
            .field("strategies", &self.strategies)
            .finish()
    }
}
