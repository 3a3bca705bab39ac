//! Secret store trait and error types

use thiserror::Error;

/// Whether a secret exists and which store holds it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SecretInfo {
    pub available: bool,
    pub source: String,
}

impl SecretInfo {
    pub fn new(available: bool, source: impl Into<String>) -> Self {
        Self {
            available,
            source: source.into(),
        }
    }

    pub fn not_found() -> Self {
        Self::new(false, "none")
    }
}

/// Errors that can occur during secret store operations
#[derive(Error, Debug)]
pub enum SecretStoreError {
    #[error("Store is read-only")]
    ReadOnly,

    #[error("Store not available: {0}")]
    NotAvailable(String),

    #[error("Store error: {0}")]
    Other(String),
}

pub type SecretStoreResult<T> = Result<T, SecretStoreError>;

/// Persistent storage for provider secrets
///
/// The generation pipeline only ever reads from a store; writes come from
/// the CLI's `key set` / `key delete` commands.
///
/// # Example
///
/// ```
/// use iacgenius_core::secrets::{SecretStore, MemorySecretStore, provider_secret_key};
///
/// let store = MemorySecretStore::new();
/// store.store(&provider_secret_key("deepseek"), "sk-test").unwrap();
/// assert!(store.has("deepseek_api_key"));
/// ```
pub trait SecretStore: Send + Sync {
    /// Human-readable name of this store
    fn name(&self) -> &str;

    /// Whether the backing service can be reached
    ///
    /// A keychain store is typically unavailable on a headless server.
    fn is_available(&self) -> bool {
        true
    }

    fn get(&self, key: &str) -> Option<String>;

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()>;

    /// Delete a secret. Deleting a missing key is not an error.
    fn delete(&self, key: &str) -> SecretStoreResult<()>;

    fn has(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    fn get_info(&self, key: &str) -> SecretInfo {
        if self.has(key) {
            SecretInfo::new(true, self.name())
        } else {
            SecretInfo::not_found()
        }
    }
}
