//! System keychain secret store
//!
//! - macOS: Keychain
//! - Windows: Credential Manager
//! - Linux: Secret Service (GNOME Keyring, KWallet)

use keyring::Entry;
use tracing::{debug, warn};

use super::traits::{SecretStore, SecretStoreError, SecretStoreResult};
use super::KEYCHAIN_SERVICE;

/// Secret store backed by the system keychain
///
/// Entries are namespaced by a service name (`iacgenius` by default) and
/// keyed by [`provider_secret_key`](super::provider_secret_key).
///
/// ```no_run
/// use iacgenius_core::secrets::{KeychainSecretStore, SecretStore};
///
/// let store = KeychainSecretStore::new();
/// store.store("deepseek_api_key", "sk-...").unwrap();
/// assert!(store.get("deepseek_api_key").is_some());
/// ```
#[derive(Debug, Clone)]
pub struct KeychainSecretStore {
    service_name: String,
}

impl KeychainSecretStore {
    pub fn new() -> Self {
        Self::with_service(KEYCHAIN_SERVICE)
    }

    pub fn with_service(service: impl Into<String>) -> Self {
        Self {
            service_name: service.into(),
        }
    }

    fn entry(&self, key: &str) -> SecretStoreResult<Entry> {
        Entry::new(&self.service_name, key)
            .map_err(|e| SecretStoreError::Other(format!("failed to open keychain entry: {}", e)))
    }
}

impl Default for KeychainSecretStore {
    fn default() -> Self {
        Self::new()
    }
}

impl SecretStore for KeychainSecretStore {
    fn name(&self) -> &str {
        "keychain"
    }

    fn is_available(&self) -> bool {
        match Entry::new(&self.service_name, "__iacgenius_availability_check__") {
            Ok(_) => true,
            Err(e) => {
                warn!(service = %self.service_name, error = %e, "keychain unavailable");
                false
            }
        }
    }

    fn get(&self, key: &str) -> Option<String> {
        let entry = match self.entry(key) {
            Ok(entry) => entry,
            Err(e) => {
                warn!(key, error = %e, "keychain lookup failed");
                return None;
            }
        };
        match entry.get_password() {
            Ok(secret) => Some(secret),
            Err(keyring::Error::NoEntry) => {
                debug!(key, "no keychain entry");
                None
            }
            Err(e) => {
                warn!(key, error = %e, "keychain read failed");
                None
            }
        }
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        let entry = self.entry(key)?;
        entry
            .set_password(value)
            .map_err(|e| SecretStoreError::Other(format!("failed to store in keychain: {}", e)))?;

        // Some backends only cache the write; read back through a fresh entry
        match self.entry(key)?.get_password() {
            Ok(stored) if stored == value => {
                debug!(key, service = %self.service_name, "stored secret in keychain");
                Ok(())
            }
            Ok(_) => Err(SecretStoreError::Other(
                "keychain verification failed: value mismatch".to_string(),
            )),
            Err(e) => Err(SecretStoreError::Other(format!(
                "keychain verification failed: {}",
                e
            ))),
        }
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        match self.entry(key)?.delete_credential() {
            Ok(()) | Err(keyring::Error::NoEntry) => Ok(()),
            Err(e) => Err(SecretStoreError::Other(format!(
                "failed to delete from keychain: {}",
                e
            ))),
        }
    }
}
