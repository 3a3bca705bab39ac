//! Secure storage for provider API keys
//!
//! - `SecretStore` trait for implementing stores
//! - `KeychainSecretStore` backed by the OS keychain (the default)
//! - `MemorySecretStore` for tests and ephemeral use

mod traits;
mod memory_store;
mod keychain_store;

pub use traits::{SecretStore, SecretInfo, SecretStoreError, SecretStoreResult};
pub use memory_store::MemorySecretStore;
pub use keychain_store::KeychainSecretStore;

/// Keychain service name under which API keys are stored
pub const KEYCHAIN_SERVICE: &str = "iacgenius";

/// Map a provider name to its secret store key
///
/// `"deepseek"` becomes `"deepseek_api_key"`.
pub fn provider_secret_key(provider: &str) -> String {
    format!("{}_api_key", provider.to_lowercase())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_provider_secret_key() {
        assert_eq!(provider_secret_key("deepseek"), "deepseek_api_key");
        assert_eq!(provider_secret_key("OpenAI"), "openai_api_key");
    }
}
