//! In-memory secret store

use std::collections::HashMap;

use parking_lot::RwLock;

use super::traits::{SecretStore, SecretStoreResult};

/// In-memory secret store for tests and ephemeral use
///
/// Secrets are lost when the store is dropped.
#[derive(Debug, Default)]
pub struct MemorySecretStore {
    secrets: RwLock<HashMap<String, String>>,
}

impl MemorySecretStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with `(key, value)` pairs
    pub fn with_secrets<K, V>(initial: impl IntoIterator<Item = (K, V)>) -> Self
    where
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            secrets: RwLock::new(
                initial
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    pub fn len(&self) -> usize {
        self.secrets.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl SecretStore for MemorySecretStore {
    fn name(&self) -> &str {
        "memory"
    }

    fn get(&self, key: &str) -> Option<String> {
        self.secrets.read().get(key).cloned()
    }

    fn store(&self, key: &str, value: &str) -> SecretStoreResult<()> {
        self.secrets.write().insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn delete(&self, key: &str) -> SecretStoreResult<()> {
        self.secrets.write().remove(key);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_memory_store_crud() {
        let store = MemorySecretStore::new();
        assert!(store.is_empty());
        assert_eq!(store.get("openai_api_key"), None);

        store.store("openai_api_key", "sk-1").unwrap();
        assert_eq!(store.get("openai_api_key"), Some("sk-1".to_string()));

        // Overwrite
        store.store("openai_api_key", "sk-2").unwrap();
        assert_eq!(store.get("openai_api_key"), Some("sk-2".to_string()));
        assert_eq!(store.len(), 1);

        store.delete("openai_api_key").unwrap();
        assert!(!store.has("openai_api_key"));

        // Deleting again is fine
        store.delete("openai_api_key").unwrap();
    }

    #[test]
    fn test_memory_store_with_secrets() {
        let store = MemorySecretStore::with_secrets([
            ("deepseek_api_key", "ds"),
            ("openai_api_key", "oa"),
        ]);

        assert_eq!(store.len(), 2);
        assert_eq!(store.get("deepseek_api_key"), Some("ds".to_string()));
    }

    #[test]
    fn test_memory_store_get_info() {
        let store = MemorySecretStore::with_secrets([("present", "v")]);

        let info = store.get_info("present");
        assert!(info.available);
        assert_eq!(info.source, "memory");
        assert!(!store.get_info("absent").available);
    }

    #[test]
    fn test_memory_store_thread_safety() {
        use std::sync::Arc;
        use std::thread;

        let store = Arc::new(MemorySecretStore::new());
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let store = Arc::clone(&store);
                thread::spawn(move || {
                    let key = format!("provider{}_api_key", i);
                    store.store(&key, "secret").unwrap();
                    assert!(store.has(&key));
                })
            })
            .collect();

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.len(), 8);
    }
}
