//! In-memory configuration provider

use async_trait::async_trait;
use parking_lot::RwLock;

use super::model::GeneratorConfig;
use super::traits::{ConfigProvider, ConfigResult};

/// In-memory configuration provider for tests
#[derive(Debug, Default)]
pub struct MemoryConfigProvider {
    config: RwLock<GeneratorConfig>,
}

impl MemoryConfigProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: GeneratorConfig) -> Self {
        Self {
            config: RwLock::new(config),
        }
    }
}

#[async_trait]
impl ConfigProvider for MemoryConfigProvider {
    async fn load(&self) -> ConfigResult<GeneratorConfig> {
        Ok(self.config.read().clone())
    }

    async fn save(&self, config: &GeneratorConfig) -> ConfigResult<()> {
        *self.config.write() = config.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_memory_config_round_trip() {
        let provider = MemoryConfigProvider::new();
        assert_eq!(provider.load().await.unwrap(), GeneratorConfig::default());

        let mut config = GeneratorConfig::default();
        config.defaults.provider = Some("anthropic".to_string());
        provider.save(&config).await.unwrap();

        assert_eq!(provider.load().await.unwrap().defaults.provider.as_deref(), Some("anthropic"));
    }
}
