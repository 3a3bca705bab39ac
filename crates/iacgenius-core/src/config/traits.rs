//! Configuration provider trait

use async_trait::async_trait;

use super::model::GeneratorConfig;

/// Source of the generator configuration
///
/// Implementations:
/// - `FileConfigProvider`: user-level YAML file
/// - `MemoryConfigProvider`: in-memory for tests
#[async_trait]
pub trait ConfigProvider: Send + Sync {
    /// Load the stored configuration; a missing source yields the defaults
    async fn load(&self) -> ConfigResult<GeneratorConfig>;

    /// Replace the stored configuration
    async fn save(&self, config: &GeneratorConfig) -> ConfigResult<()>;
}

/// Errors that can occur during configuration operations
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid value for {key}: {message}")]
    InvalidValue { key: String, message: String },

    #[error("Configuration error: {0}")]
    Other(String),
}

impl ConfigError {
    pub fn invalid_value(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            key: key.into(),
            message: message.into(),
        }
    }
}

pub type ConfigResult<T> = Result<T, ConfigError>;
