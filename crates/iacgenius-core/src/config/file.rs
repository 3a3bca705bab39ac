//! File-based configuration provider (YAML)
//!
//! The user-level file lives at `<config_dir>/iacgenius/config.yaml`.

use std::fs;
use std::path::{Path, PathBuf};

use async_trait::async_trait;
use parking_lot::RwLock;
use tracing::debug;

use super::model::GeneratorConfig;
use super::traits::{ConfigProvider, ConfigResult};

/// File-based configuration provider
///
/// Reads are cached; `save` updates both the file and the cache.
///
/// ```no_run
/// use iacgenius_core::config::FileConfigProvider;
///
/// let provider = FileConfigProvider::user();
/// println!("config at {}", provider.path().display());
/// ```
pub struct FileConfigProvider {
    path: PathBuf,
    cache: RwLock<Option<GeneratorConfig>>,
}

impl FileConfigProvider {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            cache: RwLock::new(None),
        }
    }

    /// User-level config (~/.config/iacgenius/config.yaml on Linux)
    pub fn user() -> Self {
        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| dirs::home_dir().unwrap_or_else(|| PathBuf::from(".")).join(".config"));
        Self::new(config_dir.join("iacgenius").join("config.yaml"))
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    fn read_file(&self) -> ConfigResult<GeneratorConfig> {
        if !self.path.exists() {
            debug!(path = %self.path.display(), "no config file, using defaults");
            return Ok(GeneratorConfig::default());
        }
        let content = fs::read_to_string(&self.path)?;
        let config = GeneratorConfig::from_yaml(&content)?;
        debug!(path = %self.path.display(), "loaded config");
        Ok(config)
    }

    /// Drop the cache and re-read the file
    pub fn reload(&self) -> ConfigResult<GeneratorConfig> {
        let config = self.read_file()?;
        *self.cache.write() = Some(config.clone());
        Ok(config)
    }
}

impl std::fmt::Debug for FileConfigProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FileConfigProvider")
            .field("path", &self.path)
            .field("exists", &self.exists())
            .finish()
    }
}

#[async_trait]
impl ConfigProvider for FileConfigProvider {
    async fn load(&self) -> ConfigResult<GeneratorConfig> {
        if let Some(config) = self.cache.read().as_ref() {
            return Ok(config.clone());
        }
        self.reload()
    }

    async fn save(&self, config: &GeneratorConfig) -> ConfigResult<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, config.to_yaml()?)?;
        *self.cache.write() = Some(config.clone());
        Ok(())
    }
}
