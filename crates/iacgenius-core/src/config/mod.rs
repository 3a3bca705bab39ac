//! Generator configuration
//!
//! - `GeneratorConfig`: defaults, fallback chain, retry policy and
//!   per-provider overrides
//! - `FileConfigProvider`: YAML file (~/.config/iacgenius/config.yaml)
//! - `MemoryConfigProvider`: in-memory for tests
//!
//! Configuration never holds secrets.

mod traits;
mod model;
mod memory;
mod file;

pub use traits::{ConfigProvider, ConfigError, ConfigResult};
pub use model::{
    parse_provider_list, DefaultSettings, GeneratorConfig, ProviderOverride, RetrySettings,
    ENV_FALLBACK, ENV_MODEL, ENV_PROVIDER, ENV_TIMEOUT_SECS,
};
pub use memory::MemoryConfigProvider;
pub use file::FileConfigProvider;
