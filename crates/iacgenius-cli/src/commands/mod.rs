//! CLI command definitions.
//!
//! Each subcommand maps to one operation of the generation pipeline or to
//! the configuration and key storage around it.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use tracing::debug;

use iacgenius_core::config::{ConfigProvider, FileConfigProvider, GeneratorConfig};
use iacgenius_core::{
    CredentialResolver, Environment, GenerationOrchestrator, HttpClientFactory, KeychainSecretStore,
    ProcessEnvironment, SecretStore, TracingLogger,
};

pub mod config;
pub mod generate;
pub mod key;
mod prompts;
pub mod providers;
pub mod revise;
pub mod types;

/// IaCGenius - generate Infrastructure-as-Code with LLMs
#[derive(Parser)]
#[command(name = "iacgenius")]
#[command(version, about = "Generate Infrastructure-as-Code from a plain-language description")]
#[command(long_about = r#"
IaCGenius turns a plain-language description into Terraform, CloudFormation,
Kubernetes, Helm, Dockerfile, CI/CD, OPA or Azure ARM code using a
configurable LLM provider, with retry and fallback across providers.

CREDENTIALS (first match wins):
  {PROVIDER}_API_KEY      e.g. DEEPSEEK_API_KEY
  system keychain         set with `iacgenius key set <provider>`
  IACGENIUS_API_KEY       applies to every provider

EXIT CODES:
  0   - Success
  1   - General error
  2   - Invalid arguments, unknown provider or model
  3   - No credential for the provider
  4   - Every provider failed
  5   - No usable code in the response
  130 - Cancelled
"#)]
#[command(propagate_version = true)]
pub struct Cli {
    #[command(flatten)]
    pub global: GlobalArgs,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Args, Debug, Clone)]
pub struct GlobalArgs {
    /// Configuration file (defaults to the user config directory)
    #[arg(long, global = true, env = "IACGENIUS_CONFIG")]
    pub config: Option<PathBuf>,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Generate code from a description
    Generate(generate::GenerateArgs),

    /// Regenerate existing code with requested changes
    Revise(revise::ReviseArgs),

    /// List providers, their models and credential status
    Providers(providers::ProvidersArgs),

    /// List supported infrastructure types
    Types,

    /// Show or change default settings
    Config(config::ConfigArgs),

    /// Store or remove a provider API key in the system keychain
    Key(key::KeyArgs),
}

impl GlobalArgs {
    pub fn config_provider(&self) -> FileConfigProvider {
        match &self.config {
            Some(path) => FileConfigProvider::new(path),
            None => FileConfigProvider::user(),
        }
    }

    /// Stored configuration with environment overrides applied
    pub async fn load_config(&self) -> Result<GeneratorConfig> {
        let provider = self.config_provider();
        debug!(path = %provider.path().display(), "Loading configuration");
        let mut config = provider
            .load()
            .await
            .with_context(|| format!("Failed to load {}", provider.path().display()))?;
        config.apply_env(&ProcessEnvironment)?;
        config.validate()?;
        Ok(config)
    }
}

/// Resolver over the process environment and the system keychain
pub fn credential_resolver(env: Arc<dyn Environment>) -> CredentialResolver {
    let store: Arc<dyn SecretStore> = Arc::new(KeychainSecretStore::new());
    CredentialResolver::new(env, Some(store))
}

/// HTTP clients for the real provider APIs
pub fn client_factory(env: Arc<dyn Environment>) -> Result<HttpClientFactory> {
    Ok(HttpClientFactory::new(env, Arc::new(TracingLogger::new("iacgenius::provider")))?)
}

/// Production orchestrator for `config`
pub fn build_orchestrator(config: &GeneratorConfig) -> Result<GenerationOrchestrator> {
    let env: Arc<dyn Environment> = Arc::new(ProcessEnvironment);
    let factory = client_factory(env.clone())?;
    let orchestrator = GenerationOrchestrator::from_config(config, credential_resolver(env), Arc::new(factory))?
        .with_logger(Arc::new(TracingLogger::new("iacgenius::orchestrator")));
    Ok(orchestrator)
}
