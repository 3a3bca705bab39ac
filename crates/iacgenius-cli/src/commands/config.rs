//! Config command - Show or change default settings.

use anyhow::Result;
use clap::{Args, Subcommand};
use tracing::info;

use iacgenius_core::config::{parse_provider_list, ConfigProvider};
use iacgenius_core::{GenerationError, ProviderRegistry};

use super::GlobalArgs;

#[derive(Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    action: ConfigAction,
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective configuration (file plus environment overrides)
    Get,

    /// Change the stored defaults
    Set {
        /// Default provider
        #[arg(long)]
        provider: Option<String>,

        /// Default model for the default provider
        #[arg(long)]
        model: Option<String>,

        /// Comma-separated fallback providers; an empty string clears the chain
        #[arg(long)]
        fallback: Option<String>,
    },
}

pub async fn execute(global: &GlobalArgs, args: ConfigArgs) -> Result<()> {
    match args.action {
        ConfigAction::Get => {
            let config = global.load_config().await?;
            print!("{}", config.to_yaml()?);
            Ok(())
        }
        ConfigAction::Set { provider, model, fallback } => {
            if provider.is_none() && model.is_none() && fallback.is_none() {
                anyhow::bail!("Nothing to set: pass --provider, --model or --fallback");
            }

            let store = global.config_provider();
            // Stored values only, so environment overrides are not persisted
            let mut config = store.load().await?;
            if let Some(provider) = provider {
                let provider = provider.trim().to_lowercase();
                if model.is_none() && config.defaults.provider.as_deref() != Some(provider.as_str()) {
                    config.defaults.model = None;
                }
                config.defaults.provider = Some(provider);
            }
            if let Some(model) = model {
                config.defaults.model = Some(model.trim().to_string());
            }
            if let Some(fallback) = fallback {
                config.defaults.fallback_chain = parse_provider_list(&fallback);
            }

            config.validate()?;
            let registry = ProviderRegistry::from_config(&config).map_err(GenerationError::from)?;
            for name in &config.defaults.fallback_chain {
                registry.describe(name).map_err(GenerationError::from)?;
            }
            if let Some(model) = &config.defaults.model {
                registry
                    .resolve_model(registry.default_provider(), Some(model))
                    .map_err(GenerationError::from)?;
            }

            store.save(&config).await?;
            info!("Saved configuration to {}", store.path().display());
            println!("Configuration saved to {}", store.path().display());
            Ok(())
        }
    }
}
