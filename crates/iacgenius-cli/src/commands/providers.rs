//! Providers command - List providers, models and credential status.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde_json::json;

use iacgenius_core::{
    ClientFactory, CredentialResolution, Environment, GenerationError, ProcessEnvironment, ProviderDescriptor,
    ProviderRegistry,
};

use super::{client_factory, credential_resolver, GlobalArgs};

#[derive(Args)]
pub struct ProvidersArgs {
    /// Print JSON instead of a table
    #[arg(long)]
    json: bool,

    /// Ask each provider with usable credentials for its current model list
    #[arg(long)]
    live: bool,
}

/// Result of asking a provider for its models
enum LiveModels {
    Skipped,
    Listed(Vec<String>),
    Failed(String),
}

impl LiveModels {
    fn describe(&self) -> String {
        match self {
            LiveModels::Skipped => "skipped (no credential)".to_string(),
            LiveModels::Listed(models) if models.is_empty() => "none reported".to_string(),
            LiveModels::Listed(models) => models.join(", "),
            LiveModels::Failed(err) => format!("unavailable: {}", err),
        }
    }
}

async fn live_models(
    factory: &dyn ClientFactory,
    descriptor: &ProviderDescriptor,
    resolution: Option<&CredentialResolution>,
) -> LiveModels {
    let Some(resolution) = resolution else {
        return LiveModels::Skipped;
    };
    let client = factory.create(descriptor);
    match client.list_models(resolution.credential()).await {
        Ok(models) => LiveModels::Listed(models),
        Err(err) => LiveModels::Failed(err.to_string()),
    }
}

pub async fn execute(global: &GlobalArgs, args: ProvidersArgs) -> Result<()> {
    let config = global.load_config().await?;
    let registry = ProviderRegistry::from_config(&config).map_err(GenerationError::from)?;
    let env: Arc<dyn Environment> = Arc::new(ProcessEnvironment);
    let resolver = credential_resolver(env.clone());
    let factory = if args.live { Some(client_factory(env)?) } else { None };

    let mut rows = Vec::new();
    for descriptor in registry.list() {
        let resolution = resolver.resolve(descriptor).ok();
        // Only where the credential comes from, never its value
        let credential = resolution
            .as_ref()
            .map(|r| r.describe_source())
            .unwrap_or_else(|| "missing".to_string());
        let live = match &factory {
            Some(factory) => Some(live_models(factory, descriptor, resolution.as_ref()).await),
            None => None,
        };
        rows.push((descriptor, credential, live));
    }

    if args.json {
        let providers: Vec<_> = rows
            .iter()
            .map(|(d, credential, live)| {
                let (live_models, live_error) = match live {
                    Some(LiveModels::Listed(models)) => (Some(models.clone()), None),
                    Some(LiveModels::Failed(err)) => (None, Some(err.clone())),
                    Some(LiveModels::Skipped) | None => (None, None),
                };
                json!({
                    "name": d.name,
                    "display_name": d.display_name,
                    "base_url": d.base_url,
                    "models": d.supported_models,
                    "default_model": d.default_model,
                    "credential": credential,
                    "default": d.name == registry.default_provider(),
                    "live_models": live_models,
                    "live_error": live_error,
                })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&providers)?);
        return Ok(());
    }

    for (descriptor, credential, live) in &rows {
        let marker = if descriptor.name == registry.default_provider() { "*" } else { " " };
        println!("{} {} ({})", marker, descriptor.name, descriptor.display_name);
        println!("    endpoint:   {}", descriptor.base_url);
        println!("    default:    {}", descriptor.default_model);
        println!("    models:     {}", descriptor.supported_models.join(", "));
        println!("    credential: {}", credential);
        if let Some(live) = live {
            println!("    live:       {}", live.describe());
        }
    }
    if !config.defaults.fallback_chain.is_empty() {
        println!();
        println!("Fallback chain: {}", config.defaults.fallback_chain.join(" -> "));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    use iacgenius_core::providers::{MockClientFactory, MockProviderClient};
    use iacgenius_core::{CredentialResolver, MapEnvironment, ProviderError};

    #[tokio::test]
    async fn test_live_models() {
        let registry = ProviderRegistry::builtin();
        let factory = MockClientFactory::new()
            .with_client(Arc::new(
                MockProviderClient::new("ollama").with_models(Ok(vec!["llama3:latest".to_string()])),
            ))
            .with_client(Arc::new(MockProviderClient::new("openai").with_models(Err(
                ProviderError::from_status("openai", 401, "bad key"),
            ))));
        let resolver = CredentialResolver::new(
            Arc::new(MapEnvironment::new().with_var("OPENAI_API_KEY", "sk")),
            None,
        );

        let ollama = registry.describe("ollama").unwrap();
        let resolution = resolver.resolve(ollama).ok();
        let live = live_models(&factory, ollama, resolution.as_ref()).await;
        assert_eq!(live.describe(), "llama3:latest");

        let openai = registry.describe("openai").unwrap();
        let resolution = resolver.resolve(openai).ok();
        let live = live_models(&factory, openai, resolution.as_ref()).await;
        assert!(live.describe().starts_with("unavailable:"));

        let anthropic = registry.describe("anthropic").unwrap();
        let resolution = resolver.resolve(anthropic).ok();
        assert!(matches!(
            live_models(&factory, anthropic, resolution.as_ref()).await,
            LiveModels::Skipped
        ));
    }
}
