//! Key command - Store or remove a provider API key in the system keychain.

use std::sync::Arc;

use anyhow::{bail, Context, Result};
use clap::{Args, Subcommand};
use tracing::info;

use iacgenius_core::credentials::CredentialOrigin;
use iacgenius_core::secrets::provider_secret_key;
use iacgenius_core::{
    ClientFactory, Credential, Environment, GenerationError, KeychainSecretStore, ProcessEnvironment,
    ProviderRegistry, SecretStore,
};

use super::{client_factory, prompts, GlobalArgs};

/// Fallback source for the secret when `--value` is not given
const SECRET_INPUT_VAR: &str = "IACGENIUS_SECRET_INPUT";

#[derive(Args)]
pub struct KeyArgs {
    #[command(subcommand)]
    action: KeyAction,
}

#[derive(Subcommand)]
enum KeyAction {
    /// Store the API key for a provider
    Set {
        provider: String,

        /// The key itself; prompted for without echo when omitted in a terminal
        #[arg(long, env = SECRET_INPUT_VAR, hide_env_values = true)]
        value: Option<String>,

        /// Check the key against the provider's API before storing it
        #[arg(long)]
        verify: bool,
    },

    /// Remove the stored API key for a provider
    Delete { provider: String },
}

pub async fn execute(global: &GlobalArgs, args: KeyArgs) -> Result<()> {
    let store = KeychainSecretStore::new();
    if !store.is_available() {
        bail!("The system keychain is not available; set {{PROVIDER}}_API_KEY instead");
    }

    match args.action {
        KeyAction::Set { provider, value, verify } => {
            let config = global.load_config().await?;
            let registry = ProviderRegistry::from_config(&config).map_err(GenerationError::from)?;
            let descriptor = registry.describe(&provider).map_err(GenerationError::from)?;
            if !descriptor.requires_credential() {
                bail!("{} does not use an API key", descriptor.name);
            }

            let value = match value {
                Some(v) if !v.trim().is_empty() => v,
                _ if prompts::interactive() => prompts::api_key(&descriptor.name)?,
                _ => bail!("No key given: pass --value or set {}", SECRET_INPUT_VAR),
            };
            let value = value.trim();

            if verify {
                let env: Arc<dyn Environment> = Arc::new(ProcessEnvironment);
                let client = client_factory(env)?.create(descriptor);
                let credential = Credential::new(
                    &descriptor.name,
                    value,
                    CredentialOrigin::SecretStore(store.name().to_string()),
                );
                client
                    .validate(Some(&credential))
                    .await
                    .with_context(|| format!("{} did not accept the key; nothing was stored", descriptor.name))?;
                println!("{} accepted the key", descriptor.name);
            }

            store.store(&provider_secret_key(&descriptor.name), value)?;
            info!(provider = %descriptor.name, "Stored API key in {}", store.name());
            println!("Stored API key for {}", descriptor.name);
        }
        KeyAction::Delete { provider } => {
            let registry = ProviderRegistry::builtin();
            let descriptor = registry.describe(&provider).map_err(GenerationError::from)?;
            store.delete(&provider_secret_key(&descriptor.name))?;
            println!("Removed API key for {}", descriptor.name);
        }
    }
    Ok(())
}
