//! Interactive prompts for values missing from the command line.

use std::io::IsTerminal;

use anyhow::{bail, Result};
use dialoguer::{theme::ColorfulTheme, Input, Password, Select};

use iacgenius_core::InfraType;

/// Prompts only make sense when a person is at both ends
pub fn interactive() -> bool {
    std::io::stdin().is_terminal() && std::io::stderr().is_terminal()
}

pub fn description() -> Result<String> {
    let description: String = Input::with_theme(&ColorfulTheme::default())
        .with_prompt("Describe the infrastructure to generate")
        .validate_with(|input: &String| -> Result<(), &str> {
            if input.trim().is_empty() {
                Err("Description must not be empty")
            } else {
                Ok(())
            }
        })
        .interact_text()?;
    Ok(description)
}

pub fn infra_type() -> Result<InfraType> {
    let items: Vec<&str> = InfraType::ALL.iter().map(|t| t.display_name()).collect();
    let selection = Select::with_theme(&ColorfulTheme::default())
        .with_prompt("Infrastructure type")
        .items(&items)
        .default(0)
        .interact()?;
    Ok(InfraType::ALL[selection])
}

/// Read an API key without echoing it
pub fn api_key(provider: &str) -> Result<String> {
    let key = Password::with_theme(&ColorfulTheme::default())
        .with_prompt(format!("API key for {}", provider))
        .interact()?;
    if key.trim().is_empty() {
        bail!("API key cannot be empty");
    }
    Ok(key)
}
