//! IaCGenius CLI - Main entry point.
//!
//! Exit codes:
//! - 0: Success
//! - 1: General error
//! - 2: Invalid arguments, unknown provider or model
//! - 3: No credential for the provider
//! - 4: Every provider failed
//! - 5: No usable code in the response
//! - 130: Cancelled

use std::process::ExitCode;

use clap::Parser;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use iacgenius_core::GenerationError;

mod commands;

use commands::{Cli, Commands};

/// CI-friendly exit codes
pub struct ExitCodes;

impl ExitCodes {
    pub const SUCCESS: u8 = 0;
    pub const GENERAL_ERROR: u8 = 1;
    pub const INVALID_ARGS: u8 = 2;
    pub const MISSING_CREDENTIALS: u8 = 3;
    pub const PROVIDERS_EXHAUSTED: u8 = 4;
    pub const EXTRACTION_FAILURE: u8 = 5;
    pub const CANCELLED: u8 = 130;
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "iacgenius=debug" } else { "iacgenius=info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(format!("{},warn", default_level)));
    let log_result = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();

    if log_result.is_err() {
        // Logging already initialized, continue
    }

    let result = match cli.command {
        Commands::Generate(args) => commands::generate::execute(&cli.global, args).await,
        Commands::Revise(args) => commands::revise::execute(&cli.global, args).await,
        Commands::Providers(args) => commands::providers::execute(&cli.global, args).await,
        Commands::Types => commands::types::execute(),
        Commands::Config(args) => commands::config::execute(&cli.global, args).await,
        Commands::Key(args) => commands::key::execute(&cli.global, args).await,
    };

    match result {
        Ok(()) => ExitCode::from(ExitCodes::SUCCESS),
        Err(e) => {
            let exit_code = categorize_error(&e);
            eprintln!("Error: {:#}", e);
            ExitCode::from(exit_code)
        }
    }
}

/// Map an error to its exit code
fn categorize_error(e: &anyhow::Error) -> u8 {
    if let Some(err) = e.downcast_ref::<GenerationError>() {
        return generation_exit_code(err);
    }
    if e.downcast_ref::<iacgenius_core::types::UnknownInfraType>().is_some() {
        return ExitCodes::INVALID_ARGS;
    }
    ExitCodes::GENERAL_ERROR
}

fn generation_exit_code(err: &GenerationError) -> u8 {
    if let Some(sole) = err.sole_failure() {
        return generation_exit_code(sole);
    }
    match err {
        GenerationError::UnknownProvider { .. } | GenerationError::UnsupportedModel { .. } => ExitCodes::INVALID_ARGS,
        GenerationError::CredentialNotFound { .. } => ExitCodes::MISSING_CREDENTIALS,
        GenerationError::AllProvidersExhausted { .. }
        | GenerationError::TransientProvider { .. }
        | GenerationError::NonTransientProvider { .. } => ExitCodes::PROVIDERS_EXHAUSTED,
        GenerationError::NoCodeBlockFound { .. } | GenerationError::Extraction { .. } => ExitCodes::EXTRACTION_FAILURE,
        GenerationError::Cancelled => ExitCodes::CANCELLED,
        GenerationError::Config(_) => ExitCodes::GENERAL_ERROR,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use iacgenius_core::error::CandidateFailure;

    #[test]
    fn test_single_candidate_maps_to_its_own_code() {
        let err = GenerationError::AllProvidersExhausted {
            failures: vec![CandidateFailure::new(
                "deepseek",
                None,
                0,
                GenerationError::CredentialNotFound {
                    provider: "deepseek".to_string(),
                    checked: vec![],
                },
            )],
        };
        assert_eq!(categorize_error(&anyhow::Error::new(err)), ExitCodes::MISSING_CREDENTIALS);
    }

    #[test]
    fn test_several_candidates_map_to_exhausted() {
        let failure = |name: &str| {
            CandidateFailure::new(
                name,
                None,
                0,
                GenerationError::UnknownProvider { name: name.to_string() },
            )
        };
        let err = GenerationError::AllProvidersExhausted {
            failures: vec![failure("a"), failure("b")],
        };
        assert_eq!(categorize_error(&anyhow::Error::new(err)), ExitCodes::PROVIDERS_EXHAUSTED);
    }

    #[test]
    fn test_cancelled_and_plain_errors() {
        assert_eq!(categorize_error(&anyhow::Error::new(GenerationError::Cancelled)), ExitCodes::CANCELLED);
        assert_eq!(categorize_error(&anyhow::anyhow!("disk full")), ExitCodes::GENERAL_ERROR);
    }
}
