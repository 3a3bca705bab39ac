//! Revise command - Regenerate existing code with requested changes.

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::Args;

use iacgenius_core::Revision;

use super::generate::{emit, run, RequestArgs};
use super::GlobalArgs;

#[derive(Args)]
pub struct ReviseArgs {
    /// File holding the current code
    #[arg(short, long)]
    input: PathBuf,

    /// Changes to make
    #[arg(short, long)]
    feedback: String,

    /// Original description, if the code was generated from one
    #[arg(short, long, default_value = "Revise the existing code")]
    description: String,

    #[command(flatten)]
    options: RequestArgs,
}

pub async fn execute(global: &GlobalArgs, args: ReviseArgs) -> Result<()> {
    let previous = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    if previous.trim().is_empty() {
        bail!("{} is empty", args.input.display());
    }
    if args.feedback.trim().is_empty() {
        bail!("Feedback must not be empty");
    }

    let request = args
        .options
        .request(&args.description)
        .with_revision(Revision::new(previous, &args.feedback));
    let generation = run(global, &request).await?;
    emit(&args.options, &generation)
}
