//! Generate command - Generate code from a description.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::Args;
use serde_json::json;
use tracing::info;

use iacgenius_core::{
    CancellationToken, CloudContext, Generation, GenerationOptions, GenerationRequest, InfraType,
};

use super::{build_orchestrator, prompts, GlobalArgs};

/// Extensions that are kept as given on `--output`
const KNOWN_EXTENSIONS: [&str; 5] = ["tf", "yaml", "yml", "json", "rego"];

#[derive(Args)]
pub struct GenerateArgs {
    /// Description of the infrastructure to generate (prompted for when omitted)
    #[arg(short, long)]
    description: Option<String>,

    #[command(flatten)]
    options: RequestArgs,
}

/// Options shared by `generate` and `revise`
#[derive(Args, Debug, Clone)]
pub struct RequestArgs {
    /// Infrastructure type (terraform, cloudformation, kubernetes, helm, docker, cicd, opa, arm)
    ///
    /// Defaults to terraform, or is prompted for when `generate` runs in a terminal.
    #[arg(short = 't', long = "type")]
    pub infra_type: Option<InfraType>,

    /// LLM provider (overrides the configured default)
    #[arg(long)]
    pub provider: Option<String>,

    /// Model name for the provider
    #[arg(long)]
    pub model: Option<String>,

    /// Target cloud
    #[arg(long, default_value = "AWS")]
    pub cloud: String,

    #[arg(long)]
    pub region: Option<String>,

    /// Resource tag as key=value (repeatable)
    #[arg(long = "tag", value_parser = parse_tag)]
    pub tags: Vec<(String, String)>,

    /// Version constraints, e.g. "terraform >= 1.5, aws ~> 5.0"
    #[arg(long)]
    pub target_versions: Option<String>,

    #[arg(long)]
    pub temperature: Option<f32>,

    #[arg(long)]
    pub max_tokens: Option<u32>,

    /// Write the code to this file instead of stdout
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Print a JSON document with the code and provenance
    #[arg(long)]
    pub json: bool,
}

impl RequestArgs {
    pub fn infra_type(&self) -> InfraType {
        self.infra_type.unwrap_or(InfraType::Terraform)
    }

    pub fn request(&self, description: impl Into<String>) -> GenerationRequest {
        let mut context = CloudContext::new(&self.cloud);
        if let Some(region) = &self.region {
            context = context.with_region(region);
        }
        for (key, value) in &self.tags {
            context = context.with_tag(key, value);
        }
        if let Some(versions) = &self.target_versions {
            context = context.with_target_versions(versions);
        }

        let mut request = GenerationRequest::new(self.infra_type(), description)
            .with_context(context)
            .with_options(GenerationOptions {
                temperature: self.temperature,
                max_tokens: self.max_tokens,
            });
        if let Some(provider) = &self.provider {
            request = request.with_provider(provider);
        }
        if let Some(model) = &self.model {
            request = request.with_model(model);
        }
        request
    }
}

pub async fn execute(global: &GlobalArgs, mut args: GenerateArgs) -> Result<()> {
    let interactive = prompts::interactive();
    let description = match args.description.take() {
        Some(description) => description,
        None if interactive => prompts::description()?,
        None => bail!("No description given: pass --description"),
    };
    if description.trim().is_empty() {
        bail!("Description must not be empty");
    }
    if args.options.infra_type.is_none() && interactive {
        args.options.infra_type = Some(prompts::infra_type()?);
    }

    let request = args.options.request(&description);
    let generation = run(global, &request).await?;
    emit(&args.options, &generation)
}

/// Run one request, cancelling on Ctrl-C
pub async fn run(global: &GlobalArgs, request: &GenerationRequest) -> Result<Generation> {
    let config = global.load_config().await?;
    let orchestrator = build_orchestrator(&config)?;

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            on_interrupt.cancel();
        }
    });

    info!("Generating {} code", request.infra_type);
    let generation = orchestrator.generate_detailed(request, &cancel).await?;
    info!(
        "Generated by {} ({}) after {} attempt(s)",
        generation.artifact.source_provider,
        generation.artifact.source_model,
        generation.attempts.len()
    );
    Ok(generation)
}

/// Print or save the generated code
pub fn emit(options: &RequestArgs, generation: &Generation) -> Result<()> {
    let artifact = &generation.artifact;
    let written = match &options.output {
        Some(path) => {
            let path = output_path(path, options.infra_type());
            std::fs::write(&path, format!("{}\n", artifact.code_body))
                .with_context(|| format!("Failed to write {}", path.display()))?;
            Some(path)
        }
        None => None,
    };

    if options.json {
        let attempts: Vec<_> = generation
            .attempts
            .iter()
            .map(|a| {
                json!({
                    "provider": a.provider,
                    "model": a.model,
                    "attempt": a.attempt,
                    "latency_ms": a.latency.as_millis() as u64,
                    "outcome": format!("{:?}", a.outcome),
                })
            })
            .collect();
        let document = json!({
            "infra_type": options.infra_type().id(),
            "artifact": artifact,
            "output": written.as_ref().map(|p| p.display().to_string()),
            "attempts": attempts,
        });
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else if let Some(path) = written {
        println!("Code written to {}", path.display());
    } else {
        println!("{}", artifact.code_body);
    }
    Ok(())
}

/// Append the type's extension unless the path already has a known one
fn output_path(path: &Path, infra_type: InfraType) -> PathBuf {
    let has_known_extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| KNOWN_EXTENSIONS.contains(&ext.to_lowercase().as_str()))
        .unwrap_or(false);
    if has_known_extension {
        return path.to_path_buf();
    }

    let extension = infra_type.file_extension();
    let name = path.as_os_str().to_string_lossy();
    if name.ends_with(extension) {
        return path.to_path_buf();
    }
    if extension.starts_with('.') {
        PathBuf::from(format!("{}{}", name, extension))
    } else {
        PathBuf::from(format!("{}.{}", name, extension))
    }
}

fn parse_tag(value: &str) -> Result<(String, String), String> {
    match value.split_once('=') {
        Some((key, val)) if !key.trim().is_empty() => Ok((key.trim().to_string(), val.trim().to_string())),
        _ => Err(format!("expected key=value, got '{}'", value)),
    }
}
