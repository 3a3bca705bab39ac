//! Prompt construction
//!
//! [`PromptBuilder`] turns a [`GenerationRequest`] and the target provider's
//! descriptor into a [`PromptSpec`]. Output depends only on its inputs, so
//! the same request always produces byte-identical prompts.

mod quirks;

use serde::Serialize;

use crate::registry::ProviderDescriptor;
use crate::types::{GenerationRequest, InfraType};

pub use quirks::ModelQuirk;

const PERSONA: &str = "You are an expert Infrastructure-as-Code engineer. \
Generate valid, secure cloud infrastructure configurations.";

/// A provider-ready prompt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PromptSpec {
    pub system_instructions: String,
    pub user_content: String,
    /// Language tag the model is asked to put on its code fence
    pub target_language_hint: String,
}

/// Builds prompts for generation and revision requests
#[derive(Debug, Clone, Copy, Default)]
pub struct PromptBuilder;

impl PromptBuilder {
    pub fn new() -> Self {
        Self
    }

    /// Build for the request's model, or the descriptor's default
    pub fn build(&self, request: &GenerationRequest, descriptor: &ProviderDescriptor) -> PromptSpec {
        let model = request
            .model
            .as_deref()
            .unwrap_or(descriptor.default_model.as_str());
        self.build_for_model(request, descriptor, model)
    }

    /// Build for an explicit model (fallback candidates use their own)
    pub fn build_for_model(
        &self,
        request: &GenerationRequest,
        descriptor: &ProviderDescriptor,
        model: &str,
    ) -> PromptSpec {
        let language = request.infra_type.language_hint();
        PromptSpec {
            system_instructions: system_instructions(request.infra_type, descriptor, model),
            user_content: user_content(request),
            target_language_hint: language.to_string(),
        }
    }
}

fn system_instructions(infra_type: InfraType, descriptor: &ProviderDescriptor, model: &str) -> String {
    let name = infra_type.display_name();
    let language = infra_type.language_hint();

    let mut lines = vec![
        PERSONA.to_string(),
        format!("Target format: {}.", name),
        String::new(),
        "Output rules:".to_string(),
        format!(
            "- Respond with exactly one fenced code block tagged `{}` containing the complete {} configuration.",
            language, name
        ),
        "- Do not write any explanation, summary or commentary outside the code block.".to_string(),
        "- Put any notes for the reader in code comments inside the block.".to_string(),
    ];
    for quirk in ModelQuirk::detect(descriptor, model) {
        lines.push(format!("- {}", quirk.hint()));
    }
    lines.join("\n")
}

fn user_content(request: &GenerationRequest) -> String {
    let infra_type = request.infra_type;
    let ctx = &request.context;
    let mut sections = Vec::new();

    let mut cloud = vec![
        "Cloud environment:".to_string(),
        format!("- Provider: {}", ctx.cloud),
    ];
    if let Some(region) = ctx.region.as_deref().filter(|r| !r.trim().is_empty()) {
        cloud.push(format!("- Region: {}", region.trim()));
    }
    if !ctx.tags.is_empty() {
        cloud.push("- Resource tags:".to_string());
        for (key, value) in &ctx.tags {
            cloud.push(format!("  - {}: {}", key, value));
        }
    }
    sections.push(cloud.join("\n"));

    sections.push(format!(
        "Generate {} code for the following requirements:\n{}",
        infra_type.display_name(),
        request.description.trim()
    ));

    let mut guidelines = vec![
        "Guidelines:".to_string(),
        "- Follow security best practices: least privilege, encryption at rest and in transit, no hard-coded secrets.".to_string(),
        "- Consider scalability, high availability and disaster recovery where relevant.".to_string(),
        "- Use consistent, descriptive resource names.".to_string(),
        "- Comment each resource with its purpose and any security considerations.".to_string(),
        "- Expose tunable values as parameters or variables with descriptions.".to_string(),
    ];
    if !ctx.tags.is_empty() {
        guidelines.push("- Apply the resource tags above to every resource that supports tagging.".to_string());
    }
    guidelines.push(version_constraint_guideline(infra_type).to_string());
    sections.push(guidelines.join("\n"));

    if let Some(versions) = ctx.target_versions.as_deref().filter(|v| !v.trim().is_empty()) {
        sections.push(format!(
            "Target version constraints (the code must be compatible with and pin these versions):\n{}",
            versions.trim()
        ));
    }

    if let Some(revision) = &request.revision {
        sections.push(format!(
            "Current version of the code:\n```{}\n{}\n```",
            infra_type.language_hint(),
            revision.previous_code.trim_end()
        ));
        sections.push(format!(
            "Requested changes:\n{}\n\nReturn the complete updated configuration, not a diff.",
            revision.feedback.trim()
        ));
    }

    sections.join("\n\n")
}

fn version_constraint_guideline(infra_type: InfraType) -> &'static str {
    match infra_type {
        InfraType::Terraform => {
            "- Include version constraints: a `required_version` setting and a `required_providers` block."
        }
        InfraType::Helm => "- Include `apiVersion` and `version` in Chart metadata and pin dependency versions.",
        InfraType::Docker => "- Pin base images to an explicit version tag rather than `latest`.",
        InfraType::Kubernetes => "- Use stable API versions and pin container image tags.",
        _ => "- Pin the versions of the tool and any providers, actions or modules used.",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::ProviderRegistry;
    use crate::types::{CloudContext, Revision};

    fn request() -> GenerationRequest {
        GenerationRequest::new(InfraType::Terraform, "S3 bucket with versioning").with_context(
            CloudContext::new("AWS")
                .with_region("us-east-1")
                .with_tag("owner", "platform")
                .with_tag("env", "prod"),
        )
    }

    #[test]
    fn test_build_is_deterministic() {
        let registry = ProviderRegistry::builtin();
        let descriptor = registry.describe("deepseek").unwrap();
        let builder = PromptBuilder::new();

        let a = builder.build(&request(), descriptor);
        let b = builder.build(&request(), descriptor);
        assert_eq!(a, b);
        assert_eq!(serde_json::to_vec(&a).unwrap(), serde_json::to_vec(&b).unwrap());
    }

    #[test]
    fn test_system_instructions_name_format_and_fence() {
        let registry = ProviderRegistry::builtin();
        let spec = PromptBuilder::new().build(&request(), registry.describe("openai").unwrap());

        assert!(spec.system_instructions.contains("Target format: Terraform."));
        assert!(spec.system_instructions.contains("exactly one fenced code block tagged `hcl`"));
        assert!(spec.system_instructions.contains("outside the code block"));
        assert_eq!(spec.target_language_hint, "hcl");
    }

    #[test]
    fn test_user_content_includes_context() {
        let registry = ProviderRegistry::builtin();
        let spec = PromptBuilder::new().build(&request(), registry.describe("openai").unwrap());

        assert!(spec.user_content.contains("- Provider: AWS"));
        assert!(spec.user_content.contains("- Region: us-east-1"));
        assert!(spec.user_content.contains("S3 bucket with versioning"));
        assert!(spec.user_content.contains("required_providers"));
        // Tags come out sorted regardless of insertion order
        let env = spec.user_content.find("env: prod").unwrap();
        let owner = spec.user_content.find("owner: platform").unwrap();
        assert!(env < owner);
    }

    #[test]
    fn test_target_versions_section() {
        let registry = ProviderRegistry::builtin();
        let req = request().with_context(CloudContext::default().with_target_versions("terraform >= 1.6"));
        let spec = PromptBuilder::new().build(&req, registry.describe("openai").unwrap());
        assert!(spec.user_content.contains("Target version constraints"));
        assert!(spec.user_content.contains("terraform >= 1.6"));

        let spec = PromptBuilder::new().build(&request(), registry.describe("openai").unwrap());
        assert!(!spec.user_content.contains("Target version constraints"));
    }

    #[test]
    fn test_revision_prompt() {
        let registry = ProviderRegistry::builtin();
        let req = request().with_revision(Revision::new(
            "resource \"aws_s3_bucket\" \"b\" {}\n",
            "add server-side encryption",
        ));
        let spec = PromptBuilder::new().build(&req, registry.describe("openai").unwrap());

        assert!(spec.user_content.contains("```hcl\nresource \"aws_s3_bucket\" \"b\" {}\n```"));
        assert!(spec.user_content.contains("add server-side encryption"));
        assert!(spec.user_content.contains("not a diff"));
    }

    #[test]
    fn test_reasoning_model_hint() {
        let registry = ProviderRegistry::builtin();
        let deepseek = registry.describe("deepseek").unwrap();
        let builder = PromptBuilder::new();

        let chat = builder.build_for_model(&request(), deepseek, "deepseek-chat");
        let reasoner = builder.build_for_model(&request(), deepseek, "deepseek-reasoner");
        assert!(!chat.system_instructions.contains(ModelQuirk::Reasoning.hint()));
        assert!(reasoner.system_instructions.contains(ModelQuirk::Reasoning.hint()));
        assert_eq!(chat.user_content, reasoner.user_content);
    }

    #[test]
    fn test_build_uses_request_model() {
        let registry = ProviderRegistry::builtin();
        let openai = registry.describe("openai").unwrap();
        let req = request().with_model("o3-mini");

        let spec = PromptBuilder::new().build(&req, openai);
        assert!(spec.system_instructions.contains(ModelQuirk::Reasoning.hint()));
    }

    #[test]
    fn test_docker_language() {
        let registry = ProviderRegistry::builtin();
        let req = GenerationRequest::new(InfraType::Docker, "python web app");
        let spec = PromptBuilder::new().build(&req, registry.describe("ollama").unwrap());
        assert_eq!(spec.target_language_hint, "dockerfile");
        assert!(spec.system_instructions.contains(ModelQuirk::SingleBlock.hint()));
        assert!(spec.user_content.contains("Dockerfile code"));
    }
}
