//! Supported Infrastructure-as-Code formats

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Infrastructure-as-Code format a request targets
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InfraType {
    Terraform,
    CloudFormation,
    Kubernetes,
    Helm,
    Docker,
    CiCd,
    Opa,
    AzureArm,
}

/// Returned when a string does not name a supported format
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("unsupported infrastructure type: {0}")]
pub struct UnknownInfraType(pub String);

impl InfraType {
    /// Every supported format, in display order
    pub const ALL: [InfraType; 8] = [
        InfraType::Terraform,
        InfraType::CloudFormation,
        InfraType::Kubernetes,
        InfraType::Helm,
        InfraType::Docker,
        InfraType::CiCd,
        InfraType::Opa,
        InfraType::AzureArm,
    ];

    /// Stable identifier used on the command line and in serialized output
    pub fn id(&self) -> &'static str {
        match self {
            InfraType::Terraform => "terraform",
            InfraType::CloudFormation => "cloudformation",
            InfraType::Kubernetes => "kubernetes",
            InfraType::Helm => "helm",
            InfraType::Docker => "docker",
            InfraType::CiCd => "cicd",
            InfraType::Opa => "opa",
            InfraType::AzureArm => "arm",
        }
    }

    /// Human-readable name, used inside prompts
    pub fn display_name(&self) -> &'static str {
        match self {
            InfraType::Terraform => "Terraform",
            InfraType::CloudFormation => "CloudFormation",
            InfraType::Kubernetes => "Kubernetes Manifests",
            InfraType::Helm => "Helm Chart",
            InfraType::Docker => "Dockerfile",
            InfraType::CiCd => "CI/CD Pipeline",
            InfraType::Opa => "OPA Policy",
            InfraType::AzureArm => "Azure Resource Manager (ARM) Template",
        }
    }

    /// Language tag the model is asked to put on its code fence
    pub fn language_hint(&self) -> &'static str {
        match self {
            InfraType::Terraform => "hcl",
            InfraType::CloudFormation
            | InfraType::Kubernetes
            | InfraType::Helm
            | InfraType::CiCd => "yaml",
            InfraType::Docker => "dockerfile",
            InfraType::Opa => "rego",
            InfraType::AzureArm => "json",
        }
    }

    /// File extension for saved artifacts. Docker is a full file name.
    pub fn file_extension(&self) -> &'static str {
        match self {
            InfraType::Terraform => ".tf",
            InfraType::CloudFormation
            | InfraType::Kubernetes
            | InfraType::Helm
            | InfraType::CiCd => ".yaml",
            InfraType::Docker => "Dockerfile",
            InfraType::Opa => ".rego",
            InfraType::AzureArm => ".json",
        }
    }

    fn aliases(&self) -> &'static [&'static str] {
        match self {
            InfraType::Terraform => &["terraform", "tf", "hcl"],
            InfraType::CloudFormation => &["cloudformation", "cfn", "cloud-formation"],
            InfraType::Kubernetes => &["kubernetes", "k8s", "kubernetes-manifests"],
            InfraType::Helm => &["helm", "helm-chart"],
            InfraType::Docker => &["docker", "dockerfile"],
            InfraType::CiCd => &["cicd", "ci-cd", "ci/cd", "pipeline"],
            InfraType::Opa => &["opa", "rego", "opa-policy"],
            InfraType::AzureArm => &["arm", "azure-arm", "azure"],
        }
    }
}

impl fmt::Display for InfraType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.display_name())
    }
}

impl FromStr for InfraType {
    type Err = UnknownInfraType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let needle = s.trim().to_lowercase().replace(['_', ' '], "-");
        InfraType::ALL
            .iter()
            .copied()
            .find(|t| t.aliases().contains(&needle.as_str()))
            .ok_or_else(|| UnknownInfraType(s.to_string()))
    }
}
