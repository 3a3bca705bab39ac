//! Known formatting quirks of model families

use crate::registry::{ProviderDescriptor, ProviderFamily};

/// A formatting habit that needs an extra instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ModelQuirk {
    /// Reasoning models tend to echo their chain of thought
    Reasoning,
    /// Claude models like to open with a sentence before the code
    Preamble,
    /// Small local models split multi-file answers into several blocks
    SingleBlock,
}

impl ModelQuirk {
    /// Quirks that apply to `model` served by `descriptor`, in a fixed order
    pub fn detect(descriptor: &ProviderDescriptor, model: &str) -> Vec<ModelQuirk> {
        let model = model.to_lowercase();
        let mut quirks = Vec::new();

        if is_reasoning_model(&model) {
            quirks.push(ModelQuirk::Reasoning);
        }
        if descriptor.family == ProviderFamily::Anthropic || model.contains("claude") {
            quirks.push(ModelQuirk::Preamble);
        }
        if descriptor.family == ProviderFamily::Ollama || is_small_model(&model) {
            quirks.push(ModelQuirk::SingleBlock);
        }
        quirks
    }

    pub fn hint(&self) -> &'static str {
        match self {
            ModelQuirk::Reasoning => {
                "Do not include your reasoning or analysis in the answer; output only the final code block."
            }
            ModelQuirk::Preamble => "Start your reply directly with the opening code fence, with no preamble.",
            ModelQuirk::SingleBlock => {
                "If the configuration spans several files, put them all in the same single code block separated by comments naming each file."
            }
        }
    }
}

fn is_reasoning_model(model: &str) -> bool {
    let base = model.rsplit('/').next().unwrap_or(model);
    base.contains("reasoner") || base.starts_with("o1") || base.starts_with("o3") || base.contains("-r1")
}

fn is_small_model(model: &str) -> bool {
    ["-7b", "-8b", ":7b", ":8b"].iter().any(|s| model.contains(s))
}
