//! Built-in provider catalog

use super::descriptor::{CredentialSource, ProviderDescriptor, ProviderFamily};

/// Provider used when neither the request nor configuration names one
pub const DEFAULT_PROVIDER: &str = "deepseek";

/// Built-in providers, in display order
pub fn builtin_providers() -> Vec<ProviderDescriptor> {
    vec![
        ProviderDescriptor::new("deepseek", "DeepSeek", ProviderFamily::ChatCompletions, "https://api.deepseek.com/v1")
            .with_models(&["deepseek-chat", "deepseek-coder", "deepseek-reasoner"]),
        ProviderDescriptor::new("openai", "OpenAI", ProviderFamily::ChatCompletions, "https://api.openai.com/v1")
            .with_models(&["gpt-4o", "gpt-4o-mini", "gpt-4-turbo", "gpt-3.5-turbo", "o1-mini", "o3-mini"])
            .with_default_model("gpt-3.5-turbo"),
        ProviderDescriptor::new("anthropic", "Anthropic", ProviderFamily::Anthropic, "https://api.anthropic.com/v1")
            .with_models(&["claude-3-5-sonnet-latest", "claude-3-opus-latest", "claude-3-haiku-latest"]),
        ProviderDescriptor::new("openrouter", "OpenRouter", ProviderFamily::ChatCompletions, "https://openrouter.ai/api/v1")
            .with_models(&[
                "openai/gpt-4o",
                "openai/gpt-3.5-turbo",
                "google/gemini-pro-1.5",
                "anthropic/claude-3.5-sonnet",
                "mistralai/mistral-7b-instruct",
                "meta-llama/llama-3-8b-instruct",
            ])
            .with_default_model("openai/gpt-3.5-turbo")
            .with_header("HTTP-Referer", "https://github.com/iacgenius/iacgenius")
            .with_header("X-Title", "IaCGenius"),
        ProviderDescriptor::new("bedrock", "AWS Bedrock", ProviderFamily::Bedrock, "https://bedrock-runtime.{region}.amazonaws.com")
            .with_models(&[
                "claude-3.5-sonnet",
                "claude-3-opus",
                "claude-3-haiku",
                "llama3-8b-instruct",
                "llama3-70b-instruct",
                "titan-text-express",
            ])
            .with_model_prefixes(&["anthropic.", "meta.", "amazon.", "cohere.", "ai21."])
            .with_credential_source(CredentialSource::Chain),
        ProviderDescriptor::new("ollama", "Ollama (local)", ProviderFamily::Ollama, "http://localhost:11434")
            .with_models(&["llama3", "mistral", "codellama"])
            .accepting_any_model()
            .with_credential_source(CredentialSource::None),
    ]
}
