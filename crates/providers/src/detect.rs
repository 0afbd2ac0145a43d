//! Adapter construction and environment-based provider auto-detection.

use crate::anthropic::AnthropicAdapter;
use crate::gemini::GeminiAdapter;
use crate::mistral::MistralAdapter;
use crate::openai::OpenAiAdapter;
use crate::traits::{ProviderAdapter, ProviderError};

/// Recognized providers with their key variables, in detection priority
/// order.
pub const PROVIDERS: [(&str, &str); 4] = [
    ("anthropic", "ANTHROPIC_API_KEY"),
    ("openai", "OPENAI_API_KEY"),
    ("gemini", "GEMINI_API_KEY"),
    ("mistral", "MISTRAL_API_KEY"),
];

pub fn create_adapter(name: &str) -> Result<Box<dyn ProviderAdapter>, ProviderError> {
    match name {
        "anthropic" => Ok(Box::new(AnthropicAdapter)),
        "openai" => Ok(Box::new(OpenAiAdapter)),
        "gemini" => Ok(Box::new(GeminiAdapter)),
        "mistral" => Ok(Box::new(MistralAdapter)),
        other => Err(ProviderError::Configuration(format!(
            "Unsupported provider: {}",
            other
        ))),
    }
}

/// Pick the first provider whose key variable is set and non-empty.
pub fn detect_provider() -> Result<&'static str, ProviderError> {
    detect_with(|var| std::env::var(var).ok())
}

fn detect_with<F>(lookup: F) -> Result<&'static str, ProviderError>
where
    F: Fn(&str) -> Option<String>,
{
    for (name, var) in PROVIDERS {
        if lookup(var).map(|v| !v.is_empty()).unwrap_or(false) {
            tracing::debug!(provider = name, "auto-detected provider from environment");
            return Ok(name);
        }
    }

    let vars: Vec<&str> = PROVIDERS.iter().map(|(_, var)| *var).collect();
    Err(ProviderError::Configuration(format!(
        "No provider API key found. Set one of: {}",
        vars.join(", ")
    )))
}
