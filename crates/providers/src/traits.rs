use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::plan::WriteFileCommand;

pub const MAX_TOKENS: u32 = 1000;
pub const TEMPERATURE: f64 = 0.1;

#[derive(Debug, Error)]
pub enum ProviderError {
    #[error("{provider} response parse error: {message}")]
    Parse {
        provider: &'static str,
        message: String,
    },
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// A single conversation turn as the payload builders see it. Roles are the
/// neutral `user` / `assistant` / `system` vocabulary; adapters respell them
/// where their vendor differs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatTurn {
    pub role: String,
    pub content: String,
}

impl ChatTurn {
    pub fn new(role: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: role.into(),
            content: content.into(),
        }
    }
}

/// The per-vendor capability set. Implementations are immutable values; no
/// I/O happens here.
pub trait ProviderAdapter: Send + Sync {
    fn name(&self) -> &'static str;

    fn default_model(&self) -> &'static str;

    fn api_key_env_var(&self) -> &'static str;

    fn full_url(&self, api_key: &str, model: &str) -> String;

    fn build_single_turn_payload(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> serde_json::Value;

    fn build_conversation_payload(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        model: &str,
    ) -> serde_json::Value;

    fn headers(&self, api_key: &str) -> Vec<(String, String)>;

    /// Unwrap the vendor envelope and parse the inner plan object.
    fn parse_plan(&self, raw_body: &str) -> Result<WriteFileCommand, ProviderError>;

    /// Unwrap the vendor envelope and return the assistant text verbatim.
    fn parse_chat(&self, raw_body: &str) -> Result<String, ProviderError>;
}
