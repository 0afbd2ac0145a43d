//! Mistral chat completions API: OpenAI-shaped payloads on a different
//! endpoint and key variable.

use serde_json::Value;

use crate::openai::{build_chat_completion_payload, extract_chat_completion_text};
use crate::plan::WriteFileCommand;
use crate::traits::{ChatTurn, ProviderAdapter, ProviderError};

const API_URL: &str = "https://api.mistral.ai/v1/chat/completions";

#[derive(Debug, Default)]
pub struct MistralAdapter;

impl ProviderAdapter for MistralAdapter {
    fn name(&self) -> &'static str {
        "mistral"
    }

    fn default_model(&self) -> &'static str {
        "mistral-small-latest"
    }

    fn api_key_env_var(&self) -> &'static str {
        "MISTRAL_API_KEY"
    }

    fn full_url(&self, _api_key: &str, _model: &str) -> String {
        API_URL.to_string()
    }

    fn build_single_turn_payload(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        model: &str,
    ) -> Value {
        build_chat_completion_payload(
            system_prompt,
            &[ChatTurn::new("user", user_prompt)],
            model,
        )
    }

    fn build_conversation_payload(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        model: &str,
    ) -> Value {
        build_chat_completion_payload(system_prompt, history, model)
    }

    fn headers(&self, api_key: &str) -> Vec<(String, String)> {
        vec![
            ("content-type".into(), "application/json".into()),
            ("authorization".into(), format!("Bearer {}", api_key)),
        ]
    }

    fn parse_plan(&self, raw_body: &str) -> Result<WriteFileCommand, ProviderError> {
        let text = extract_chat_completion_text(self.name(), raw_body)?;
        WriteFileCommand::from_plan_text(self.name(), &text)
    }

    fn parse_chat(&self, raw_body: &str) -> Result<String, ProviderError> {
        extract_chat_completion_text(self.name(), raw_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_endpoint_differs_from_openai() {
        let adapter = MistralAdapter;
        assert!(adapter.full_url("k", "m").contains("api.mistral.ai"));
        assert_eq!(adapter.api_key_env_var(), "MISTRAL_API_KEY");
    }

    #[test]
    fn test_payload_is_openai_shaped() {
        let adapter = MistralAdapter;
        let payload = adapter.build_single_turn_payload("sys", "hi", "mistral-small-latest");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][1]["role"], "user");
    }

    #[test]
    fn test_parse_error_names_mistral() {
        let adapter = MistralAdapter;
        let err = adapter.parse_chat("{}").unwrap_err();
        assert!(err.to_string().contains("mistral"));
    }
}
