//! OpenAI chat completions API: flat message array with a leading system
//! role and bearer auth.

use serde_json::{json, Value};

use crate::plan::WriteFileCommand;
use crate::traits::{ChatTurn, ProviderAdapter, ProviderError, MAX_TOKENS, TEMPERATURE};

const API_URL: &str = "https://api.openai.com/v1/chat/completions";

#[derive(Debug, Default)]
pub struct OpenAiAdapter;

/// Shared envelope extraction for the chat-completions response shape, also
/// used by the Mistral adapter.
pub(crate) fn extract_chat_completion_text(
    provider: &'static str,
    raw_body: &str,
) -> Result<String, ProviderError> {
    let body: Value = serde_json::from_str(raw_body).map_err(|e| ProviderError::Parse {
        provider,
        message: e.to_string(),
    })?;

    body["choices"]
        .get(0)
        .and_then(|choice| choice["message"]["content"].as_str())
        .map(|text| text.to_string())
        .ok_or_else(|| ProviderError::Parse {
            provider,
            message: "missing choices[0].message.content in response envelope".to_string(),
        })
}

pub(crate) fn build_chat_completion_payload(
    system_prompt: &str,
    history: &[ChatTurn],
    model: &str,
) -> Value {
    let mut messages = vec![json!({"role": "system", "content": system_prompt})];
    messages.extend(
        history
            .iter()
            .map(|turn| json!({"role": turn.role, "content": turn.content})),
    );

    json!({
        "model": model,
        "messages": messages,
        "max_tokens": MAX_TOKENS,
        "temperature": TEMPERATURE
    })
}

impl ProviderAdapter for OpenAiAdapter {
    fn name(&self) -> &'static str {
        "openai"
    }

    fn default_model(&self) -> &'static str {
        "gpt-3.5-turbo"
    }

    fn api_key_env_var(&self) -> &'static str {
        "OPENAI_API_KEY"
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
    fn test_single_turn_payload_has_system_first() {
        let adapter = OpenAiAdapter;
        let payload = adapter.build_single_turn_payload("sys", "hello", "gpt-3.5-turbo");
        assert_eq!(payload["messages"][0]["role"], "system");
        assert_eq!(payload["messages"][0]["content"], "sys");
        assert_eq!(payload["messages"][1]["role"], "user");
        assert_eq!(payload["messages"][1]["content"], "hello");
    }

    #[test]
    fn test_bearer_auth_header() {
        let adapter = OpenAiAdapter;
        let headers = adapter.headers("sk-test");
        assert!(headers.contains(&("authorization".into(), "Bearer sk-test".into())));
    }

    #[test]
    fn test_parse_chat_unwraps_envelope() {
        let adapter = OpenAiAdapter;
        let body = r#"{"choices":[{"message":{"role":"assistant","content":"hi"}}]}"#;
        assert_eq!(adapter.parse_chat(body).unwrap(), "hi");
    }

    #[test]
    fn test_empty_choices_is_parse_error() {
        let adapter = OpenAiAdapter;
        let err = adapter.parse_chat(r#"{"choices":[]}"#).unwrap_err();
        assert!(err.to_string().contains("openai"));
    }
}
