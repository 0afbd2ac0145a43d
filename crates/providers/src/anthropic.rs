//! Anthropic messages API: separate `system` field, typed content parts,
//! custom auth and version headers.

use serde_json::{json, Value};

use crate::plan::WriteFileCommand;
use crate::traits::{ChatTurn, ProviderAdapter, ProviderError, MAX_TOKENS, TEMPERATURE};

const API_URL: &str = "https://api.anthropic.com/v1/messages";
const API_VERSION: &str = "2023-06-01";

#[derive(Debug, Default)]
pub struct AnthropicAdapter;

impl AnthropicAdapter {
    fn extract_text(&self, raw_body: &str) -> Result<String, ProviderError> {
        let body: Value = serde_json::from_str(raw_body).map_err(|e| ProviderError::Parse {
            provider: self.name(),
            message: e.to_string(),
        })?;

        body["content"]
            .get(0)
            .and_then(|part| part["text"].as_str())
            .map(|text| text.to_string())
            .ok_or_else(|| ProviderError::Parse {
                provider: self.name(),
                message: "missing content[0].text in response envelope".to_string(),
            })
    }
}

impl ProviderAdapter for AnthropicAdapter {
    fn name(&self) -> &'static str {
        "anthropic"
    }

    fn default_model(&self) -> &'static str {
        "claude-3-haiku-20240307"
    }

    fn api_key_env_var(&self) -> &'static str {
        "ANTHROPIC_API_KEY"
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
        json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": system_prompt,
            "messages": [
                {"role": "user", "content": [{"type": "text", "text": user_prompt}]}
            ]
        })
    }

    fn build_conversation_payload(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        model: &str,
    ) -> Value {
        let messages: Vec<Value> = history
            .iter()
            .map(|turn| {
                json!({
                    "role": turn.role,
                    "content": [{"type": "text", "text": turn.content}]
                })
            })
            .collect();

        json!({
            "model": model,
            "max_tokens": MAX_TOKENS,
            "temperature": TEMPERATURE,
            "system": system_prompt,
            "messages": messages
        })
    }

    fn headers(&self, api_key: &str) -> Vec<(String, String)> {
        vec![
            ("content-type".into(), "application/json".into()),
            ("anthropic-version".into(), API_VERSION.into()),
            ("x-api-key".into(), api_key.into()),
        ]
    }

    fn parse_plan(&self, raw_body: &str) -> Result<WriteFileCommand, ProviderError> {
        let text = self.extract_text(raw_body)?;
        WriteFileCommand::from_plan_text(self.name(), &text)
    }

    fn parse_chat(&self, raw_body: &str) -> Result<String, ProviderError> {
        self.extract_text(raw_body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_single_turn_payload_shape() {
        let adapter = AnthropicAdapter;
        let payload = adapter.build_single_turn_payload("sys", "hello", "claude-3-haiku-20240307");
        assert_eq!(payload["system"], "sys");
        assert_eq!(payload["messages"][0]["role"], "user");
        assert_eq!(payload["messages"][0]["content"][0]["type"], "text");
        assert_eq!(payload["messages"][0]["content"][0]["text"], "hello");
    }

    #[test]
    fn test_headers_carry_version_and_key() {
        let adapter = AnthropicAdapter;
        let headers = adapter.headers("sk-test");
        assert!(headers.contains(&("anthropic-version".into(), API_VERSION.into())));
        assert!(headers.contains(&("x-api-key".into(), "sk-test".into())));
    }

    #[test]
    fn test_parse_chat_unwraps_envelope() {
        let adapter = AnthropicAdapter;
        let body = r#"{"content":[{"type":"text","text":"hi there"}]}"#;
        assert_eq!(adapter.parse_chat(body).unwrap(), "hi there");
    }

    #[test]
    fn test_parse_plan_from_envelope() {
        let adapter = AnthropicAdapter;
        let body = r#"{"content":[{"type":"text","text":"{\"command\":\"WriteFile\",\"path\":\"src/a.py\",\"content\":\"print(1)\"}"}]}"#;
        let plan = adapter.parse_plan(body).unwrap();
        assert_eq!(plan.command, "WriteFile");
        assert_eq!(plan.path, "src/a.py");
    }

    #[test]
    fn test_missing_envelope_field_is_parse_error() {
        let adapter = AnthropicAdapter;
        let err = adapter.parse_chat(r#"{"unexpected": true}"#).unwrap_err();
        assert!(err.to_string().contains("anthropic"));
    }

    #[test]
    fn test_conversation_payload_preserves_roles() {
        let adapter = AnthropicAdapter;
        let history = vec![
            ChatTurn::new("user", "q"),
            ChatTurn::new("assistant", "a"),
        ];
        let payload = adapter.build_conversation_payload("sys", &history, "m");
        assert_eq!(payload["messages"][1]["role"], "assistant");
    }
}
