//! Gemini generateContent API: `contents` turns with per-turn `parts`, the
//! assistant role spelled `model`, system prompt in `systemInstruction`, and
//! the API key as a URL query parameter.

use serde_json::{json, Value};

use crate::plan::WriteFileCommand;
use crate::traits::{ChatTurn, ProviderAdapter, ProviderError, MAX_TOKENS, TEMPERATURE};

const BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Default)]
pub struct GeminiAdapter;

impl GeminiAdapter {
    fn extract_text(&self, raw_body: &str) -> Result<String, ProviderError> {
        let body: Value = serde_json::from_str(raw_body).map_err(|e| ProviderError::Parse {
            provider: self.name(),
            message: e.to_string(),
        })?;

        body["candidates"]
            .get(0)
            .and_then(|candidate| candidate["content"]["parts"].get(0))
            .and_then(|part| part["text"].as_str())
            .map(|text| text.to_string())
            .ok_or_else(|| ProviderError::Parse {
                provider: self.name(),
                message: "missing candidates[0].content.parts[0].text in response envelope"
                    .to_string(),
            })
    }
}

/// Strip a leading triple-backtick code fence, with or without a `json`
/// language tag. Gemini wraps plan objects in one even when told not to.
fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(rest) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    let rest = rest.trim_start();
    match rest.find("```") {
        Some(end) => rest[..end].trim(),
        None => rest.trim(),
    }
}

impl ProviderAdapter for GeminiAdapter {
    fn name(&self) -> &'static str {
        "gemini"
    }

    fn default_model(&self) -> &'static str {
        "gemini-1.5-flash"
    }

    fn api_key_env_var(&self) -> &'static str {
        "GEMINI_API_KEY"
    }

    fn full_url(&self, api_key: &str, model: &str) -> String {
        let model = if model.is_empty() {
            self.default_model()
        } else {
            model
        };
        format!("{}/{}:generateContent?key={}", BASE_URL, model, api_key)
    }

    fn build_single_turn_payload(
        &self,
        system_prompt: &str,
        user_prompt: &str,
        _model: &str,
    ) -> Value {
        let combined = format!("{}\n\nUser: {}", system_prompt, user_prompt);
        json!({
            "contents": [
                {"parts": [{"text": combined}]}
            ],
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS
            }
        })
    }

    fn build_conversation_payload(
        &self,
        system_prompt: &str,
        history: &[ChatTurn],
        _model: &str,
    ) -> Value {
        let contents: Vec<Value> = history
            .iter()
            .map(|turn| {
                let role = if turn.role == "assistant" {
                    "model"
                } else {
                    turn.role.as_str()
                };
                json!({
                    "role": role,
                    "parts": [{"text": turn.content}]
                })
            })
            .collect();

        json!({
            "contents": contents,
            "systemInstruction": {
                "role": "user",
                "parts": [{"text": system_prompt}]
            },
            "generationConfig": {
                "temperature": TEMPERATURE,
                "maxOutputTokens": MAX_TOKENS
            }
        })
    }

    fn headers(&self, _api_key: &str) -> Vec<(String, String)> {
        vec![("content-type".into(), "application/json".into())]
    }

    fn parse_plan(&self, raw_body: &str) -> Result<WriteFileCommand, ProviderError> {
        let text = self.extract_text(raw_body)?;
        WriteFileCommand::from_plan_text(self.name(), strip_code_fence(&text))
    }

    fn parse_chat(&self, raw_body: &str) -> Result<String, ProviderError> {
        self.extract_text(raw_body)
    }
}
