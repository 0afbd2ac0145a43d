//! The model client: owns an adapter and a model name, composes the
//! policy-aware system instructions, and performs the HTTP round-trips.

use async_trait::async_trait;
use reqwest::Client;

use taskforge_memory::Message;
use taskforge_policy::PolicyEngine;
use taskforge_providers::{create_adapter, detect_provider, ChatTurn, ProviderAdapter, WriteFileCommand};

use crate::error::CoreError;
use crate::instructions::{chat_instruction, plan_instruction};

/// The seam the coordinator talks through; [`ModelClient`] is the production
/// implementation.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    fn provider_name(&self) -> String;

    fn model_name(&self) -> String;

    fn set_provider(&mut self, provider: &str, model: Option<&str>) -> Result<(), CoreError>;

    async fn plan(&self, user_text: &str) -> Result<WriteFileCommand, CoreError>;

    async fn chat(&self, user_text: &str) -> Result<String, CoreError>;

    async fn chat_with_history(&self, history: &[Message]) -> Result<String, CoreError>;
}

pub struct ModelClient {
    adapter: Box<dyn ProviderAdapter>,
    api_key: String,
    model: String,
    http: Client,
    plan_instruction: String,
    chat_instruction: String,
}

impl ModelClient {
    /// Build a client for `provider`, or auto-detect one from the
    /// environment. The system instructions are synthesized from the active
    /// policy document once, at construction.
    pub fn new(provider: Option<&str>, policy: &PolicyEngine) -> Result<Self, CoreError> {
        let name = match provider {
            Some(name) => name.to_string(),
            None => detect_provider()?.to_string(),
        };
        let adapter = create_adapter(&name)?;
        let api_key = api_key_for(adapter.as_ref())?;
        let model = adapter.default_model().to_string();

        tracing::info!(provider = %name, model = %model, "model client initialized");

        Ok(Self {
            adapter,
            api_key,
            model,
            http: Client::new(),
            plan_instruction: plan_instruction(policy),
            chat_instruction: chat_instruction(policy),
        })
    }

    async fn round_trip(&self, payload: serde_json::Value) -> Result<String, CoreError> {
        let url = self.adapter.full_url(&self.api_key, &self.model);
        let mut request = self.http.post(&url).json(&payload);
        for (name, value) in self.adapter.headers(&self.api_key) {
            request = request.header(name, value);
        }

        tracing::debug!(provider = self.adapter.name(), "sending model request");

        let response = request.send().await.map_err(|e| CoreError::Transport {
            provider: self.adapter.name().to_string(),
            message: e.to_string(),
        })?;

        let status = response.status();
        let body = response.text().await.map_err(|e| CoreError::Transport {
            provider: self.adapter.name().to_string(),
            message: e.to_string(),
        })?;

        if !status.is_success() {
            return Err(CoreError::Transport {
                provider: self.adapter.name().to_string(),
                message: format!("HTTP {}: {}", status, body),
            });
        }

        Ok(body)
    }
}

#[async_trait]
impl ModelBackend for ModelClient {
    fn provider_name(&self) -> String {
        self.adapter.name().to_string()
    }

    fn model_name(&self) -> String {
        self.model.clone()
    }

    fn set_provider(&mut self, provider: &str, model: Option<&str>) -> Result<(), CoreError> {
        let adapter = create_adapter(provider)?;
        let api_key = api_key_for(adapter.as_ref())?;
        self.model = model
            .map(|m| m.to_string())
            .unwrap_or_else(|| adapter.default_model().to_string());
        self.api_key = api_key;
        self.adapter = adapter;
        tracing::info!(provider, model = %self.model, "provider switched");
        Ok(())
    }

    async fn plan(&self, user_text: &str) -> Result<WriteFileCommand, CoreError> {
        let payload =
            self.adapter
                .build_single_turn_payload(&self.plan_instruction, user_text, &self.model);
        let body = self.round_trip(payload).await?;
        Ok(self.adapter.parse_plan(&body)?)
    }

    async fn chat(&self, user_text: &str) -> Result<String, CoreError> {
        let payload =
            self.adapter
                .build_single_turn_payload(&self.chat_instruction, user_text, &self.model);
        let body = self.round_trip(payload).await?;
        Ok(self.adapter.parse_chat(&body)?)
    }

    async fn chat_with_history(&self, history: &[Message]) -> Result<String, CoreError> {
        let turns: Vec<ChatTurn> = history
            .iter()
            .map(|msg| ChatTurn::new(msg.role.as_str(), msg.content.clone()))
            .collect();
        let payload =
            self.adapter
                .build_conversation_payload(&self.chat_instruction, &turns, &self.model);
        let body = self.round_trip(payload).await?;
        Ok(self.adapter.parse_chat(&body)?)
    }
}

fn api_key_for(adapter: &dyn ProviderAdapter) -> Result<String, CoreError> {
    let var = adapter.api_key_env_var();
    match std::env::var(var) {
        Ok(key) if !key.is_empty() => Ok(key),
        _ => Err(CoreError::Configuration(format!(
            "API key not found for provider {}. Set the {} environment variable.",
            adapter.name(),
            var
        ))),
    }
}
