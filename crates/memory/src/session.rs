//! Per-session conversation log with JSON persistence.
//!
//! Each session is one document under `conversations/` inside the state
//! directory. Saves write the whole document atomically; empty sessions are
//! never persisted.

use std::fs;
use std::path::{Path, PathBuf};

use chrono::Local;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{current_timestamp, Message, Role};

const CHARS_PER_TOKEN: usize = 4;

#[derive(Debug, Error)]
pub enum SessionError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error("Session not found: {0}")]
    NotFound(String),
}

#[derive(Debug, Serialize, Deserialize)]
struct SessionDocument {
    session_id: String,
    created: String,
    last_activity: String,
    last_provider: String,
    message_count: usize,
    messages: Vec<Message>,
}

pub struct ConversationStore {
    session_id: String,
    created: String,
    last_activity: String,
    last_provider: String,
    messages: Vec<Message>,
    storage_dir: PathBuf,
}

impl ConversationStore {
    /// Open a store rooted at `<state_dir>/conversations` with a fresh
    /// session id derived from the local wall clock.
    pub fn new<P: AsRef<Path>>(storage_dir: P) -> Self {
        let now = current_timestamp();
        Self {
            session_id: generate_session_id(),
            created: now.clone(),
            last_activity: now,
            last_provider: String::new(),
            messages: Vec::new(),
            storage_dir: storage_dir.as_ref().to_path_buf(),
        }
    }

    pub fn session_id(&self) -> &str {
        &self.session_id
    }

    pub fn last_provider(&self) -> &str {
        &self.last_provider
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn add_user_message(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::User, content));
    }

    pub fn add_assistant_message(
        &mut self,
        content: impl Into<String>,
        provider: impl Into<String>,
    ) {
        let provider = provider.into();
        self.last_provider = provider.clone();
        self.push(Message::with_provider(Role::Assistant, content, provider));
    }

    pub fn add_system_message(&mut self, content: impl Into<String>) {
        self.push(Message::new(Role::System, content));
    }

    pub fn history(&self) -> Vec<Message> {
        self.messages.clone()
    }

    pub fn history_since(&self, timestamp: &str) -> Vec<Message> {
        self.messages
            .iter()
            .filter(|msg| msg.timestamp.as_str() >= timestamp)
            .cloned()
            .collect()
    }

    pub fn clear_history(&mut self) {
        self.messages.clear();
        self.last_activity = current_timestamp();
    }

    /// Keep only the most recent `n` messages.
    pub fn trim_to_last(&mut self, n: usize) {
        if self.messages.len() > n {
            self.messages.drain(..self.messages.len() - n);
            self.last_activity = current_timestamp();
        }
    }

    /// Keep the most recent messages fitting an approximate token budget,
    /// estimated at four characters per token.
    pub fn trim_to_token_budget(&mut self, max_tokens: usize) {
        let mut tokens = 0usize;
        let mut keep = 0usize;

        for msg in self.messages.iter().rev() {
            tokens += msg.content.len() / CHARS_PER_TOKEN;
            if tokens > max_tokens {
                break;
            }
            keep += 1;
        }

        if keep < self.messages.len() {
            self.messages.drain(..self.messages.len() - keep);
            self.last_activity = current_timestamp();
        }
    }

    /// Start a fresh session, flushing the current one first when it holds
    /// any messages.
    pub fn start_new_session(&mut self) -> Result<(), SessionError> {
        if !self.messages.is_empty() {
            self.save_to_disk()?;
        }

        self.session_id = generate_session_id();
        self.messages.clear();
        self.created = current_timestamp();
        self.last_activity = self.created.clone();
        self.last_provider.clear();
        Ok(())
    }

    /// Persist the whole session atomically. Empty sessions are skipped.
    pub fn save_to_disk(&self) -> Result<(), SessionError> {
        if self.messages.is_empty() {
            return Ok(());
        }

        fs::create_dir_all(&self.storage_dir)?;

        let document = SessionDocument {
            session_id: self.session_id.clone(),
            created: self.created.clone(),
            last_activity: self.last_activity.clone(),
            last_provider: self.last_provider.clone(),
            message_count: self.messages.len(),
            messages: self.messages.clone(),
        };

        let path = self.session_path(&self.session_id);
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(&document)?)?;
        fs::rename(&tmp, &path)?;

        tracing::debug!(session = %self.session_id, path = %path.display(), "session saved");
        Ok(())
    }

    pub fn load_session(&mut self, session_id: &str) -> Result<(), SessionError> {
        let path = self.session_path(session_id);
        if !path.exists() {
            return Err(SessionError::NotFound(session_id.to_string()));
        }

        let content = fs::read_to_string(&path)?;
        let document: SessionDocument = serde_json::from_str(&content)?;

        self.session_id = document.session_id;
        self.created = document.created;
        self.last_activity = document.last_activity;
        self.last_provider = document.last_provider;
        self.messages = document.messages;

        tracing::info!(session = %self.session_id, count = self.messages.len(), "session loaded");
        Ok(())
    }

    /// Stored session ids, newest first by file modification time.
    pub fn available_sessions(&self) -> Vec<String> {
        let Ok(entries) = fs::read_dir(&self.storage_dir) else {
            return Vec::new();
        };

        let mut sessions: Vec<(String, std::time::SystemTime)> = entries
            .flatten()
            .filter_map(|entry| {
                let path = entry.path();
                if path.extension().and_then(|e| e.to_str()) != Some("json") {
                    return None;
                }
                let stem = path.file_stem()?.to_str()?.to_string();
                let modified = entry.metadata().ok()?.modified().ok()?;
                Some((stem, modified))
            })
            .collect();

        sessions.sort_by(|a, b| b.1.cmp(&a.1));
        sessions.into_iter().map(|(id, _)| id).collect()
    }

    fn push(&mut self, message: Message) {
        self.last_activity = message.timestamp.clone();
        self.messages.push(message);
    }

    fn session_path(&self, session_id: &str) -> PathBuf {
        self.storage_dir.join(format!("{}.json", session_id))
    }
}

fn generate_session_id() -> String {
    Local::now().format("session_%Y%m%d_%H%M%S").to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_append_order_and_timestamps() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());

        store.add_user_message("first");
        store.add_assistant_message("second", "anthropic");
        store.add_system_message("third");

        let history = store.history();
        assert_eq!(history.len(), 3);
        assert_eq!(history[0].role, Role::User);
        assert_eq!(history[1].provider.as_deref(), Some("anthropic"));
        assert!(history
            .windows(2)
            .all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(store.last_provider(), "anthropic");
    }

    #[test]
    fn test_save_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());
        store.add_user_message("hello");
        store.add_assistant_message("hi there", "openai");
        store.save_to_disk().unwrap();

        let session_id = store.session_id().to_string();
        let saved_history = store.history();

        let mut reloaded = ConversationStore::new(dir.path());
        reloaded.load_session(&session_id).unwrap();
        assert_eq!(reloaded.history(), saved_history);
        assert_eq!(reloaded.last_provider(), "openai");
    }

    #[test]
    fn test_empty_session_is_never_persisted() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConversationStore::new(dir.path());
        store.save_to_disk().unwrap();
        assert!(store.available_sessions().is_empty());
    }

    #[test]
    fn test_new_session_flushes_previous() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());
        store.add_user_message("keep me");
        let old_id = store.session_id().to_string();

        store.start_new_session().unwrap();
        assert!(store.is_empty());
        assert!(store.available_sessions().contains(&old_id));
    }

    #[test]
    fn test_load_unknown_session_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());
        assert!(matches!(
            store.load_session("session_19700101_000000"),
            Err(SessionError::NotFound(_))
        ));
    }

    #[test]
    fn test_trim_to_last_keeps_tail() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());
        for i in 0..5 {
            store.add_user_message(format!("msg {}", i));
        }
        store.trim_to_last(2);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert_eq!(history[0].content, "msg 3");
    }

    #[test]
    fn test_trim_to_token_budget_keeps_most_recent() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());
        // 40 chars each => ~10 tokens per message
        for i in 0..6 {
            store.add_user_message(format!("{:0>40}", i));
        }
        store.trim_to_token_budget(25);
        let history = store.history();
        assert_eq!(history.len(), 2);
        assert!(history[1].content.ends_with('5'));
    }

    #[test]
    fn test_history_since_filters_by_timestamp() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = ConversationStore::new(dir.path());
        store.add_user_message("old");
        let cutoff = store.history()[0].timestamp.clone();
        store.add_user_message("new");

        let tail = store.history_since(&cutoff);
        assert!(tail.len() >= 1);
        assert_eq!(tail.last().unwrap().content, "new");
    }
}
