//! Loading and persisting the policy document at its well-known location.

use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::document::PolicyDocument;

pub const POLICY_FILE: &str = "policy.json";

#[derive(Debug, Error)]
pub enum PolicyError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Policy parse error: {0}")]
    Parse(#[from] serde_json::Error),
    #[error("Policy validation failed: {0}")]
    Validation(String),
}

/// Reads and writes `policy.json` inside the hidden per-project state
/// directory.
pub struct PolicyStore {
    state_dir: PathBuf,
}

impl PolicyStore {
    pub fn new<P: AsRef<Path>>(state_dir: P) -> Self {
        Self {
            state_dir: state_dir.as_ref().to_path_buf(),
        }
    }

    pub fn policy_path(&self) -> PathBuf {
        self.state_dir.join(POLICY_FILE)
    }

    /// Load the document, writing the defaults first when none exists. Parse
    /// or validation failure is returned to the caller; there is no implicit
    /// repair.
    pub fn load_or_init(&self) -> Result<PolicyDocument, PolicyError> {
        let path = self.policy_path();

        if !path.exists() {
            tracing::info!(path = %path.display(), "creating default policy document");
            self.save(&PolicyDocument::default())?;
        }

        let content = fs::read_to_string(&path)?;
        let document: PolicyDocument = serde_json::from_str(&content)?;
        document.validate()?;
        Ok(document)
    }

    pub fn save(&self, document: &PolicyDocument) -> Result<(), PolicyError> {
        document.validate()?;
        fs::create_dir_all(&self.state_dir)?;

        let path = self.policy_path();
        let tmp = path.with_extension("tmp");
        fs::write(&tmp, serde_json::to_string_pretty(document)?)?;
        fs::rename(&tmp, &path)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_load_or_init_writes_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path());

        let loaded = store.load_or_init().unwrap();
        assert_eq!(loaded, PolicyDocument::default());
        assert!(store.policy_path().exists());
    }

    #[test]
    fn test_round_trip_preserves_document() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path());

        let mut doc = PolicyDocument::default();
        doc.global.max_file_size_mb = 42;
        store.save(&doc).unwrap();

        let loaded = store.load_or_init().unwrap();
        assert_eq!(loaded.global.max_file_size_mb, 42);
    }

    #[test]
    fn test_malformed_document_is_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path());
        fs::create_dir_all(dir.path()).unwrap();
        fs::write(store.policy_path(), "{not json").unwrap();

        assert!(matches!(store.load_or_init(), Err(PolicyError::Parse(_))));
    }

    #[test]
    fn test_invalid_document_is_rejected_on_load() {
        let dir = tempfile::tempdir().unwrap();
        let store = PolicyStore::new(dir.path());

        let mut doc = PolicyDocument::default();
        store.save(&doc).unwrap();
        // corrupt it on disk past validation
        doc.global.blocked_extensions.push("exe".into());
        fs::write(
            store.policy_path(),
            serde_json::to_string_pretty(&doc).unwrap(),
        )
        .unwrap();

        assert!(matches!(
            store.load_or_init(),
            Err(PolicyError::Validation(_))
        ));
    }
}
