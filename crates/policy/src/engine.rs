//! Policy evaluation over (tool, operation, path) triples and command strings.

use std::path::{Component, Path, PathBuf};

use crate::document::{OperationPolicy, PolicyDocument, COMMAND_TOOL};
use crate::store::PolicyError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CrudOp {
    Create,
    Read,
    Update,
    Delete,
}

impl CrudOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            CrudOp::Create => "create",
            CrudOp::Read => "read",
            CrudOp::Update => "update",
            CrudOp::Delete => "delete",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum CommandVerdict {
    Allowed,
    Denied(String),
}

impl CommandVerdict {
    pub fn is_allowed(&self) -> bool {
        matches!(self, CommandVerdict::Allowed)
    }

    pub fn reason(&self) -> &str {
        match self {
            CommandVerdict::Allowed => "",
            CommandVerdict::Denied(reason) => reason,
        }
    }
}

/// Evaluates paths and commands against a loaded [`PolicyDocument`]. The
/// document is immutable once loaded; [`PolicyEngine::replace`] swaps it
/// whole after re-validation.
pub struct PolicyEngine {
    document: PolicyDocument,
    workdir: PathBuf,
}

impl PolicyEngine {
    pub fn new(document: PolicyDocument, workdir: PathBuf) -> Result<Self, PolicyError> {
        document.validate()?;
        Ok(Self { document, workdir })
    }

    pub fn document(&self) -> &PolicyDocument {
        &self.document
    }

    pub fn workdir(&self) -> &Path {
        &self.workdir
    }

    /// Atomically replace the active document. The old document stays in
    /// force when the replacement fails validation.
    pub fn replace(&mut self, document: PolicyDocument) -> Result<(), PolicyError> {
        document.validate()?;
        self.document = document;
        Ok(())
    }

    /// A path is allowed iff it stays inside the working directory, its
    /// extension is not globally blocked, and some allowed-directory prefix
    /// for (tool, op) matches it.
    pub fn allowed(&self, tool: &str, op: CrudOp, path: &str) -> bool {
        let Some(relative) = self.relative_to_workdir(path) else {
            tracing::debug!(tool, op = op.as_str(), path, "path escapes working directory");
            return false;
        };

        if self.extension_blocked(path) {
            tracing::debug!(tool, path, "extension blocked by policy");
            return false;
        }

        let Some(policy) = self.operation_policy(tool, op) else {
            return false;
        };

        // an empty allowed-directory list disables the operation
        if policy.allowed_directories.is_empty() {
            return false;
        }

        policy
            .allowed_directories
            .iter()
            .any(|dir| dir.is_empty() || relative.starts_with(dir.as_str()))
    }

    /// Evaluate a shell command string. Blocked substrings win over the
    /// allow list; otherwise the first whitespace-delimited token must be a
    /// member of the allow list (an empty allow list permits anything not
    /// blocked).
    pub fn command_allowed(&self, command: &str) -> CommandVerdict {
        let Some(policy) = self.operation_policy(COMMAND_TOOL, CrudOp::Create) else {
            return CommandVerdict::Denied("No command policy configured".to_string());
        };

        for blocked in &policy.blocked_commands {
            if command.contains(blocked.as_str()) {
                return CommandVerdict::Denied("Command contains blocked operation".to_string());
            }
        }

        if policy.allowed_commands.is_empty() {
            return CommandVerdict::Allowed;
        }

        let base = command.split_whitespace().next().unwrap_or("");
        if policy.allowed_commands.iter().any(|c| c == base) {
            CommandVerdict::Allowed
        } else {
            CommandVerdict::Denied("Command not in allowed list".to_string())
        }
    }

    pub fn extension_blocked(&self, path: &str) -> bool {
        let Some(ext) = Path::new(path).extension().and_then(|e| e.to_str()) else {
            return false;
        };
        let dotted = format!(".{}", ext);
        self.document
            .global
            .blocked_extensions
            .iter()
            .any(|blocked| *blocked == dotted)
    }

    pub fn file_size_allowed(&self, size_bytes: u64) -> bool {
        size_bytes <= self.document.global.max_file_size_mb * 1024 * 1024
    }

    pub fn allowed_directories(&self, tool: &str, op: CrudOp) -> Vec<String> {
        self.operation_policy(tool, op)
            .map(|policy| policy.allowed_directories.clone())
            .unwrap_or_default()
    }

    pub fn operation_policy(&self, tool: &str, op: CrudOp) -> Option<&OperationPolicy> {
        let tool = self.document.tools.get(tool)?;
        Some(match op {
            CrudOp::Create => &tool.create,
            CrudOp::Read => &tool.read,
            CrudOp::Update => &tool.update,
            CrudOp::Delete => &tool.delete,
        })
    }

    /// Canonicalize `path` against the working directory without touching the
    /// filesystem (the target usually does not exist yet). Returns the
    /// workdir-relative form, or `None` when the path steps outside it.
    fn relative_to_workdir(&self, path: &str) -> Option<String> {
        let candidate = Path::new(path);
        for component in candidate.components() {
            if matches!(component, Component::ParentDir) {
                return None;
            }
        }

        let relative = if candidate.is_absolute() {
            candidate.strip_prefix(&self.workdir).ok()?.to_path_buf()
        } else {
            candidate.to_path_buf()
        };

        Some(relative.to_string_lossy().into_owned())
    }
}
