//! The persisted policy document and its validation rules.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::store::PolicyError;

pub const FILE_TOOL: &str = "file-tool";
pub const TODO_TOOL: &str = "todo-tool";
pub const COMMAND_TOOL: &str = "command-tool";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDocument {
    pub version: String,
    pub global: GlobalPolicy,
    pub tools: BTreeMap<String, ToolPolicy>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GlobalPolicy {
    pub blocked_extensions: Vec<String>,
    pub max_file_size_mb: u64,
    pub auto_backup: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolPolicy {
    pub create: OperationPolicy,
    pub read: OperationPolicy,
    pub update: OperationPolicy,
    pub delete: OperationPolicy,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationPolicy {
    pub allowed_directories: Vec<String>,
    pub confirmation_required: bool,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allowed_commands: Vec<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub blocked_commands: Vec<String>,
}

impl OperationPolicy {
    pub fn new(allowed_directories: &[&str], confirmation_required: bool) -> Self {
        Self {
            allowed_directories: allowed_directories.iter().map(|d| d.to_string()).collect(),
            confirmation_required,
            allowed_commands: Vec::new(),
            blocked_commands: Vec::new(),
        }
    }
}

impl Default for PolicyDocument {
    fn default() -> Self {
        let file_tool = ToolPolicy {
            create: OperationPolicy::new(&["src/", "tests/", "docs/"], true),
            read: OperationPolicy::new(&["src/", "tests/", "docs/"], false),
            update: OperationPolicy::new(&["src/", "tests/"], true),
            // empty directory list keeps delete disabled
            delete: OperationPolicy::new(&[], true),
        };

        let todo_tool = ToolPolicy {
            create: OperationPolicy::new(&[], false),
            read: OperationPolicy::new(&[], false),
            update: OperationPolicy::new(&[], false),
            delete: OperationPolicy::new(&[], true),
        };

        let mut command_create = OperationPolicy::new(&[], true);
        command_create.allowed_commands = [
            "make", "cmake", "gcc", "g++", "npm", "cargo", "python", "python3", "pip", "ls",
            "pwd", "find", "grep", "cat", "head", "tail", "wc", "sort", "uniq", "awk", "sed",
            "git", "cd", "echo", "mkdir", "touch",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        command_create.blocked_commands = [
            "rm ", "rmdir", "dd if", "mkfs", "format", "fdisk", "mount", "umount", "chmod 777",
            "chown", "su -", "sudo", "passwd", "systemctl", "shutdown", "reboot", "kill -9",
            "curl", "wget", "netcat",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();

        let command_tool = ToolPolicy {
            create: command_create,
            read: OperationPolicy::new(&[], false),
            update: OperationPolicy::new(&[], true),
            delete: OperationPolicy::new(&[], true),
        };

        let mut tools = BTreeMap::new();
        tools.insert(FILE_TOOL.to_string(), file_tool);
        tools.insert(TODO_TOOL.to_string(), todo_tool);
        tools.insert(COMMAND_TOOL.to_string(), command_tool);

        Self {
            version: "1.0".to_string(),
            global: GlobalPolicy {
                blocked_extensions: vec![".exe".into(), ".so".into(), ".dylib".into()],
                max_file_size_mb: 10,
                auto_backup: false,
            },
            tools,
        }
    }
}

impl PolicyDocument {
    /// Reject any document that violates the structural invariants. Called on
    /// every load and before every save; there is no implicit repair.
    pub fn validate(&self) -> Result<(), PolicyError> {
        for ext in &self.global.blocked_extensions {
            if !ext.starts_with('.') {
                return Err(PolicyError::Validation(format!(
                    "blocked extension '{}' must start with '.'",
                    ext
                )));
            }
        }

        if self.global.max_file_size_mb == 0 || self.global.max_file_size_mb > 1000 {
            return Err(PolicyError::Validation(format!(
                "global.max_file_size_mb must be between 1 and 1000, got {}",
                self.global.max_file_size_mb
            )));
        }

        for (tool_name, tool) in &self.tools {
            if tool_name.is_empty() {
                return Err(PolicyError::Validation("empty tool name".into()));
            }

            for (op_name, op) in [
                ("create", &tool.create),
                ("read", &tool.read),
                ("update", &tool.update),
                ("delete", &tool.delete),
            ] {
                for dir in &op.allowed_directories {
                    if dir.is_empty() {
                        // empty prefix matches any path
                        continue;
                    }
                    if !dir.ends_with('/') {
                        return Err(PolicyError::Validation(format!(
                            "directory '{}' in {}.{} must end with '/'",
                            dir, tool_name, op_name
                        )));
                    }
                    if dir.contains("..") {
                        return Err(PolicyError::Validation(format!(
                            "directory '{}' in {}.{} contains '..'",
                            dir, tool_name, op_name
                        )));
                    }
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_document_validates() {
        PolicyDocument::default().validate().unwrap();
    }

    #[test]
    fn test_extension_without_leading_dot_is_rejected() {
        let mut doc = PolicyDocument::default();
        doc.global.blocked_extensions.push("exe".into());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_max_file_size_bounds() {
        let mut doc = PolicyDocument::default();
        doc.global.max_file_size_mb = 0;
        assert!(doc.validate().is_err());
        doc.global.max_file_size_mb = 1001;
        assert!(doc.validate().is_err());
        doc.global.max_file_size_mb = 1000;
        assert!(doc.validate().is_ok());
    }

    #[test]
    fn test_directory_must_end_with_slash() {
        let mut doc = PolicyDocument::default();
        doc.tools
            .get_mut(FILE_TOOL)
            .unwrap()
            .create
            .allowed_directories
            .push("build".into());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_directory_with_traversal_is_rejected() {
        let mut doc = PolicyDocument::default();
        doc.tools
            .get_mut(FILE_TOOL)
            .unwrap()
            .create
            .allowed_directories
            .push("../escape/".into());
        assert!(doc.validate().is_err());
    }

    #[test]
    fn test_serde_round_trip() {
        let doc = PolicyDocument::default();
        let json = serde_json::to_string_pretty(&doc).unwrap();
        let back: PolicyDocument = serde_json::from_str(&json).unwrap();
        assert_eq!(doc, back);
    }

    #[test]
    fn test_command_lists_survive_serialization() {
        let doc = PolicyDocument::default();
        let json = serde_json::to_value(&doc).unwrap();
        let create = &json["tools"][COMMAND_TOOL]["create"];
        assert!(create["allowed_commands"].is_array());
        assert!(create["blocked_commands"].is_array());
        // other tools omit the command lists entirely
        assert!(json["tools"][FILE_TOOL]["create"]
            .get("allowed_commands")
            .is_none());
    }
}
