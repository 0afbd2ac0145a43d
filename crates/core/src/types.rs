use serde::{Deserialize, Serialize};

/// A validated operation the coordinator can route to an executor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Operation {
    WriteFile {
        path: String,
        content: String,
        #[serde(default)]
        request_execution: bool,
    },
    ShellCommand {
        command: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        working_directory: Option<String>,
        description: String,
        #[serde(default)]
        request_execution: bool,
    },
}

impl Operation {
    pub fn is_file_operation(&self) -> bool {
        matches!(self, Operation::WriteFile { .. })
    }

    pub fn is_shell_operation(&self) -> bool {
        matches!(self, Operation::ShellCommand { .. })
    }

    /// Human-readable one-line summary. The only conversion between the two
    /// variants: a shell command reduces to its description.
    pub fn summary(&self) -> String {
        match self {
            Operation::WriteFile { path, content, .. } => {
                format!("write {} bytes to '{}'", content.len(), path)
            }
            Operation::ShellCommand {
                command,
                description,
                ..
            } => {
                if description.is_empty() {
                    command.clone()
                } else {
                    description.clone()
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_of_shell_command_uses_description() {
        let op = Operation::ShellCommand {
            command: "make test".into(),
            working_directory: None,
            description: "Run the test suite".into(),
            request_execution: false,
        };
        assert_eq!(op.summary(), "Run the test suite");
        assert!(op.is_shell_operation());
    }

    #[test]
    fn test_tagged_serialization() {
        let op = Operation::WriteFile {
            path: "src/a.rs".into(),
            content: "fn main() {}".into(),
            request_execution: false,
        };
        let json = serde_json::to_value(&op).unwrap();
        assert_eq!(json["type"], "write_file");
        let back: Operation = serde_json::from_value(json).unwrap();
        assert_eq!(op, back);
    }
}
