use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Snapshot captured around every executor invocation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExecutionContext {
    pub working_directory_before: String,
    pub working_directory_after: String,
    pub stdout: String,
    pub stderr: String,
    pub exit_code: i32,
    pub timestamp: DateTime<Utc>,
}

impl ExecutionContext {
    pub fn has_output(&self) -> bool {
        !self.stdout.is_empty() || !self.stderr.is_empty()
    }

    pub fn combined_output(&self) -> String {
        let mut combined = self.stdout.clone();
        if !self.stderr.is_empty() {
            if !combined.is_empty() {
                combined.push('\n');
            }
            combined.push_str("[stderr]: ");
            combined.push_str(&self.stderr);
        }
        combined
    }
}

impl Default for ExecutionContext {
    fn default() -> Self {
        Self {
            working_directory_before: String::new(),
            working_directory_after: String::new(),
            stdout: String::new(),
            stderr: String::new(),
            exit_code: 0,
            timestamp: Utc::now(),
        }
    }
}
