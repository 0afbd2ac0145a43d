//! File write executor: a pure dry-run preview and an apply step that
//! creates parent directories and writes the content.

use std::fs;
use std::path::Path;

use chrono::Utc;

use crate::context::ExecutionContext;

#[derive(Debug, Clone)]
pub struct DryRunResult {
    pub success: bool,
    pub description: String,
    pub error_message: String,
}

#[derive(Debug, Clone)]
pub struct ApplyResult {
    pub success: bool,
    pub description: String,
    pub error_message: String,
    pub context: ExecutionContext,
}

/// Stateless file writer. Failures are reported in the result value so the
/// caller can surface them alongside the execution context.
#[derive(Debug, Default)]
pub struct FileWriter;

impl FileWriter {
    pub fn new() -> Self {
        Self
    }

    /// Describe what `apply` would do. Never touches the filesystem beyond
    /// an existence check.
    pub fn dry_run(&self, path: &str, content: &str) -> DryRunResult {
        let description = if Path::new(path).exists() {
            format!(
                "will overwrite existing file '{}' with {} bytes",
                path,
                content.len()
            )
        } else {
            format!("will create new file '{}' with {} bytes", path, content.len())
        };

        DryRunResult {
            success: true,
            description,
            error_message: String::new(),
        }
    }

    pub fn apply(&self, path: &str, content: &str) -> ApplyResult {
        let cwd_before = current_dir_string();

        let outcome = self.write_file(path, content);

        let mut context = ExecutionContext {
            working_directory_before: cwd_before,
            working_directory_after: current_dir_string(),
            timestamp: Utc::now(),
            ..Default::default()
        };

        match outcome {
            Ok(()) => {
                let description = format!("wrote {} bytes to '{}'", content.len(), path);
                context.stdout = description.clone();
                ApplyResult {
                    success: true,
                    description,
                    error_message: String::new(),
                    context,
                }
            }
            Err(e) => {
                context.exit_code = 1;
                context.stderr = e.to_string();
                ApplyResult {
                    success: false,
                    description: String::new(),
                    error_message: e.to_string(),
                    context,
                }
            }
        }
    }

    fn write_file(&self, path: &str, content: &str) -> std::io::Result<()> {
        if let Some(parent) = Path::new(path).parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }
        fs::write(path, content)?;
        tracing::debug!(path, bytes = content.len(), "file written");
        Ok(())
    }
}

fn current_dir_string() -> String {
    std::env::current_dir()
        .map(|p| p.to_string_lossy().into_owned())
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dry_run_for_new_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        let writer = FileWriter::new();

        let result = writer.dry_run(path.to_str().unwrap(), "hi");
        assert!(result.success);
        assert!(result.description.contains("create new file"));
        assert!(result.description.contains("2 bytes"));
        assert!(!path.exists(), "dry run must not touch the filesystem");
    }

    #[test]
    fn test_dry_run_for_existing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.txt");
        fs::write(&path, "old").unwrap();
        let writer = FileWriter::new();

        let result = writer.dry_run(path.to_str().unwrap(), "new content");
        assert!(result.description.contains("overwrite existing file"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "old");
    }

    #[test]
    fn test_apply_creates_parent_directories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested/deep/a.txt");
        let writer = FileWriter::new();

        let result = writer.apply(path.to_str().unwrap(), "hi");
        assert!(result.success, "{}", result.error_message);
        assert!(result.description.contains("2 bytes"));
        assert_eq!(fs::read_to_string(&path).unwrap(), "hi");
        assert_eq!(result.context.exit_code, 0);
        assert!(!result.context.working_directory_before.is_empty());
    }

    #[test]
    fn test_apply_failure_reports_error_text() {
        let dir = tempfile::tempdir().unwrap();
        // a directory at the target path makes the write fail
        let path = dir.path().join("occupied");
        fs::create_dir(&path).unwrap();
        let writer = FileWriter::new();

        let result = writer.apply(path.to_str().unwrap(), "content");
        assert!(!result.success);
        assert!(!result.error_message.is_empty());
        assert_eq!(result.context.exit_code, 1);
    }
}
