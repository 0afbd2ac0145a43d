//! Shell command runner with a persistent working directory.
//!
//! The post-execution directory is recovered by appending a sentinel-tagged
//! `pwd` echo to the user command and extracting the tagged line from the
//! captured stdout. The sentinel carries a fresh random token per runner so
//! command output cannot forge it by accident.

use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::time::Instant;

use chrono::{DateTime, Utc};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde::{Deserialize, Serialize};
use tokio::process::Command;
use tokio::time::{timeout, Duration};

use crate::guard::CommandGuard;
use crate::ExecutorError;

pub const DEFAULT_TIMEOUT_MS: u64 = 30_000;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandResult {
    pub command: String,
    pub success: bool,
    pub exit_code: i32,
    pub stdout: String,
    pub stderr: String,
    pub working_directory_before: String,
    pub working_directory_after: String,
    pub started_at: DateTime<Utc>,
    pub duration_ms: u64,
}

pub struct CommandRunner {
    cwd: PathBuf,
    sentinel: String,
    default_timeout_ms: u64,
}

impl CommandRunner {
    pub fn new<P: AsRef<Path>>(initial_cwd: P) -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(12)
            .map(char::from)
            .collect();

        Self {
            cwd: initial_cwd.as_ref().to_path_buf(),
            sentinel: format!("__PWD_{}__", token),
            default_timeout_ms: DEFAULT_TIMEOUT_MS,
        }
    }

    /// The working directory the next command will start in.
    pub fn current_dir(&self) -> &Path {
        &self.cwd
    }

    /// Run `command` through the platform shell. `working_directory`
    /// overrides the persistent directory for this invocation; the persistent
    /// directory is updated to wherever the command ended up.
    pub async fn execute(
        &mut self,
        command: &str,
        working_directory: Option<&Path>,
        timeout_ms: Option<u64>,
    ) -> Result<CommandResult, ExecutorError> {
        CommandGuard::check(command).map_err(ExecutorError::Blocked)?;

        let start_dir = working_directory.unwrap_or(&self.cwd).to_path_buf();
        let started_at = Utc::now();
        let clock = Instant::now();

        // capture the command's status before the sentinel echo so the echo
        // cannot mask a failing exit code
        let script = format!(
            "cd \"{dir}\" || exit $?; {{ {cmd}\n}}; __rc=$?; echo \"{sentinel}$(pwd)\"; exit $__rc",
            dir = start_dir.display(),
            cmd = command,
            sentinel = self.sentinel
        );

        tracing::debug!(command, start_dir = %start_dir.display(), "executing shell command");

        let mut cmd = Command::new("sh");
        cmd.arg("-c")
            .arg(&script)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let timeout_ms = timeout_ms.unwrap_or(self.default_timeout_ms);
        let output = timeout(Duration::from_millis(timeout_ms), cmd.output())
            .await
            .map_err(|_| ExecutorError::Timeout)?
            .map_err(|e| ExecutorError::ExecutionFailed(e.to_string()))?;

        let raw_stdout = String::from_utf8_lossy(&output.stdout).to_string();
        let stderr = String::from_utf8_lossy(&output.stderr).to_string();
        let (stdout, pwd_after) = self.split_sentinel(&raw_stdout);

        let working_directory_after = if pwd_after.is_empty() {
            start_dir.to_string_lossy().into_owned()
        } else {
            pwd_after
        };
        self.cwd = PathBuf::from(&working_directory_after);

        let exit_code = output.status.code().unwrap_or(-1);
        let result = CommandResult {
            command: command.to_string(),
            success: exit_code == 0,
            exit_code,
            stdout,
            stderr,
            working_directory_before: start_dir.to_string_lossy().into_owned(),
            working_directory_after,
            started_at,
            duration_ms: clock.elapsed().as_millis() as u64,
        };

        tracing::debug!(
            exit_code = result.exit_code,
            cwd_after = %result.working_directory_after,
            "command finished"
        );
        Ok(result)
    }

    /// Remove the sentinel line from the captured stdout and return the
    /// directory it carried.
    fn split_sentinel(&self, raw_stdout: &str) -> (String, String) {
        let Some(pos) = raw_stdout.find(&self.sentinel) else {
            return (raw_stdout.to_string(), String::new());
        };

        let value_start = pos + self.sentinel.len();
        let value_end = raw_stdout[value_start..]
            .find('\n')
            .map(|i| value_start + i)
            .unwrap_or(raw_stdout.len());
        let pwd = raw_stdout[value_start..value_end].to_string();

        let line_start = raw_stdout[..pos].rfind('\n').map(|i| i + 1).unwrap_or(0);
        let mut cleaned = String::with_capacity(raw_stdout.len());
        cleaned.push_str(&raw_stdout[..line_start]);
        if value_end < raw_stdout.len() {
            cleaned.push_str(&raw_stdout[value_end + 1..]);
        }

        (cleaned, pwd)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn runner_in(dir: &Path) -> CommandRunner {
        CommandRunner::new(dir)
    }

    #[tokio::test]
    async fn test_captures_stdout_without_sentinel_line() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path());

        let result = runner.execute("echo hello", None, None).await.unwrap();
        assert!(result.success);
        assert_eq!(result.exit_code, 0);
        assert_eq!(result.stdout.trim(), "hello");
        assert!(!result.stdout.contains("__PWD_"));
    }

    #[tokio::test]
    async fn test_persistent_cwd_survives_cd() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir(dir.path().join("build")).unwrap();
        let mut runner = runner_in(dir.path());

        let result = runner.execute("cd build && true", None, None).await.unwrap();
        let expected = dir.path().join("build").canonicalize().unwrap();
        assert_eq!(
            PathBuf::from(&result.working_directory_after).canonicalize().unwrap(),
            expected
        );
        assert_eq!(
            runner.current_dir().canonicalize().unwrap(),
            expected,
            "next command starts where the previous one ended"
        );

        let listed = runner.execute("pwd", None, None).await.unwrap();
        assert_eq!(
            PathBuf::from(listed.stdout.trim()).canonicalize().unwrap(),
            expected
        );
    }

    #[tokio::test]
    async fn test_failure_captures_stderr_and_exit_code() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path());

        let result = runner
            .execute("echo oops >&2; exit 3", None, None)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(result.exit_code, 3);
        assert_eq!(result.stderr.trim(), "oops");
    }

    #[tokio::test]
    async fn test_dangerous_command_is_refused_before_execution() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path());
        let before = runner.current_dir().to_path_buf();

        let err = runner.execute("rm -rf /", None, None).await.unwrap_err();
        match err {
            ExecutorError::Blocked(reason) => {
                assert_eq!(reason, "Command contains blocked operation")
            }
            other => panic!("expected Blocked, got {:?}", other),
        }
        assert_eq!(runner.current_dir(), before, "cwd unchanged on refusal");
    }

    #[tokio::test]
    async fn test_timeout_is_enforced() {
        let dir = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path());

        let err = runner
            .execute("sleep 5", None, Some(100))
            .await
            .unwrap_err();
        assert!(matches!(err, ExecutorError::Timeout));
    }

    #[tokio::test]
    async fn test_working_directory_override() {
        let dir = tempfile::tempdir().unwrap();
        let other = tempfile::tempdir().unwrap();
        let mut runner = runner_in(dir.path());

        let result = runner
            .execute("pwd", Some(other.path()), None)
            .await
            .unwrap();
        assert_eq!(
            PathBuf::from(result.stdout.trim()).canonicalize().unwrap(),
            other.path().canonicalize().unwrap()
        );
    }
}
