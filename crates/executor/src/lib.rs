//! Operation executors: the file writer (dry-run + apply) and the shell
//! command runner with persistent working directory.

pub mod command_runner;
pub mod context;
pub mod file_writer;
pub mod guard;

pub use command_runner::{CommandResult, CommandRunner};
pub use context::ExecutionContext;
pub use file_writer::{ApplyResult, DryRunResult, FileWriter};
pub use guard::CommandGuard;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("{0}")]
    Blocked(String),
    #[error("Command timed out")]
    Timeout,
    #[error("Execution failed: {0}")]
    ExecutionFailed(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
