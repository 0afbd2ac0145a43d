//! Orchestration core: the model client, the response interpreter, and the
//! coordinator that routes operations through policy to the executors.

pub mod controls;
pub mod coordinator;
pub mod error;
pub mod instructions;
pub mod interpreter;
pub mod model_client;
pub mod routing;
pub mod types;

pub use controls::{ExecutionControls, ExecutionState};
pub use coordinator::{Coordinator, Prompter, StdinPrompter};
pub use error::CoreError;
pub use interpreter::Interpreted;
pub use model_client::{ModelBackend, ModelClient};
pub use types::Operation;
