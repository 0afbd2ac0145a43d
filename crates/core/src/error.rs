use thiserror::Error;

/// Error taxonomy shared by the coordinator and the model client. Component
/// boundaries translate lower-level failures into one of these kinds.
#[derive(Debug, Error)]
pub enum CoreError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Policy Denied: {0}")]
    PolicyDenial(String),

    #[error("Parse error from {provider}: {message}")]
    Parse { provider: String, message: String },

    #[error("IO failure: {0}")]
    Io(String),

    #[error("Transport error ({provider}): {message}")]
    Transport { provider: String, message: String },

    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

impl From<taskforge_providers::ProviderError> for CoreError {
    fn from(err: taskforge_providers::ProviderError) -> Self {
        match err {
            taskforge_providers::ProviderError::Parse { provider, message } => CoreError::Parse {
                provider: provider.to_string(),
                message,
            },
            taskforge_providers::ProviderError::Configuration(message) => {
                CoreError::Configuration(message)
            }
        }
    }
}

impl From<taskforge_policy::PolicyError> for CoreError {
    fn from(err: taskforge_policy::PolicyError) -> Self {
        CoreError::Configuration(err.to_string())
    }
}

impl From<taskforge_tasks::TodoError> for CoreError {
    fn from(err: taskforge_tasks::TodoError) -> Self {
        CoreError::InvalidArgument(err.to_string())
    }
}

impl From<std::io::Error> for CoreError {
    fn from(err: std::io::Error) -> Self {
        CoreError::Io(err.to_string())
    }
}
