//! The plan wire contract: the JSON object a model returns in plan mode.

use serde::{Deserialize, Serialize};

use crate::traits::ProviderError;

/// A structured write-file plan. `command` distinguishes the plan kind
/// (`"WriteFile"` or `"BashCommand"` as instructed by the model client);
/// `request_execution` marks that the model wants the result executed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WriteFileCommand {
    pub command: String,
    pub path: String,
    pub content: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub request_execution: bool,
}

impl WriteFileCommand {
    /// Parse the inner plan JSON a vendor envelope carried as text.
    pub fn from_plan_text(provider: &'static str, text: &str) -> Result<Self, ProviderError> {
        serde_json::from_str(text).map_err(|e| ProviderError::Parse {
            provider,
            message: format!("plan payload is not a valid command object: {}", e),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_trip_preserves_all_fields() {
        let cmd = WriteFileCommand {
            command: "WriteFile".into(),
            path: "src/a.txt".into(),
            content: "hi".into(),
            request_execution: true,
        };
        let json = serde_json::to_string(&cmd).unwrap();
        let back: WriteFileCommand = serde_json::from_str(&json).unwrap();
        assert_eq!(cmd, back);
    }

    #[test]
    fn test_request_execution_defaults_to_false() {
        let cmd: WriteFileCommand =
            serde_json::from_str(r#"{"command":"WriteFile","path":"src/a","content":"x"}"#)
                .unwrap();
        assert!(!cmd.request_execution);
    }

    #[test]
    fn test_missing_required_field_is_a_parse_error() {
        let err = WriteFileCommand::from_plan_text("anthropic", r#"{"command":"WriteFile"}"#)
            .unwrap_err();
        assert!(err.to_string().contains("anthropic"));
    }
}
