//! Error taxonomy for the chat session.
//!
//! Only `Configuration` is fatal. Everything else is contained within a single
//! conversation turn: model API errors are reported to the user and the loop
//! continues; tool-side failures are surfaced back to the model as failure
//! results instead of terminating the session.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum GemchatError {
    /// Missing or invalid credential/config. Fatal at startup.
    #[error("configuration error: {0}")]
    Configuration(String),

    /// The completion API call failed. Reported to the user, loop continues.
    #[error("model API error: {0}")]
    ModelApi(String),

    /// The requested tool is not in the server's registry.
    #[error("tool not found: {0}")]
    ToolNotFound(String),

    /// The tool ran but failed.
    #[error("tool '{tool}' failed: {message}")]
    ToolExecution { tool: String, message: String },

    /// The tool server is unreachable or timed out.
    #[error("tool server unreachable: {0}")]
    Transport(String),
}

impl GemchatError {
    /// Whether this error must terminate the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, GemchatError::Configuration(_))
    }

    /// Render this error as failure text for a tool turn, so the model can
    /// see what went wrong and react.
    pub fn as_failure_text(&self) -> String {
        format!("ERROR: {}", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_configuration_is_fatal() {
        assert!(GemchatError::Configuration("no API key".into()).is_fatal());
        assert!(!GemchatError::ModelApi("502".into()).is_fatal());
        assert!(!GemchatError::ToolNotFound("frobnicate".into()).is_fatal());
        assert!(!GemchatError::Transport("connection refused".into()).is_fatal());
    }

    #[test]
    fn test_failure_text_names_the_tool() {
        let err = GemchatError::ToolExecution {
            tool: "get_forecast".into(),
            message: "upstream timeout".into(),
        };
        let text = err.as_failure_text();
        assert!(text.starts_with("ERROR:"));
        assert!(text.contains("get_forecast"));
    }
}
