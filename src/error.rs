//! Error types for command invocation and parameter resolution.

use thiserror::Error;

/// Errors raised while collecting, sending, or correlating a command invocation.
///
/// A non-zero result code from the automation process is not an error; it is an
/// [`InvocationResult`](crate::invocation::InvocationResult) that reports failure.
#[derive(Debug, Error)]
pub enum InvokeError {
    #[error("Configuration error: {0}")]
    Configuration(String),

    #[error("Cannot resolve required mapped parameter '{name}' ({uri})")]
    Resolution { name: String, uri: String },

    #[error("Invalid value '{value}' for parameter '{name}'{}", hint_suffix(.hint))]
    Validation {
        name: String,
        value: String,
        hint: Option<String>,
    },

    #[error("No free local port between {lower} and {upper}")]
    ResourceExhausted { lower: u16, upper: u16 },

    #[error("Transport error: {0}")]
    Transport(String),

    #[error("Prompt failed: {0}")]
    Prompt(String),

    #[error("Listener error: {0}")]
    Listener(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

fn hint_suffix(hint: &Option<String>) -> String {
    match hint {
        Some(hint) if !hint.is_empty() => format!(": {}", hint),
        _ => String::new(),
    }
}

impl From<config::ConfigError> for InvokeError {
    fn from(err: config::ConfigError) -> Self {
        InvokeError::Configuration(err.to_string())
    }
}

impl From<reqwest::Error> for InvokeError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            InvokeError::Transport(format!("Request timeout: {}", err))
        } else if err.is_connect() {
            InvokeError::Transport(format!("Connection error: {}", err))
        } else if err.is_decode() {
            InvokeError::Transport(format!("Undecodable response body: {}", err))
        } else {
            InvokeError::Transport(format!("HTTP error: {}", err))
        }
    }
}

impl From<dialoguer::Error> for InvokeError {
    fn from(err: dialoguer::Error) -> Self {
        InvokeError::Prompt(err.to_string())
    }
}

impl InvokeError {
    /// True for errors that must stop a run before anything is sent.
    pub fn aborts_before_send(&self) -> bool {
        matches!(
            self,
            InvokeError::Configuration(_)
                | InvokeError::Resolution { .. }
                | InvokeError::ResourceExhausted { .. }
                | InvokeError::Prompt(_)
                | InvokeError::Listener(_)
        )
    }
}
