//! CLI output: error mapping, exit codes, and where listener messages are printed.

use crate::error::InvokeError;
use crate::listener::MessageSink;

/// Text to print and the process exit code.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandOutput {
    pub text: String,
    pub exit_code: i32,
}

impl CommandOutput {
    pub fn success(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: 0,
        }
    }

    pub fn failure(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            exit_code: 1,
        }
    }
}

/// Map domain errors to a string for CLI output.
pub fn map_error(e: &InvokeError) -> String {
    match e {
        InvokeError::Transport(_) => format!(
            "{}\nIs the automation process running? Check endpoint.base_url.",
            e
        ),
        _ => e.to_string(),
    }
}

/// Prints messages the automation process sends to the listener.
pub struct ConsoleMessages;

impl MessageSink for ConsoleMessages {
    fn message(&self, payload: &str) {
        println!("{}", payload);
    }
}
