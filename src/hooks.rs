//! Observers that run around the HTTP call.

use crate::error::InvokeError;
use crate::invocation::{Invocation, InvocationResult};
use owo_colors::OwoColorize;

/// Terminal state of one invocation as seen by hooks.
#[derive(Debug, Clone, Copy)]
pub enum HookOutcome<'a> {
    /// The automation process answered; the code may still report failure
    Completed(&'a InvocationResult),
    /// The call never produced a result
    Failed(&'a InvokeError),
}

/// Runs before an invocation is sent and after its outcome is known.
pub trait InvocationHook: Send + Sync {
    fn before(&self, _invocation: &Invocation) {}

    fn after(&self, _invocation: &Invocation, _outcome: HookOutcome<'_>) {}
}

/// Parameters naming a credential scope are never printed.
const CREDENTIAL_SCOPE_PREFIX: &str = "github://";

/// Prints a short header before sending and a colored status line afterwards.
pub struct ConsoleHook {
    color: bool,
}

impl ConsoleHook {
    pub fn new(color: bool) -> Self {
        Self { color }
    }

    pub fn describe_before(&self, invocation: &Invocation) -> String {
        let mut line = format!("Invoking {}", invocation.command);
        let args: Vec<String> = invocation
            .parameters
            .iter()
            .filter(|arg| !arg.name.starts_with(CREDENTIAL_SCOPE_PREFIX))
            .map(|arg| format!("{}={}", arg.name, arg.value))
            .collect();
        if !args.is_empty() {
            line.push_str(&format!(" [{}]", args.join(", ")));
        }
        if self.color {
            line.bold().to_string()
        } else {
            line
        }
    }

    pub fn describe_after(&self, invocation: &Invocation, outcome: HookOutcome<'_>) -> String {
        let (ok, line) = match outcome {
            HookOutcome::Completed(result) if result.is_success() => {
                (true, format!("✔ {} accepted", invocation.command))
            }
            HookOutcome::Completed(result) => (
                false,
                format!(
                    "✘ {} failed with code {}{}",
                    invocation.command,
                    result.code,
                    result
                        .message
                        .as_deref()
                        .map(|m| format!(": {}", m))
                        .unwrap_or_default()
                ),
            ),
            HookOutcome::Failed(error) => (false, format!("✘ {} not sent: {}", invocation.command, error)),
        };
        match (self.color, ok) {
            (false, _) => line,
            (true, true) => line.green().to_string(),
            (true, false) => line.red().to_string(),
        }
    }
}

impl InvocationHook for ConsoleHook {
    fn before(&self, invocation: &Invocation) {
        println!("{}", self.describe_before(invocation));
    }

    fn after(&self, invocation: &Invocation, outcome: HookOutcome<'_>) {
        println!("{}", self.describe_after(invocation, outcome));
    }
}
