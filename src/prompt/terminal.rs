use super::{PromptRequest, Prompter};
use crate::error::InvokeError;
use dialoguer::theme::ColorfulTheme;
use dialoguer::Input;

/// Asks on the controlling terminal. Blocks until a valid answer is entered.
#[derive(Default)]
pub struct TerminalPrompter {
    theme: ColorfulTheme,
}

impl TerminalPrompter {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Prompter for TerminalPrompter {
    fn ask(&mut self, request: &PromptRequest) -> Result<String, InvokeError> {
        let prompt = if request.description.is_empty() {
            request.label.clone()
        } else {
            format!("{} ({})", request.label, request.description)
        };

        let mut input = Input::<String>::with_theme(&self.theme)
            .with_prompt(prompt)
            .allow_empty(true)
            .validate_with(|value: &String| request.check(value));
        if let Some(default) = &request.default {
            input = input.with_initial_text(default.clone());
        }

        Ok(input.interact_text()?)
    }
}

/// For non-interactive runs: any parameter that would need input is a configuration error.
pub struct NoPrompt;

impl Prompter for NoPrompt {
    fn ask(&mut self, request: &PromptRequest) -> Result<String, InvokeError> {
        Err(InvokeError::Configuration(format!(
            "Parameter '{}' needs a value but prompting is disabled",
            request.name
        )))
    }
}
