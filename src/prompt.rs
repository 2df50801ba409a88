//! Interactive parameter collection.
//!
//! Supplied values are checked against their declared patterns first; invalid ones
//! only produce a warning. Required parameters that are missing or invalid are then
//! asked for one at a time, in name order, and the answers replace stale entries.

use crate::error::InvokeError;
use crate::invocation::ArgumentSet;
use crate::metadata::{MappedParameterDeclaration, ParameterDeclaration};
use regex::Regex;
use std::collections::HashMap;
use tracing::warn;

mod terminal;

pub use terminal::{NoPrompt, TerminalPrompter};

/// What a prompt accepts.
#[derive(Debug, Clone)]
pub enum InputRule {
    /// Must match the declared pattern
    Pattern { regex: Regex, hint: Option<String> },
    /// Anything but the empty string
    NonEmpty,
}

/// One question put to the user.
#[derive(Debug, Clone)]
pub struct PromptRequest {
    pub name: String,
    pub label: String,
    pub description: String,
    pub default: Option<String>,
    pub rule: InputRule,
}

impl PromptRequest {
    /// Check an answer; the error text names the parameter and the valid-input hint.
    pub fn check(&self, input: &str) -> Result<(), String> {
        match &self.rule {
            InputRule::Pattern { regex, hint } => {
                if regex.is_match(input) {
                    Ok(())
                } else {
                    match hint {
                        Some(hint) if !hint.is_empty() => {
                            Err(format!("Invalid value for '{}': {}", self.name, hint))
                        }
                        _ => Err(format!("Invalid value for '{}'", self.name)),
                    }
                }
            }
            InputRule::NonEmpty => {
                if input.is_empty() {
                    Err(format!("A value for '{}' is required", self.name))
                } else {
                    Ok(())
                }
            }
        }
    }
}

/// Source of answers. Implementations keep asking until `request.check` passes.
pub trait Prompter {
    fn ask(&mut self, request: &PromptRequest) -> Result<String, InvokeError>;
}

/// Declared patterns compiled once per collection pass. Unparseable patterns are
/// warned about here and then treated as absent.
struct DeclaredPatterns<'a> {
    compiled: HashMap<&'a str, Regex>,
}

impl<'a> DeclaredPatterns<'a> {
    fn compile(declarations: &'a [ParameterDeclaration]) -> Self {
        let compiled = declarations
            .iter()
            .filter_map(|declaration| {
                let pattern = declaration.pattern.as_deref()?;
                match Regex::new(pattern) {
                    Ok(regex) => Some((declaration.name.as_str(), regex)),
                    Err(e) => {
                        warn!(
                            parameter = %declaration.name,
                            pattern,
                            error = %e,
                            "Ignoring unparseable parameter pattern"
                        );
                        None
                    }
                }
            })
            .collect();
        Self { compiled }
    }

    fn is_valid(&self, declaration: &ParameterDeclaration, value: &str) -> bool {
        self.compiled
            .get(declaration.name.as_str())
            .map(|regex| regex.is_match(value))
            .unwrap_or(true)
    }

    fn rule(&self, declaration: &ParameterDeclaration) -> InputRule {
        match self.compiled.get(declaration.name.as_str()) {
            Some(regex) => InputRule::Pattern {
                regex: regex.clone(),
                hint: declaration.valid_input.clone(),
            },
            None => InputRule::NonEmpty,
        }
    }

    fn invalid_supplied(
        &self,
        declarations: &[ParameterDeclaration],
        args: &ArgumentSet,
    ) -> Vec<InvokeError> {
        declarations
            .iter()
            .filter_map(|declaration| {
                let value = args.get(&declaration.name)?;
                if self.is_valid(declaration, value) {
                    None
                } else {
                    Some(InvokeError::Validation {
                        name: declaration.name.clone(),
                        value: value.to_string(),
                        hint: declaration.valid_input.clone(),
                    })
                }
            })
            .collect()
    }

    fn needing_input<'d>(
        &self,
        declarations: &'d [ParameterDeclaration],
        args: &ArgumentSet,
    ) -> Vec<&'d ParameterDeclaration> {
        let mut needed: Vec<&ParameterDeclaration> = declarations
            .iter()
            .filter(|declaration| declaration.required)
            .filter(|declaration| match args.get(&declaration.name) {
                None => true,
                Some(value) => !self.is_valid(declaration, value),
            })
            .collect();
        needed.sort_by(|a, b| a.name.cmp(&b.name));
        needed
    }
}

/// Validation failures for values already present in `args`.
pub fn invalid_supplied_values(
    declarations: &[ParameterDeclaration],
    args: &ArgumentSet,
) -> Vec<InvokeError> {
    DeclaredPatterns::compile(declarations).invalid_supplied(declarations, args)
}

/// Required declarations that are absent or hold an invalid value, sorted by name.
pub fn parameters_needing_input<'a>(
    declarations: &'a [ParameterDeclaration],
    args: &ArgumentSet,
) -> Vec<&'a ParameterDeclaration> {
    DeclaredPatterns::compile(declarations).needing_input(declarations, args)
}

/// Required mapped declarations with no value, sorted by name.
pub fn mapped_parameters_needing_input<'a>(
    declarations: &'a [MappedParameterDeclaration],
    mapped: &ArgumentSet,
) -> Vec<&'a MappedParameterDeclaration> {
    let mut needed: Vec<&MappedParameterDeclaration> = declarations
        .iter()
        .filter(|declaration| declaration.required && !mapped.contains(&declaration.name))
        .collect();
    needed.sort_by(|a, b| a.name.cmp(&b.name));
    needed
}

/// Warn about invalid supplied values, prompt for what is still needed, and merge.
pub fn fill_parameters(
    prompter: &mut dyn Prompter,
    declarations: &[ParameterDeclaration],
    mut args: ArgumentSet,
) -> Result<ArgumentSet, InvokeError> {
    let patterns = DeclaredPatterns::compile(declarations);
    for invalid in patterns.invalid_supplied(declarations, &args) {
        warn!("{}", invalid);
    }

    let mut answers = ArgumentSet::new();
    for declaration in patterns.needing_input(declarations, &args) {
        let request = PromptRequest {
            name: declaration.name.clone(),
            label: declaration.label().to_string(),
            description: declaration.description.clone(),
            default: declaration.default_value.clone(),
            rule: patterns.rule(declaration),
        };
        let value = prompter.ask(&request)?;
        answers.insert(declaration.name.clone(), value);
    }

    args.merge(answers);
    Ok(args)
}

/// Prompt for required mapped parameters that no resolver could supply.
pub fn fill_mapped_parameters(
    prompter: &mut dyn Prompter,
    declarations: &[MappedParameterDeclaration],
    mut mapped: ArgumentSet,
) -> Result<ArgumentSet, InvokeError> {
    let mut answers = ArgumentSet::new();
    for declaration in mapped_parameters_needing_input(declarations, &mapped) {
        let request = PromptRequest {
            name: declaration.name.clone(),
            label: declaration.name.clone(),
            description: declaration.uri.clone(),
            default: None,
            rule: InputRule::NonEmpty,
        };
        let value = prompter.ask(&request)?;
        answers.insert(declaration.name.clone(), value);
    }

    mapped.merge(answers);
    Ok(mapped)
}
