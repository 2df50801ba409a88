//! Command handler metadata published by the automation process.
//!
//! Declarations are read-only: they describe what a handler accepts and are never
//! mutated by the invoker.

use crate::error::InvokeError;
use serde::{Deserialize, Serialize};

/// An ordinary parameter the user types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterDeclaration {
    pub name: String,

    #[serde(default)]
    pub required: bool,

    /// Regular expression a value must match
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,

    /// Human hint shown when a value does not match `pattern`
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub valid_input: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_value: Option<String>,

    #[serde(default)]
    pub description: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,

    #[serde(default = "default_displayable")]
    pub displayable: bool,
}

fn default_displayable() -> bool {
    true
}

impl ParameterDeclaration {
    /// Declaration with only a name; everything else takes its default.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required: false,
            pattern: None,
            valid_input: None,
            default_value: None,
            description: String::new(),
            display_name: None,
            displayable: true,
        }
    }

    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }

    pub fn with_valid_input(mut self, hint: impl Into<String>) -> Self {
        self.valid_input = Some(hint.into());
        self
    }

    pub fn with_default(mut self, value: impl Into<String>) -> Self {
        self.default_value = Some(value.into());
        self
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Name to show in prompts.
    pub fn label(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }
}

/// A parameter whose value comes from the execution context rather than the user.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MappedParameterDeclaration {
    pub name: String,
    pub uri: String,
    #[serde(default)]
    pub required: bool,
}

impl MappedParameterDeclaration {
    pub fn new(name: impl Into<String>, uri: impl Into<String>, required: bool) -> Self {
        Self {
            name: name.into(),
            uri: uri.into(),
            required,
        }
    }
}

/// A secret a handler asks for by URI.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SecretDeclaration {
    pub name: String,
    pub uri: String,
}

/// Everything the invoker needs to know about one command handler.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandMetadata {
    pub name: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub intent: Vec<String>,

    #[serde(default)]
    pub parameters: Vec<ParameterDeclaration>,

    #[serde(default)]
    pub mapped_parameters: Vec<MappedParameterDeclaration>,

    #[serde(default)]
    pub secrets: Vec<SecretDeclaration>,
}

impl CommandMetadata {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            intent: Vec::new(),
            parameters: Vec::new(),
            mapped_parameters: Vec::new(),
            secrets: Vec::new(),
        }
    }
}

/// Registration document served at `GET {base}/registration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Registration {
    #[serde(default)]
    pub name: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub commands: Vec<CommandMetadata>,
}

impl Registration {
    /// Look up a handler by name.
    pub fn command(&self, name: &str) -> Result<&CommandMetadata, InvokeError> {
        self.commands
            .iter()
            .find(|command| command.name == name)
            .ok_or_else(|| {
                let mut available: Vec<&str> =
                    self.commands.iter().map(|c| c.name.as_str()).collect();
                available.sort_unstable();
                InvokeError::Configuration(format!(
                    "No command '{}' registered by {} (available: {})",
                    name,
                    if self.name.is_empty() { "the automation process" } else { &self.name },
                    if available.is_empty() {
                        "none".to_string()
                    } else {
                        available.join(", ")
                    }
                ))
            })
    }
}
