//! Invocation model: arguments, the invocation sent to the automation process, and
//! the result it answers with.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A name/value pair.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub value: String,
}

impl Argument {
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
        }
    }
}

/// Ordered set of arguments keyed by name. Inserting an existing name replaces its
/// value in place, so the latest write wins and first-seen order is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArgumentSet {
    entries: Vec<Argument>,
}

impl ArgumentSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        match self.entries.iter_mut().find(|arg| arg.name == name) {
            Some(existing) => existing.value = value,
            None => self.entries.push(Argument { name, value }),
        }
    }

    /// Merge `other` into `self`; entries from `other` win.
    pub fn merge(&mut self, other: ArgumentSet) {
        for arg in other.entries {
            self.insert(arg.name, arg.value);
        }
    }

    pub fn get(&self, name: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|arg| arg.name == name)
            .map(|arg| arg.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.get(name).is_some()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Argument> {
        self.entries.iter()
    }

    pub fn to_vec(&self) -> Vec<Argument> {
        self.entries.clone()
    }
}

impl<N: Into<String>, V: Into<String>> FromIterator<(N, V)> for ArgumentSet {
    fn from_iter<I: IntoIterator<Item = (N, V)>>(iter: I) -> Self {
        let mut set = ArgumentSet::new();
        for (name, value) in iter {
            set.insert(name, value);
        }
        set
    }
}

impl IntoIterator for ArgumentSet {
    type Item = Argument;
    type IntoIter = std::vec::IntoIter<Argument>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// A secret handed to the automation process by URI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Secret {
    pub uri: String,
    pub value: String,
}

/// Workspace (team) a command executes under.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Target {
    pub id: String,
    pub name: String,
}

/// One command invocation, built once per run.
#[derive(Debug, Clone, PartialEq)]
pub struct Invocation {
    pub command: String,
    pub parameters: ArgumentSet,
    /// Only mapped parameters that resolved to a value
    pub mapped_parameters: ArgumentSet,
    pub secrets: Vec<Secret>,
    pub target: Target,
    pub correlation_id: Option<String>,
}

impl Invocation {
    pub fn new(command: impl Into<String>, target: Target) -> Self {
        Self {
            command: command.into(),
            parameters: ArgumentSet::new(),
            mapped_parameters: ArgumentSet::new(),
            secrets: Vec::new(),
            target,
            correlation_id: None,
        }
    }
}

/// Reply to an invocation. `code` 0 means success.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InvocationResult {
    pub code: i64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,

    /// The complete decoded response body
    #[serde(skip)]
    pub payload: Value,
}

impl InvocationResult {
    pub fn success() -> Self {
        Self {
            code: 0,
            message: None,
            payload: Value::Null,
        }
    }

    pub fn is_success(&self) -> bool {
        self.code == 0
    }
}
