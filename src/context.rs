//! Execution context captured once at startup and passed explicitly to every
//! component that needs ambient facts (repository location, workspace, user).

use crate::config::InvokerConfig;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// Overrides the OS user name for the "slack user" mapping.
pub const USER_NAME_ENV: &str = "SLACK_USER_NAME";

/// Prefix for per-parameter mapped overrides, e.g. `SDM_MAPPED_OWNER=acme`.
pub const MAPPED_OVERRIDE_PREFIX: &str = "SDM_MAPPED_";

#[derive(Debug, Clone, PartialEq)]
pub struct ExecutionContext {
    pub repository_dir: PathBuf,
    pub workspace_id: String,
    pub workspace_name: String,
    pub os_user: Option<String>,
    pub user_name_override: Option<String>,
    /// Credential material for the fixed secret scope
    pub token: Option<String>,
    pub pid: u32,
    /// Explicit values for mapped parameters, keyed by parameter name
    pub mapped_overrides: BTreeMap<String, String>,
}

impl ExecutionContext {
    /// Context with no ambient facts beyond the ones given.
    pub fn new(
        repository_dir: impl Into<PathBuf>,
        workspace_id: impl Into<String>,
        workspace_name: impl Into<String>,
    ) -> Self {
        Self {
            repository_dir: repository_dir.into(),
            workspace_id: workspace_id.into(),
            workspace_name: workspace_name.into(),
            os_user: None,
            user_name_override: None,
            token: None,
            pid: std::process::id(),
            mapped_overrides: BTreeMap::new(),
        }
    }

    /// Capture the context from configuration and a snapshot of environment variables.
    pub fn capture<I>(config: &InvokerConfig, repository_dir: &Path, env: I) -> Self
    where
        I: IntoIterator<Item = (String, String)>,
    {
        let env: BTreeMap<String, String> = env.into_iter().collect();
        let non_empty = |key: &str| env.get(key).filter(|v| !v.is_empty()).cloned();

        let mapped_overrides = env
            .iter()
            .filter_map(|(key, value)| {
                let name = key.strip_prefix(MAPPED_OVERRIDE_PREFIX)?;
                if name.is_empty() || value.is_empty() {
                    return None;
                }
                Some((name.to_lowercase(), value.clone()))
            })
            .collect();

        Self {
            repository_dir: repository_dir.to_path_buf(),
            workspace_id: config.workspace.id.clone(),
            workspace_name: config.workspace.name.clone(),
            os_user: non_empty("USER").or_else(|| non_empty("USERNAME")),
            user_name_override: non_empty(USER_NAME_ENV),
            token: non_empty(&config.credentials.token_env),
            pid: std::process::id(),
            mapped_overrides,
        }
    }

    pub fn with_override(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.mapped_overrides.insert(name.into(), value.into());
        self
    }

    /// Repository name: the last component of the repository directory.
    pub fn repository_name(&self) -> Option<String> {
        self.repository_dir
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }

    /// Repository owner: the directory containing the repository (`.../owner/repo`).
    pub fn repository_owner(&self) -> Option<String> {
        self.repository_dir
            .parent()
            .and_then(|parent| parent.file_name())
            .map(|name| name.to_string_lossy().into_owned())
            .filter(|name| !name.is_empty())
    }

    /// User name for the "slack user" mapping.
    pub fn user_name(&self) -> Option<String> {
        self.user_name_override
            .clone()
            .or_else(|| self.os_user.clone())
    }
}
