//! Configuration System
//!
//! Layered configuration for the invoker: built-in defaults, the user's global config
//! file, the workspace config file(s), then `SDM_INVOKE__*` environment overrides.

use crate::error::InvokeError;
use crate::logging::LoggingConfig;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::Path;

mod merge;
mod sources;

pub use sources::global_file::global_config_path;
pub use sources::workspace_file::workspace_config_dir;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct InvokerConfig {
    #[serde(default)]
    pub endpoint: EndpointConfig,

    #[serde(default)]
    pub workspace: WorkspaceConfig,

    #[serde(default)]
    pub listener: ListenerConfig,

    #[serde(default)]
    pub credentials: CredentialsConfig,

    #[serde(default)]
    pub client: ClientConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Where the automation process accepts invocations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct EndpointConfig {
    /// Base URL; an empty value means "not configured"
    #[serde(default = "default_base_url")]
    pub base_url: String,

    #[serde(default = "default_connect_timeout_secs")]
    pub connect_timeout_secs: u64,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
}

fn default_base_url() -> String {
    "http://127.0.0.1:2866".to_string()
}

fn default_connect_timeout_secs() -> u64 {
    10
}

fn default_request_timeout_secs() -> u64 {
    120
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            connect_timeout_secs: default_connect_timeout_secs(),
            request_timeout_secs: default_request_timeout_secs(),
        }
    }
}

impl EndpointConfig {
    /// The configured base endpoint, or `None` when it is blank.
    pub fn base_endpoint(&self) -> Option<&str> {
        let trimmed = self.base_url.trim();
        if trimmed.is_empty() {
            None
        } else {
            Some(trimmed.trim_end_matches('/'))
        }
    }
}

/// Workspace (team) the commands run under.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkspaceConfig {
    #[serde(default = "default_workspace_value")]
    pub id: String,

    #[serde(default = "default_workspace_value")]
    pub name: String,
}

fn default_workspace_value() -> String {
    "local".to_string()
}

impl Default for WorkspaceConfig {
    fn default() -> Self {
        Self {
            id: default_workspace_value(),
            name: default_workspace_value(),
        }
    }
}

/// Local response listener settings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ListenerConfig {
    #[serde(default = "default_listener_host")]
    pub host: String,

    #[serde(default = "default_port_lower_bound")]
    pub port_lower_bound: u16,

    #[serde(default = "default_port_upper_bound")]
    pub port_upper_bound: u16,

    /// Delay before releasing the listener so in-flight messages can land
    #[serde(default = "default_stop_grace_ms")]
    pub stop_grace_ms: u64,

    /// Give up waiting for the completion notification after this long; unset waits forever
    #[serde(default)]
    pub completion_timeout_secs: Option<u64>,
}

fn default_listener_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port_lower_bound() -> u16 {
    10000
}

fn default_port_upper_bound() -> u16 {
    u16::MAX
}

fn default_stop_grace_ms() -> u64 {
    200
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            host: default_listener_host(),
            port_lower_bound: default_port_lower_bound(),
            port_upper_bound: default_port_upper_bound(),
            stop_grace_ms: default_stop_grace_ms(),
            completion_timeout_secs: None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CredentialsConfig {
    /// Environment variable holding the token for the fixed secret scope
    #[serde(default = "default_token_env")]
    pub token_env: String,
}

fn default_token_env() -> String {
    "GITHUB_TOKEN".to_string()
}

impl Default for CredentialsConfig {
    fn default() -> Self {
        Self {
            token_env: default_token_env(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ClientConfig {
    /// Client-type tag that prefixes correlation ids
    #[serde(default = "default_client_tag")]
    pub tag: String,
}

fn default_client_tag() -> String {
    "cli".to_string()
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            tag: default_client_tag(),
        }
    }
}

impl InvokerConfig {
    /// Validate the entire configuration, collecting every problem found.
    pub fn validate(&self) -> Result<(), Vec<String>> {
        let mut errors = Vec::new();

        if self.listener.port_lower_bound > self.listener.port_upper_bound {
            errors.push(format!(
                "listener.port_lower_bound ({}) is above listener.port_upper_bound ({})",
                self.listener.port_lower_bound, self.listener.port_upper_bound
            ));
        }
        if self.listener.host.trim().is_empty() {
            errors.push("listener.host cannot be empty".to_string());
        }
        if self.client.tag.trim().is_empty() {
            errors.push("client.tag cannot be empty".to_string());
        }
        if self.client.tag.contains('-') {
            errors.push("client.tag cannot contain '-'".to_string());
        }
        if self.workspace.id.trim().is_empty() {
            errors.push("workspace.id cannot be empty".to_string());
        }
        if self.credentials.token_env.trim().is_empty() {
            errors.push("credentials.token_env cannot be empty".to_string());
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }

    /// Validate and fold all problems into a single configuration error.
    pub fn ensure_valid(&self) -> Result<(), InvokeError> {
        self.validate().map_err(|errors| {
            InvokeError::Configuration(format!(
                "Configuration validation failed:\n{}",
                errors.join("\n")
            ))
        })
    }
}

/// Loads [`InvokerConfig`] from every configured source.
pub struct ConfigLoader;

impl ConfigLoader {
    /// Load configuration for a workspace directory.
    pub fn load(workspace_root: &Path) -> Result<InvokerConfig, InvokeError> {
        let builder = merge::merge_policy::builder_with_defaults()?;
        let builder = sources::global_file::add_to_builder(builder)?;
        let builder = sources::workspace_file::add_to_builder(builder, workspace_root)?;
        let config = builder
            .add_source(environment_source())
            .build()?
            .try_deserialize::<InvokerConfig>()?;
        Ok(config)
    }

    /// Load configuration from an explicit file; global and workspace files are skipped.
    pub fn load_from_file(path: &Path) -> Result<InvokerConfig, InvokeError> {
        if !path.exists() {
            return Err(InvokeError::Configuration(format!(
                "Config file not found: {}",
                path.display()
            )));
        }
        let config = merge::merge_policy::builder_with_defaults()?
            .add_source(File::from(path).required(true))
            .add_source(environment_source())
            .build()?
            .try_deserialize::<InvokerConfig>()?;
        Ok(config)
    }

    /// Defaults only, ignoring files and environment.
    pub fn defaults() -> Result<InvokerConfig, InvokeError> {
        let config: Config = merge::merge_policy::builder_with_defaults()?.build()?;
        Ok(config.try_deserialize::<InvokerConfig>()?)
    }
}

fn environment_source() -> Environment {
    Environment::with_prefix("SDM_INVOKE")
        .prefix_separator("__")
        .separator("__")
}
