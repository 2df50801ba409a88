//! Merge rules: defaults first, then global file, workspace files, environment.

use config::Config;
use config::ConfigBuilder;
use config::ConfigError;

/// Create a Config builder with merge policy defaults applied.
pub fn builder_with_defaults() -> Result<ConfigBuilder<config::builder::DefaultState>, ConfigError>
{
    Config::builder()
        .set_default("endpoint.base_url", "http://127.0.0.1:2866")?
        .set_default("endpoint.connect_timeout_secs", 10)?
        .set_default("endpoint.request_timeout_secs", 120)?
        .set_default("workspace.id", "local")?
        .set_default("workspace.name", "local")?
        .set_default("listener.host", "127.0.0.1")?
        .set_default("listener.port_lower_bound", 10000)?
        .set_default("listener.port_upper_bound", i64::from(u16::MAX))?
        .set_default("listener.stop_grace_ms", 200)?
        .set_default("credentials.token_env", "GITHUB_TOKEN")?
        .set_default("client.tag", "cli")
}
