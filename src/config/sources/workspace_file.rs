//! Workspace config file source: .sdm/config.toml and .sdm/{env}.toml

use config::builder::DefaultState;
use config::ConfigBuilder;
use config::ConfigError;
use config::File;
use std::path::{Path, PathBuf};

/// Directory holding workspace-level config files.
pub fn workspace_config_dir(workspace_root: &Path) -> PathBuf {
    workspace_root.join(".sdm")
}

/// Add workspace config files to builder.
/// Precedence: .sdm/config.toml (base) then .sdm/{SDM_INVOKE_ENV}.toml (env-specific).
pub fn add_to_builder(
    builder: ConfigBuilder<DefaultState>,
    workspace_root: &Path,
) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    let config_dir = workspace_config_dir(workspace_root);
    let env_name = std::env::var("SDM_INVOKE_ENV").unwrap_or_else(|_| "development".to_string());

    let mut builder = builder;

    let base_config_path = config_dir.join("config.toml");
    if base_config_path.exists() {
        builder = builder.add_source(File::from(base_config_path).required(false));
    }

    let env_config_path = config_dir.join(format!("{}.toml", env_name));
    if env_config_path.exists() {
        builder = builder.add_source(File::from(env_config_path).required(false));
    }

    Ok(builder)
}
