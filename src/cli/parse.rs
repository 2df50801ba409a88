//! CLI parse: clap types for sdm-invoke. No behavior; definitions only.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// sdm-invoke - run command handlers on a software delivery machine
#[derive(Parser)]
#[command(name = "sdm-invoke")]
#[command(about = "Invoke command handlers on a running software delivery machine")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Workspace root directory (config lookup and default repository directory)
    #[arg(long, default_value = ".")]
    pub workspace: PathBuf,

    /// Configuration file path (overrides default config loading)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Enable verbose logging (default: off)
    #[arg(long, default_value = "false")]
    pub verbose: bool,

    /// Log level (trace, debug, info, warn, error, off)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Log format (json, text)
    #[arg(long)]
    pub log_format: Option<String>,

    /// Disable colored output
    #[arg(long)]
    pub no_color: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Invoke a command handler
    Run {
        /// Command handler name
        command: String,

        /// Parameter value, repeatable (name=value)
        #[arg(long = "param", short = 'p', value_parser = parse_key_value)]
        params: Vec<(String, String)>,

        /// Mapped parameter value, repeatable (name=value)
        #[arg(long = "mapped", short = 'm', value_parser = parse_key_value)]
        mapped: Vec<(String, String)>,

        /// Repository directory (defaults to the workspace root)
        #[arg(long)]
        repo_dir: Option<PathBuf>,

        /// Fail instead of prompting for missing parameters
        #[arg(long)]
        no_prompt: bool,
    },
    /// List command handlers registered by the automation process
    List {
        /// Output format (text or json)
        #[arg(long, default_value = "text")]
        format: String,
    },
    /// Send a GitHub push webhook payload as a push event
    Push {
        /// Path to the push payload JSON
        #[arg(long)]
        payload: PathBuf,
    },
    /// Configuration commands
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Subcommand)]
pub enum ConfigCommands {
    /// Show the effective configuration as TOML
    Show,
}

/// Parse `name=value`; the value may itself contain `=`.
pub fn parse_key_value(raw: &str) -> Result<(String, String), String> {
    let (name, value) = raw
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{}'", raw))?;
    let name = name.trim();
    if name.is_empty() {
        return Err(format!("missing parameter name in '{}'", raw));
    }
    Ok((name.to_string(), value.to_string()))
}
