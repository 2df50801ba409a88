//! CLI command-name contract for logging.

use crate::cli::parse::{Commands, ConfigCommands};

/// Command name string for log fields (e.g. "run", "config.show").
pub fn command_name(command: &Commands) -> String {
    match command {
        Commands::Run { .. } => "run".to_string(),
        Commands::List { .. } => "list".to_string(),
        Commands::Push { .. } => "push".to_string(),
        Commands::Config { command } => format!("config.{}", config_command_name(command)),
    }
}

fn config_command_name(command: &ConfigCommands) -> &'static str {
    match command {
        ConfigCommands::Show => "show",
    }
}
