//! sdm-invoke CLI Binary
//!
//! Command-line interface for invoking command handlers on a software delivery machine.

use clap::Parser;
use sdm_invoke::cli::{command_name, map_error, Cli, RunContext};
use sdm_invoke::config::ConfigLoader;
use sdm_invoke::logging::{init_logging, LoggingConfig};
use std::process;
use tracing::{error, info};

fn main() {
    let cli = Cli::parse();

    let logging_config = build_logging_config(&cli);
    if let Err(e) = init_logging(&logging_config) {
        eprintln!("Failed to initialize logging: {}", e);
        process::exit(1);
    }

    info!(command = %command_name(&cli.command), "sdm-invoke starting");

    let context = match RunContext::new(cli.workspace.clone(), cli.config.clone()) {
        Ok(ctx) => ctx,
        Err(e) => {
            error!("Error loading configuration: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    };
    let context = if cli.no_color {
        context.with_color(false)
    } else {
        context
    };

    match context.execute(&cli.command) {
        Ok(output) => {
            if !output.text.is_empty() {
                println!("{}", output.text);
            }
            info!(exit_code = output.exit_code, "Command finished");
            process::exit(output.exit_code);
        }
        Err(e) => {
            error!("Command failed: {}", e);
            eprintln!("{}", map_error(&e));
            process::exit(1);
        }
    }
}

/// Build logging configuration from CLI args and the config file.
/// Precedence: CLI flags override config file override defaults.
fn build_logging_config(cli: &Cli) -> LoggingConfig {
    let mut config = if let Some(ref config_path) = cli.config {
        ConfigLoader::load_from_file(config_path)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    } else {
        ConfigLoader::load(&cli.workspace)
            .ok()
            .map(|c| c.logging)
            .unwrap_or_default()
    };

    if cli.verbose {
        config.level = "debug".to_string();
    }
    if let Some(ref level) = cli.log_level {
        config.level = level.clone();
    }
    if let Some(ref format) = cli.log_format {
        config.format = format.clone();
    }
    if cli.no_color {
        config.color = false;
    }
    config
}
