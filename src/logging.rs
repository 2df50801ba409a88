//! Logging System
//!
//! Structured logging using the `tracing` crate. Log lines go to stderr by default so
//! that command output written to stdout stays machine readable.

use crate::error::InvokeError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::PathBuf;
use tracing_subscriber::fmt::time::ChronoUtc;
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Registry};

/// Environment variable holding a full `EnvFilter` directive string.
pub const LOG_FILTER_ENV: &str = "SDM_INVOKE_LOG";

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct LoggingConfig {
    /// Log level: trace, debug, info, warn, error, off
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Output format: json, text
    #[serde(default = "default_format")]
    pub format: String,

    /// Output destination: stdout, stderr, file
    #[serde(default = "default_output")]
    pub output: String,

    /// Log file path (used when output is "file")
    #[serde(default)]
    pub file: Option<PathBuf>,

    /// Enable colored output (text format only)
    #[serde(default = "default_true")]
    pub color: bool,

    /// Module-specific log levels
    #[serde(default)]
    pub modules: HashMap<String, String>,
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_format() -> String {
    "text".to_string()
}

fn default_output() -> String {
    "stderr".to_string()
}

fn default_true() -> bool {
    true
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_format(),
            output: default_output(),
            file: None,
            color: default_true(),
            modules: HashMap::new(),
        }
    }
}

/// Initialize the logging system
///
/// Priority order (highest to lowest):
/// 1. `SDM_INVOKE_LOG` filter directives
/// 2. CLI flags (already folded into `config` by the binary)
/// 3. `[logging]` configuration section
/// 4. Defaults
pub fn init_logging(config: &LoggingConfig) -> Result<(), InvokeError> {
    let filter = build_env_filter(config)?;
    let format = validate_format(&config.format)?;
    let writer = build_writer(config)?;
    let use_color = config.color && config.output != "file";

    let base_subscriber = Registry::default().with(filter);

    if format == "json" {
        base_subscriber
            .with(
                fmt::layer()
                    .json()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_writer(writer),
            )
            .try_init()
            .map_err(|e| InvokeError::Configuration(format!("Logging already initialised: {}", e)))
    } else {
        base_subscriber
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_timer(ChronoUtc::rfc_3339())
                    .with_ansi(use_color)
                    .with_writer(writer),
            )
            .try_init()
            .map_err(|e| InvokeError::Configuration(format!("Logging already initialised: {}", e)))
    }
}

/// Build environment filter from the environment or config
fn build_env_filter(config: &LoggingConfig) -> Result<EnvFilter, InvokeError> {
    if let Ok(filter) = EnvFilter::try_from_env(LOG_FILTER_ENV) {
        return Ok(filter);
    }

    if config.level == "off" {
        return Ok(EnvFilter::new("off"));
    }

    let mut filter = EnvFilter::new(&config.level);
    for (module, module_level) in &config.modules {
        let directive = format!("{}={}", module, module_level);
        filter = filter.add_directive(
            directive
                .parse()
                .map_err(|e| InvokeError::Configuration(format!("Invalid log directive: {}", e)))?,
        );
    }

    Ok(filter)
}

fn validate_format(format: &str) -> Result<&str, InvokeError> {
    match format {
        "json" | "text" => Ok(format),
        other => Err(InvokeError::Configuration(format!(
            "Invalid log format: {} (must be 'json' or 'text')",
            other
        ))),
    }
}

fn build_writer(config: &LoggingConfig) -> Result<BoxMakeWriter, InvokeError> {
    match config.output.as_str() {
        "stdout" => Ok(BoxMakeWriter::new(std::io::stdout)),
        "stderr" => Ok(BoxMakeWriter::new(std::io::stderr)),
        "file" => {
            let path = config.file.clone().ok_or_else(|| {
                InvokeError::Configuration("Log output 'file' requires logging.file".to_string())
            })?;
            if let Some(parent) = path.parent() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    InvokeError::Configuration(format!("Failed to create log directory: {}", e))
                })?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(&path)
                .map_err(|e| {
                    InvokeError::Configuration(format!(
                        "Failed to open log file {:?}: {}",
                        path, e
                    ))
                })?;
            Ok(BoxMakeWriter::new(std::sync::Mutex::new(file)))
        }
        other => Err(InvokeError::Configuration(format!(
            "Invalid log output: {} (must be 'stdout', 'stderr', or 'file')",
            other
        ))),
    }
}
