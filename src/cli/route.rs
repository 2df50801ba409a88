//! CLI route: single route table and run context. Wires config, context capture, the
//! invoker, and the orchestrator for each command.

use crate::cli::output::{CommandOutput, ConsoleMessages};
use crate::cli::parse::{Commands, ConfigCommands};
use crate::cli::presentation::{format_command_table, format_registration_json};
use crate::cli::command_name;
use crate::config::{ConfigLoader, InvokerConfig};
use crate::context::ExecutionContext;
use crate::correlation::{CorrelationIdGenerator, CorrelationOptions, DEFAULT_CHANNEL};
use crate::error::InvokeError;
use crate::github::{translate_push, PushPayload};
use crate::hooks::ConsoleHook;
use crate::invocation::{ArgumentSet, Target};
use crate::invoker::{CommandInvoker, HttpCommandInvoker};
use crate::orchestrator::{ExitDisposition, ListenerSettings, Orchestrator};
use crate::port::PortAllocator;
use crate::prompt::{NoPrompt, Prompter, TerminalPrompter};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info};

/// Runtime context for CLI execution: workspace root, effective config, and an
/// environment snapshot taken once at startup.
pub struct RunContext {
    workspace_root: PathBuf,
    config: InvokerConfig,
    env: Vec<(String, String)>,
    color: bool,
}

impl RunContext {
    /// Create run context from workspace root and optional config path. Uses ConfigLoader only.
    pub fn new(workspace_root: PathBuf, config_path: Option<PathBuf>) -> Result<Self, InvokeError> {
        let config = if let Some(ref cfg_path) = config_path {
            ConfigLoader::load_from_file(cfg_path)?
        } else {
            ConfigLoader::load(&workspace_root)?
        };
        Self::from_config(workspace_root, config, std::env::vars())
    }

    /// Run context over an already-loaded config and an explicit environment.
    pub fn from_config<I>(
        workspace_root: PathBuf,
        config: InvokerConfig,
        env: I,
    ) -> Result<Self, InvokeError>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        config.ensure_valid()?;
        let color = config.logging.color;
        Ok(Self {
            workspace_root,
            config,
            env: env.into_iter().collect(),
            color,
        })
    }

    pub fn with_color(mut self, color: bool) -> Self {
        self.color = color;
        self
    }

    pub fn config(&self) -> &InvokerConfig {
        &self.config
    }

    pub fn execute(&self, command: &Commands) -> Result<CommandOutput, InvokeError> {
        debug!(command = %command_name(command), "Dispatching command");
        match command {
            Commands::Run {
                command,
                params,
                mapped,
                repo_dir,
                no_prompt,
            } => self.handle_run(command, params, mapped, repo_dir.as_deref(), *no_prompt),
            Commands::List { format } => self.handle_list(format),
            Commands::Push { payload } => self.handle_push(payload),
            Commands::Config { command } => self.handle_config(command),
        }
    }

    fn handle_run(
        &self,
        command: &str,
        params: &[(String, String)],
        mapped: &[(String, String)],
        repo_dir: Option<&Path>,
        no_prompt: bool,
    ) -> Result<CommandOutput, InvokeError> {
        let repo_dir = repo_dir.unwrap_or(&self.workspace_root);
        let repo_dir = std::fs::canonicalize(repo_dir).unwrap_or_else(|_| repo_dir.to_path_buf());
        let context = mapped.iter().fold(
            ExecutionContext::capture(&self.config, &repo_dir, self.env.iter().cloned()),
            |context, (name, value)| context.with_override(name.clone(), value.clone()),
        );

        let listener = &self.config.listener;
        let ports = Arc::new(PortAllocator::with_range(
            listener.host.clone(),
            listener.port_lower_bound,
            listener.port_upper_bound,
        ));
        let correlation = self.correlation(&context, Arc::clone(&ports));
        let invoker = Arc::new(HttpCommandInvoker::new(
            self.config.endpoint.clone(),
            Arc::clone(&correlation),
            context.token.clone(),
        )?);
        let prompter: Box<dyn Prompter> = if no_prompt {
            Box::new(NoPrompt)
        } else {
            Box::new(TerminalPrompter::new())
        };
        let settings = ListenerSettings {
            host: listener.host.clone(),
            grace: Duration::from_millis(listener.stop_grace_ms),
            completion_timeout: listener.completion_timeout_secs.map(Duration::from_secs),
        };
        let cli_args: ArgumentSet = params.iter().cloned().collect();

        let rt = runtime()?;
        rt.block_on(async move {
            let registration = invoker.registration().await?;
            let metadata = registration.command(command)?.clone();
            info!(command = %metadata.name, "Running command handler");

            let invoker: Arc<dyn CommandInvoker> = invoker;
            let mut orchestrator = Orchestrator::new(
                context,
                ports,
                correlation,
                invoker,
                prompter,
                Arc::new(ConsoleMessages),
            )
            .with_listener_settings(settings)
            .with_hook(ConsoleHook::new(self.color));

            let outcome = orchestrator.run(&metadata, cli_args).await?;
            let disposition = outcome.finish().await?;
            Ok(match disposition {
                ExitDisposition::Failed => CommandOutput::failure(""),
                _ => CommandOutput::success(""),
            })
        })
    }

    fn handle_list(&self, format: &str) -> Result<CommandOutput, InvokeError> {
        let ports = Arc::new(PortAllocator::new(self.config.listener.host.clone()));
        let correlation = Arc::new(CorrelationIdGenerator::new(
            self.config.client.tag.clone(),
            std::process::id(),
            ports,
        ));
        let invoker = HttpCommandInvoker::new(self.config.endpoint.clone(), correlation, None)?;
        let registration = runtime()?.block_on(invoker.registration())?;
        let text = match format {
            "json" => format_registration_json(&registration)?,
            "text" => format_command_table(&registration),
            other => {
                return Err(InvokeError::Configuration(format!(
                    "Unknown format '{}' (expected text or json)",
                    other
                )))
            }
        };
        Ok(CommandOutput::success(text))
    }

    fn handle_push(&self, payload_path: &Path) -> Result<CommandOutput, InvokeError> {
        let raw = std::fs::read_to_string(payload_path)?;
        let payload: PushPayload = serde_json::from_str(&raw).map_err(|e| {
            InvokeError::Configuration(format!(
                "Invalid push payload {}: {}",
                payload_path.display(),
                e
            ))
        })?;

        let context = ExecutionContext::capture(
            &self.config,
            &self.workspace_root,
            self.env.iter().cloned(),
        );
        let ports = Arc::new(PortAllocator::new(self.config.listener.host.clone()));
        let correlation = self.correlation(&context, ports);
        let channel = if payload.repository.name.is_empty() {
            DEFAULT_CHANNEL.to_string()
        } else {
            payload.repository.name.clone()
        };
        let correlation_id = correlation.new_correlation_id(&CorrelationOptions::channel(channel))?;
        let workspace = Target {
            id: context.workspace_id.clone(),
            name: context.workspace_name.clone(),
        };
        let event = translate_push(&payload, &workspace, &correlation_id)?;

        let invoker = HttpCommandInvoker::new(
            self.config.endpoint.clone(),
            correlation,
            context.token.clone(),
        )?;
        let result = runtime()?.block_on(invoker.post_event(event.as_value()))?;
        info!(correlation_id = %correlation_id, code = result.code, "Push event sent");

        if result.is_success() {
            Ok(CommandOutput::success(format!(
                "Push to {} sent ({})",
                payload.repository.name, correlation_id
            )))
        } else {
            Ok(CommandOutput::failure(format!(
                "Push event rejected with code {}{}",
                result.code,
                result
                    .message
                    .map(|m| format!(": {}", m))
                    .unwrap_or_default()
            )))
        }
    }

    fn handle_config(&self, command: &ConfigCommands) -> Result<CommandOutput, InvokeError> {
        match command {
            ConfigCommands::Show => {
                let text = toml::to_string_pretty(&self.config).map_err(|e| {
                    InvokeError::Configuration(format!("Failed to render config: {}", e))
                })?;
                Ok(CommandOutput::success(text))
            }
        }
    }

    fn correlation(
        &self,
        context: &ExecutionContext,
        ports: Arc<PortAllocator>,
    ) -> Arc<CorrelationIdGenerator> {
        Arc::new(CorrelationIdGenerator::new(
            self.config.client.tag.clone(),
            context.pid,
            ports,
        ))
    }
}

fn runtime() -> Result<tokio::runtime::Runtime, InvokeError> {
    tokio::runtime::Runtime::new()
        .map_err(|e| InvokeError::Configuration(format!("Failed to create async runtime: {}", e)))
}
