//! Command invocation orchestrator
//!
//! One run per process:
//! `Init → Listening → ArgsCollected → MappedCollected → Prompted → Correlated → Sent →
//! (Completed | Failed) → Exit`.
//!
//! The listener is bound before anything else so a fast callback cannot arrive
//! before there is someone to receive it. Configuration and resolution failures
//! stop the run before the HTTP call; every call outcome reaches the hooks.

use crate::context::ExecutionContext;
use crate::correlation::{CorrelationIdGenerator, CorrelationOptions};
use crate::error::InvokeError;
use crate::hooks::{HookOutcome, InvocationHook};
use crate::invocation::{ArgumentSet, Invocation, InvocationResult, Target};
use crate::invoker::CommandInvoker;
use crate::listener::{ListenerHandle, MessageSink};
use crate::metadata::CommandMetadata;
use crate::port::PortAllocator;
use crate::prompt::{fill_mapped_parameters, fill_parameters, Prompter};
use crate::resolver::{uris, ResolverChain};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Credential-scope argument every run starts from. It carries no value, so it is dropped
/// unless the command line supplies one.
pub const BASELINE_TOKEN_PARAMETER: &str = "github://user_token?scopes=repo,user:email,read:user";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Init,
    Listening,
    ArgsCollected,
    MappedCollected,
    Prompted,
    Correlated,
    Sent,
    Completed,
    Failed,
    Exit,
}

/// Listener settings for one run.
#[derive(Debug, Clone)]
pub struct ListenerSettings {
    pub host: String,
    pub grace: Duration,
    pub completion_timeout: Option<Duration>,
}

impl Default for ListenerSettings {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            grace: Duration::from_millis(200),
            completion_timeout: None,
        }
    }
}

/// Result of the send phase. The listener is still running.
pub struct RunOutcome {
    pub state: RunState,
    pub invocation: Invocation,
    pub result: InvocationResult,
    listener: ListenerHandle,
    ports: Arc<PortAllocator>,
    completion_timeout: Option<Duration>,
}

/// How the process should end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitDisposition {
    /// Completion arrived before the HTTP call returned
    Immediate,
    /// Completion arrived while waiting after the call
    AfterCompletion,
    /// The automation process reported a non-zero code
    Failed,
}

impl ExitDisposition {
    pub fn exit_code(self) -> i32 {
        match self {
            ExitDisposition::Immediate | ExitDisposition::AfterCompletion => 0,
            ExitDisposition::Failed => 1,
        }
    }
}

impl RunOutcome {
    /// True when the completion notification already arrived.
    pub fn can_terminate(&self) -> bool {
        self.listener.can_terminate()
    }

    pub fn listener_port(&self) -> u16 {
        self.listener.port()
    }

    /// Wait (if needed) for the completion notification, then release the listener
    /// and the port table.
    pub async fn finish(self) -> Result<ExitDisposition, InvokeError> {
        let disposition = if self.state == RunState::Failed {
            Ok(ExitDisposition::Failed)
        } else if self.listener.can_terminate() {
            Ok(ExitDisposition::Immediate)
        } else {
            info!(
                port = self.listener.port(),
                "Waiting for command completion notification"
            );
            match self
                .listener
                .wait_for_completion(self.completion_timeout)
                .await
            {
                Ok(true) => Ok(ExitDisposition::AfterCompletion),
                Ok(false) => Err(InvokeError::Listener(format!(
                    "No completion notification within {}s",
                    self.completion_timeout.map(|t| t.as_secs()).unwrap_or_default()
                ))),
                Err(e) => Err(e),
            }
        };

        self.listener.stop().await?;
        self.ports.release_all();
        debug!(state = ?RunState::Exit, "Run finished");
        disposition
    }
}

pub struct Orchestrator {
    context: ExecutionContext,
    ports: Arc<PortAllocator>,
    correlation: Arc<CorrelationIdGenerator>,
    resolvers: ResolverChain,
    invoker: Arc<dyn CommandInvoker>,
    prompter: Box<dyn Prompter>,
    hooks: Vec<Box<dyn InvocationHook>>,
    sink: Arc<dyn MessageSink>,
    listener: ListenerSettings,
    state: RunState,
}

impl Orchestrator {
    pub fn new(
        context: ExecutionContext,
        ports: Arc<PortAllocator>,
        correlation: Arc<CorrelationIdGenerator>,
        invoker: Arc<dyn CommandInvoker>,
        prompter: Box<dyn Prompter>,
        sink: Arc<dyn MessageSink>,
    ) -> Self {
        let resolvers = ResolverChain::for_context(&context);
        Self {
            context,
            ports,
            correlation,
            resolvers,
            invoker,
            prompter,
            hooks: Vec::new(),
            sink,
            listener: ListenerSettings::default(),
            state: RunState::Init,
        }
    }

    pub fn with_resolvers(mut self, resolvers: ResolverChain) -> Self {
        self.resolvers = resolvers;
        self
    }

    pub fn with_listener_settings(mut self, settings: ListenerSettings) -> Self {
        self.listener = settings;
        self
    }

    pub fn with_hook(mut self, hook: impl InvocationHook + 'static) -> Self {
        self.hooks.push(Box::new(hook));
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    fn advance(&mut self, next: RunState) {
        debug!(from = ?self.state, to = ?next, "Run state");
        self.state = next;
    }

    /// Collect, resolve, prompt, correlate, and send one invocation.
    pub async fn run(
        &mut self,
        command: &CommandMetadata,
        cli_args: ArgumentSet,
    ) -> Result<RunOutcome, InvokeError> {
        let port = self.ports.port_for(self.context.pid)?;
        let listener = match ListenerHandle::start(
            &self.listener.host,
            port,
            Arc::clone(&self.sink),
            self.listener.grace,
        )
        .await
        {
            Ok(listener) => listener,
            Err(e) => {
                warn!(port, error = %e, "Response listener did not start");
                self.ports.release_all();
                self.advance(RunState::Exit);
                return Err(e);
            }
        };
        self.advance(RunState::Listening);

        match self.send(command, cli_args).await {
            Ok((invocation, result)) => Ok(RunOutcome {
                state: self.state,
                invocation,
                result,
                listener,
                ports: Arc::clone(&self.ports),
                completion_timeout: self.listener.completion_timeout,
            }),
            Err(e) => {
                if e.aborts_before_send() {
                    info!(command = %command.name, error = %e, "Run aborted before sending");
                } else {
                    warn!(command = %command.name, error = %e, "Invocation failed");
                }
                listener.stop().await?;
                self.ports.release_all();
                self.advance(RunState::Exit);
                Err(e)
            }
        }
    }

    async fn send(
        &mut self,
        command: &CommandMetadata,
        cli_args: ArgumentSet,
    ) -> Result<(Invocation, InvocationResult), InvokeError> {
        let args = self.collect_args(cli_args);
        self.advance(RunState::ArgsCollected);

        let mapped = self.resolvers.resolve_all(&command.mapped_parameters)?;
        self.advance(RunState::MappedCollected);

        let args = fill_parameters(self.prompter.as_mut(), &command.parameters, args)?;
        let mapped = fill_mapped_parameters(self.prompter.as_mut(), &command.mapped_parameters, mapped)?;
        self.advance(RunState::Prompted);

        let channel = self.channel(command, &mapped);
        let correlation_id = self
            .correlation
            .new_correlation_id(&CorrelationOptions::channel(channel).with_listener_port())?;
        let mut invocation = Invocation::new(
            command.name.clone(),
            Target {
                id: self.context.workspace_id.clone(),
                name: self.context.workspace_name.clone(),
            },
        );
        invocation.parameters = args;
        invocation.mapped_parameters = mapped;
        invocation.correlation_id = Some(correlation_id);
        self.advance(RunState::Correlated);

        for hook in &self.hooks {
            hook.before(&invocation);
        }
        let sent = self.invoker.invoke(&invocation).await;
        self.advance(RunState::Sent);

        match sent {
            Ok(result) => {
                for hook in &self.hooks {
                    hook.after(&invocation, HookOutcome::Completed(&result));
                }
                if result.is_success() {
                    self.advance(RunState::Completed);
                } else {
                    warn!(command = %invocation.command, code = result.code, "Command failed");
                    self.advance(RunState::Failed);
                }
                Ok((invocation, result))
            }
            Err(e) => {
                for hook in &self.hooks {
                    hook.after(&invocation, HookOutcome::Failed(&e));
                }
                self.advance(RunState::Failed);
                Err(e)
            }
        }
    }

    /// Baseline credential scope overlaid with the command line; empty values dropped.
    ///
    /// The scope is a valueless placeholder. The token itself only travels as the
    /// fixed secret entry added by the invoker.
    fn collect_args(&self, cli_args: ArgumentSet) -> ArgumentSet {
        let mut args = ArgumentSet::new();
        args.insert(BASELINE_TOKEN_PARAMETER, "");
        args.merge(cli_args);
        args.into_iter()
            .filter(|arg| !arg.value.is_empty())
            .map(|arg| (arg.name, arg.value))
            .collect()
    }

    /// Correlation channel: the resolved repository name when there is one.
    fn channel(&self, command: &CommandMetadata, mapped: &ArgumentSet) -> String {
        command
            .mapped_parameters
            .iter()
            .find(|declaration| declaration.uri == uris::REPOSITORY)
            .and_then(|declaration| mapped.get(&declaration.name))
            .map(str::to_string)
            .or_else(|| self.context.repository_name())
            .unwrap_or_else(|| crate::correlation::DEFAULT_CHANNEL.to_string())
    }
}
