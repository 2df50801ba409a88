//! Local response listener
//!
//! A short-lived HTTP endpoint on the allocated callback port. The automation process
//! posts progress messages and, finally, a `command_completed` notification to it.
//! Completion is published on a watch channel that the main flow can poll or await.

use crate::error::InvokeError;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{oneshot, watch};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Message,
    CommandCompleted,
}

/// Body of `POST /message`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ListenerMessage {
    pub kind: MessageKind,
    #[serde(default)]
    pub payload: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
}

impl ListenerMessage {
    pub fn message(payload: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::Message,
            payload: payload.into(),
            correlation_id: None,
        }
    }

    pub fn completed(correlation_id: impl Into<String>) -> Self {
        Self {
            kind: MessageKind::CommandCompleted,
            payload: String::new(),
            correlation_id: Some(correlation_id.into()),
        }
    }
}

/// Receives the opaque payloads of `message` notifications.
pub trait MessageSink: Send + Sync {
    fn message(&self, payload: &str);
}

/// Discards messages.
pub struct IgnoreMessages;

impl MessageSink for IgnoreMessages {
    fn message(&self, _payload: &str) {}
}

struct ListenerState {
    port: u16,
    completed: watch::Sender<bool>,
    sink: Arc<dyn MessageSink>,
}

fn build_router(state: Arc<ListenerState>) -> Router {
    Router::new()
        .route("/message", post(receive_message))
        .route("/health", get(health))
        .with_state(state)
}

async fn receive_message(
    State(state): State<Arc<ListenerState>>,
    Json(message): Json<ListenerMessage>,
) -> StatusCode {
    match message.kind {
        MessageKind::Message => {
            debug!(port = state.port, "Listener received message");
            state.sink.message(&message.payload);
        }
        MessageKind::CommandCompleted => {
            info!(
                port = state.port,
                correlation_id = message.correlation_id.as_deref().unwrap_or(""),
                "Command completion received"
            );
            state.completed.send_replace(true);
        }
    }
    StatusCode::ACCEPTED
}

async fn health(State(state): State<Arc<ListenerState>>) -> Json<Value> {
    Json(json!({ "status": "ok", "port": state.port }))
}

/// A running listener.
pub struct ListenerHandle {
    port: u16,
    completed: watch::Receiver<bool>,
    shutdown: Option<oneshot::Sender<()>>,
    task: Option<JoinHandle<std::io::Result<()>>>,
    grace: Duration,
}

impl ListenerHandle {
    /// Bind `host:port` and start serving. Returns once the socket is bound.
    pub async fn start(
        host: &str,
        port: u16,
        sink: Arc<dyn MessageSink>,
        grace: Duration,
    ) -> Result<Self, InvokeError> {
        let listener = tokio::net::TcpListener::bind((host, port))
            .await
            .map_err(|e| {
                InvokeError::Listener(format!("Failed to bind {}:{}: {}", host, port, e))
            })?;
        let port = listener
            .local_addr()
            .map_err(|e| InvokeError::Listener(e.to_string()))?
            .port();

        let (completed_tx, completed_rx) = watch::channel(false);
        let state = Arc::new(ListenerState {
            port,
            completed: completed_tx,
            sink,
        });
        let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
        let app = build_router(state);

        let task = tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async move {
                    let _ = shutdown_rx.await;
                })
                .await
        });
        debug!(port, "Response listener started");

        Ok(Self {
            port,
            completed: completed_rx,
            shutdown: Some(shutdown_tx),
            task: Some(task),
            grace,
        })
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// True once a completion notification has arrived.
    pub fn can_terminate(&self) -> bool {
        *self.completed.borrow()
    }

    /// A receiver that observes the completion flag.
    pub fn completion(&self) -> watch::Receiver<bool> {
        self.completed.clone()
    }

    /// Wait for completion. `None` waits indefinitely; returns false on timeout.
    pub async fn wait_for_completion(&self, timeout: Option<Duration>) -> Result<bool, InvokeError> {
        let mut completed = self.completed.clone();
        let wait = async move {
            completed
                .wait_for(|done| *done)
                .await
                .map(|_| ())
                .map_err(|_| InvokeError::Listener("Listener stopped before completion".to_string()))
        };
        match timeout {
            None => wait.await.map(|_| true),
            Some(limit) => match tokio::time::timeout(limit, wait).await {
                Ok(result) => result.map(|_| true),
                Err(_) => Ok(false),
            },
        }
    }

    /// Let in-flight messages land, then release the port.
    pub async fn stop(mut self) -> Result<(), InvokeError> {
        tokio::time::sleep(self.grace).await;
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
        if let Some(task) = self.task.take() {
            match task.await {
                Ok(Ok(())) => {}
                Ok(Err(e)) => warn!(port = self.port, error = %e, "Listener exited with error"),
                Err(e) => warn!(port = self.port, error = %e, "Listener task failed"),
            }
        }
        debug!(port = self.port, "Response listener stopped");
        Ok(())
    }
}
