//! HTTP command invoker
//!
//! Sends invocations to the automation process as `POST {base}/command` and decodes
//! its answer. Transport and codec failures are errors; a non-zero result code is a
//! normal [`InvocationResult`] that reports failure.

use crate::config::EndpointConfig;
use crate::correlation::{CorrelationIdGenerator, CorrelationOptions};
use crate::error::InvokeError;
use crate::invocation::{Argument, Invocation, InvocationResult, Secret, Target};
use crate::metadata::Registration;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

pub const API_VERSION: &str = "1";

/// Mapped parameter carrying the workspace id the automation process requires.
pub const WORKSPACE_PARAMETER: &str = "slackTeam";

/// Secret scope always sent with an invocation; its value comes from the environment.
pub const TOKEN_SECRET_URI: &str = "github://org_token";

/// Wire body of `POST {base}/command`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CommandPayload {
    pub command: String,
    pub parameters: Vec<Argument>,
    pub mapped_parameters: Vec<Argument>,
    pub secrets: Vec<Secret>,
    pub correlation_id: String,
    pub api_version: String,
    pub team: Target,
}

impl CommandPayload {
    /// Flatten an invocation into the wire shape.
    ///
    /// Ordinary parameters are repeated in `mapped_parameters` so a handler that maps
    /// a parameter with the same name as an ordinary one still gets a value.
    pub fn build(invocation: &Invocation, correlation_id: String, token: Option<&str>) -> Self {
        let parameters = invocation.parameters.to_vec();

        let mut mapped_parameters = invocation.mapped_parameters.to_vec();
        mapped_parameters.push(Argument::new(
            WORKSPACE_PARAMETER,
            invocation.target.id.clone(),
        ));
        mapped_parameters.extend(parameters.iter().cloned());

        let mut secrets = invocation.secrets.clone();
        secrets.push(Secret {
            uri: TOKEN_SECRET_URI.to_string(),
            value: token.unwrap_or_default().to_string(),
        });

        Self {
            command: invocation.command.clone(),
            parameters,
            mapped_parameters,
            secrets,
            correlation_id,
            api_version: API_VERSION.to_string(),
            team: invocation.target.clone(),
        }
    }
}

/// Talks to the automation process.
#[async_trait]
pub trait CommandInvoker: Send + Sync {
    /// Send one invocation and decode the result.
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationResult, InvokeError>;

    /// Fetch the handler metadata the automation process publishes.
    async fn registration(&self) -> Result<Registration, InvokeError>;

    /// Deliver an event in the framework's internal shape.
    async fn post_event(&self, event: &Value) -> Result<InvocationResult, InvokeError>;
}

const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REQUEST_TIMEOUT: Duration = Duration::from_secs(120);

fn build_http_client(endpoint: &EndpointConfig) -> Result<Client, InvokeError> {
    let connect = if endpoint.connect_timeout_secs == 0 {
        CONNECT_TIMEOUT
    } else {
        Duration::from_secs(endpoint.connect_timeout_secs)
    };
    let request = if endpoint.request_timeout_secs == 0 {
        REQUEST_TIMEOUT
    } else {
        Duration::from_secs(endpoint.request_timeout_secs)
    };
    Client::builder()
        .no_proxy()
        .connect_timeout(connect)
        .timeout(request)
        .build()
        .map_err(|e| InvokeError::Configuration(format!("Failed to create HTTP client: {}", e)))
}

pub struct HttpCommandInvoker {
    client: Client,
    endpoint: EndpointConfig,
    correlation: Arc<CorrelationIdGenerator>,
    token: Option<String>,
}

impl HttpCommandInvoker {
    pub fn new(
        endpoint: EndpointConfig,
        correlation: Arc<CorrelationIdGenerator>,
        token: Option<String>,
    ) -> Result<Self, InvokeError> {
        Ok(Self {
            client: build_http_client(&endpoint)?,
            endpoint,
            correlation,
            token,
        })
    }

    fn url(&self, path: &str) -> Result<String, InvokeError> {
        let base = self.endpoint.base_endpoint().ok_or_else(|| {
            InvokeError::Configuration(
                "No automation endpoint configured (endpoint.base_url is empty)".to_string(),
            )
        })?;
        Ok(format!("{}/{}", base, path))
    }

    async fn decode_result(response: reqwest::Response) -> Result<InvocationResult, InvokeError> {
        let status = response.status();
        let body = response.bytes().await?;
        let payload: Value = serde_json::from_slice(&body).map_err(|e| {
            InvokeError::Transport(format!(
                "Undecodable response (status {}): {}",
                status, e
            ))
        })?;

        let code = payload.get("code").and_then(Value::as_i64).ok_or_else(|| {
            InvokeError::Transport(format!("Response (status {}) has no result code", status))
        })?;
        let message = payload
            .get("message")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(InvocationResult {
            code,
            message,
            payload,
        })
    }
}

#[async_trait]
impl CommandInvoker for HttpCommandInvoker {
    async fn invoke(&self, invocation: &Invocation) -> Result<InvocationResult, InvokeError> {
        let url = self.url("command")?;
        if invocation.command.is_empty() {
            return Err(InvokeError::Configuration(
                "Cannot invoke a command without a name".to_string(),
            ));
        }

        let correlation_id = match &invocation.correlation_id {
            Some(id) if !id.is_empty() => id.clone(),
            _ => self
                .correlation
                .new_correlation_id(&CorrelationOptions::default())?,
        };
        let payload = CommandPayload::build(invocation, correlation_id, self.token.as_deref());

        debug!(
            command = %payload.command,
            correlation_id = %payload.correlation_id,
            url = %url,
            "Sending command invocation"
        );
        let response = self.client.post(&url).json(&payload).send().await?;
        let result = Self::decode_result(response).await?;

        if result.is_success() {
            info!(command = %payload.command, correlation_id = %payload.correlation_id, "Command accepted");
        } else {
            warn!(
                command = %payload.command,
                correlation_id = %payload.correlation_id,
                code = result.code,
                message = result.message.as_deref().unwrap_or(""),
                "Command reported failure"
            );
        }
        Ok(result)
    }

    async fn registration(&self) -> Result<Registration, InvokeError> {
        let url = self.url("registration")?;
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(InvokeError::Transport(format!(
                "Registration request failed with status {}",
                status
            )));
        }
        let body = response.bytes().await?;
        serde_json::from_slice(&body)
            .map_err(|e| InvokeError::Transport(format!("Undecodable registration: {}", e)))
    }

    async fn post_event(&self, event: &Value) -> Result<InvocationResult, InvokeError> {
        let url = self.url("event")?;
        let response = self.client.post(&url).json(event).send().await?;
        Self::decode_result(response).await
    }
}
