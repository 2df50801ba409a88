//! Correlation ids: `{clientTag}-{port-or-empty}-{channel}-{epochMillis}`.

use crate::error::InvokeError;
use crate::port::PortAllocator;
use chrono::Utc;
use std::sync::atomic::{AtomicI64, Ordering};
use std::sync::Arc;

pub const DEFAULT_CHANNEL: &str = "general";

/// Options for one correlation id.
#[derive(Debug, Clone, Default)]
pub struct CorrelationOptions {
    /// Logical channel; `general` when absent
    pub channel: Option<String>,
    /// Embed this process's listener port
    pub encode_listener_port: bool,
}

impl CorrelationOptions {
    pub fn channel(channel: impl Into<String>) -> Self {
        Self {
            channel: Some(channel.into()),
            encode_listener_port: false,
        }
    }

    pub fn with_listener_port(mut self) -> Self {
        self.encode_listener_port = true;
        self
    }
}

pub struct CorrelationIdGenerator {
    client_tag: String,
    pid: u32,
    ports: Arc<PortAllocator>,
    last_millis: AtomicI64,
}

impl CorrelationIdGenerator {
    pub fn new(client_tag: impl Into<String>, pid: u32, ports: Arc<PortAllocator>) -> Self {
        Self {
            client_tag: client_tag.into(),
            pid,
            ports,
            last_millis: AtomicI64::new(0),
        }
    }

    pub fn new_correlation_id(&self, options: &CorrelationOptions) -> Result<String, InvokeError> {
        let port = if options.encode_listener_port {
            self.ports.port_for(self.pid)?.to_string()
        } else {
            String::new()
        };
        let channel = options
            .channel
            .as_deref()
            .filter(|c| !c.is_empty())
            .unwrap_or(DEFAULT_CHANNEL);

        Ok(format!(
            "{}-{}-{}-{}",
            self.client_tag,
            port,
            channel,
            self.next_millis()
        ))
    }

    /// Wall-clock millis, clamped so ids never go backwards within this generator.
    fn next_millis(&self) -> i64 {
        let now = Utc::now().timestamp_millis();
        let previous = self.last_millis.fetch_max(now, Ordering::SeqCst);
        previous.max(now)
    }
}

/// Listener port encoded in a correlation id, if any.
pub fn listener_port(correlation_id: &str) -> Option<u16> {
    correlation_id.split('-').nth(1)?.parse().ok()
}
