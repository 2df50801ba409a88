//! Callback port allocation, one port per process id.

use crate::error::InvokeError;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::net::TcpListener;
use tracing::debug;

/// Lowest port considered when no range is configured.
pub const DEFAULT_LOWER_BOUND: u16 = 10000;

/// Hands out one free local TCP port per process id and remembers it for the
/// allocator's lifetime.
///
/// Two callers racing on the same unseen pid may both scan; the first to store its
/// result wins and both return the stored port.
pub struct PortAllocator {
    host: String,
    lower: u16,
    upper: u16,
    assigned: Mutex<HashMap<u32, u16>>,
}

impl PortAllocator {
    pub fn new(host: impl Into<String>) -> Self {
        Self::with_range(host, DEFAULT_LOWER_BOUND, u16::MAX)
    }

    pub fn with_range(host: impl Into<String>, lower: u16, upper: u16) -> Self {
        Self {
            host: host.into(),
            lower,
            upper,
            assigned: Mutex::new(HashMap::new()),
        }
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    /// Port for `pid`, scanning for a free one on first request.
    pub fn port_for(&self, pid: u32) -> Result<u16, InvokeError> {
        if let Some(port) = self.assigned.lock().get(&pid) {
            return Ok(*port);
        }

        let taken: Vec<u16> = self.assigned.lock().values().copied().collect();
        let port = self.scan(&taken)?;

        let mut assigned = self.assigned.lock();
        let port = *assigned.entry(pid).or_insert(port);
        debug!(pid, port, "Assigned callback port");
        Ok(port)
    }

    /// Port already assigned to `pid`, without scanning.
    pub fn assigned(&self, pid: u32) -> Option<u16> {
        self.assigned.lock().get(&pid).copied()
    }

    /// Forget every assignment.
    pub fn release_all(&self) {
        self.assigned.lock().clear();
    }

    fn scan(&self, taken: &[u16]) -> Result<u16, InvokeError> {
        (self.lower..=self.upper)
            .filter(|port| !taken.contains(port))
            .find(|port| TcpListener::bind((self.host.as_str(), *port)).is_ok())
            .ok_or(InvokeError::ResourceExhausted {
                lower: self.lower,
                upper: self.upper,
            })
    }
}
