//! Switch configuration.
//!
//! Defaults match the historical deployment (loopback, port 49153,
//! 1s readiness timeout). A TOML file can override any field and the
//! CLI overrides the file.

use std::net::SocketAddr;
use std::path::Path;
use std::time::Duration;

use serde::Deserialize;

use crate::{SwitchError, SwitchResult};

/// Default listen port.
pub const DEFAULT_PORT: u16 = 49153;

/// Default cap on concurrently connected members.
pub const DEFAULT_MAX_CONNECTIONS: usize = 999;

#[derive(Debug, Clone, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SwitchConfig {
    /// Address the listener binds to.
    pub listen_host: String,
    /// Port the listener binds to. 0 picks an ephemeral port.
    pub port: u16,
    /// Upper bound on the live connection set; connections accepted
    /// beyond it are dropped immediately.
    pub max_connections: usize,
    /// Bounded timeout of one readiness wait across the connection
    /// set. Also the upper bound on stop-flag latency for the
    /// multiplexer loop.
    pub poll_interval_ms: u64,
    /// Bound on one accept wait; the acceptor polls the stop flag at
    /// this interval.
    pub accept_interval_ms: u64,
    /// Bound on a single send to a destination member. A send that
    /// cannot complete within it counts as a hard send failure.
    pub send_timeout_ms: u64,
    /// Depth of the bounded record queue feeding the log sink.
    pub log_queue_depth: usize,
}

impl Default for SwitchConfig {
    fn default() -> Self {
        Self {
            listen_host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            max_connections: DEFAULT_MAX_CONNECTIONS,
            poll_interval_ms: 1000,
            accept_interval_ms: 250,
            send_timeout_ms: 50,
            log_queue_depth: sink::DEFAULT_QUEUE_DEPTH,
        }
    }
}

impl SwitchConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: impl AsRef<Path>) -> SwitchResult<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| {
            SwitchError::Config(format!("cannot read {}: {e}", path.display()))
        })?;
        toml::from_str(&raw)
            .map_err(|e| SwitchError::Config(format!("cannot parse {}: {e}", path.display())))
    }

    /// Socket address for the listener.
    pub fn listen_addr(&self) -> SwitchResult<SocketAddr> {
        format!("{}:{}", self.listen_host, self.port)
            .parse()
            .map_err(|e| {
                SwitchError::Config(format!(
                    "invalid listen address {}:{}: {e}",
                    self.listen_host, self.port
                ))
            })
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn accept_interval(&self) -> Duration {
        Duration::from_millis(self.accept_interval_ms)
    }

    pub fn send_timeout(&self) -> Duration {
        Duration::from_millis(self.send_timeout_ms)
    }
}
