//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.
//! Every field has a default, so an empty file is a valid configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::resilience::backpressure::DEFAULT_QUEUE_CAPACITY;

/// Root configuration for the gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (service address).
    pub listener: ListenerConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Per-connection frame queue.
    pub queue: QueueConfig,

    /// Log output settings.
    pub logging: LoggingConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,

    /// Admission settings.
    pub security: SecurityConfig,
}

impl GatewayConfig {
    /// Per-connection settings derived from this config.
    pub fn connection_settings(&self) -> ConnectionSettings {
        ConnectionSettings {
            idle_timeout: Duration::from_secs(self.timeouts.idle_secs),
            backpressure_delay: Duration::from_secs(self.timeouts.backpressure_secs),
            queue_capacity: self.queue.capacity,
        }
    }

    /// How long shutdown waits for open connections.
    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.timeouts.shutdown_grace_secs)
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Service address, `host:port` or `:port` for all IPv4 interfaces.
    pub service: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            service: ":8080".to_string(),
        }
    }
}

/// Timeout configuration in seconds.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Maximum wait for the next frame header.
    pub idle_secs: u64,

    /// Maximum wait for room in a full queue.
    pub backpressure_secs: u64,

    /// Maximum wait for open connections on shutdown.
    pub shutdown_grace_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            idle_secs: 120,
            backpressure_secs: 60,
            shutdown_grace_secs: 10,
        }
    }
}

/// Frame queue configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Frames buffered between decoder and agent.
    pub capacity: usize,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive, overridden by `RUST_LOG`.
    pub filter: String,

    /// Append logs to this file instead of stdout.
    pub file: Option<String>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "agent_gateway=info".to_string(),
            file: None,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Enable the Prometheus endpoint.
    pub metrics_enabled: bool,

    /// Prometheus endpoint address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}

/// Admission configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// File with one banned IP per line.
    pub ban_list_path: Option<String>,

    /// Reload the ban list when the file changes.
    pub watch_ban_list: bool,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            ban_list_path: None,
            watch_ban_list: true,
        }
    }
}

/// Runtime limits applied to every connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub idle_timeout: Duration,
    pub backpressure_delay: Duration,
    pub queue_capacity: usize,
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        GatewayConfig::default().connection_settings()
    }
}
