//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure shared by the
//! proxy and the file server. All types derive Serde traits for
//! deserialization from config files.

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Concurrency limit the file server runs with unless configured otherwise.
pub const DEFAULT_MAX_CLIENTS: usize = 10;

/// Root configuration for one service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// Listener configuration (bind address, concurrency gate).
    pub listener: ListenerConfig,

    /// Deadlines for socket and upstream operations.
    pub timeouts: TimeoutConfig,

    /// Bounds on request head parsing.
    pub limits: LimitsConfig,

    /// Static resource store settings (file server only).
    pub files: FilesConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,

    /// Maximum concurrently active handlers. `None` leaves accepts unbounded.
    pub max_clients: Option<usize>,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_clients: None,
        }
    }
}

/// Timeout configuration for various operations.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Reading the request line or the header section, in seconds.
    pub read_secs: u64,

    /// Writing a response head, in seconds.
    pub write_secs: u64,

    /// Moving a whole body (upload, file download, upstream relay), in seconds.
    pub transfer_secs: u64,

    /// Upstream request until response head, in seconds.
    pub upstream_secs: u64,

    /// Upstream TCP connect, in seconds.
    pub connect_secs: u64,

    /// Draining unread request bytes before close, in milliseconds.
    pub linger_ms: u64,

    /// Waiting for in-flight connections on shutdown, in seconds.
    pub drain_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            read_secs: 30,
            write_secs: 30,
            transfer_secs: 300,
            upstream_secs: 30,
            connect_secs: 5,
            linger_ms: 500,
            drain_secs: 10,
        }
    }
}

impl TimeoutConfig {
    pub fn read(&self) -> Duration {
        Duration::from_secs(self.read_secs)
    }

    pub fn write(&self) -> Duration {
        Duration::from_secs(self.write_secs)
    }

    pub fn transfer(&self) -> Duration {
        Duration::from_secs(self.transfer_secs)
    }

    pub fn upstream(&self) -> Duration {
        Duration::from_secs(self.upstream_secs)
    }

    pub fn connect(&self) -> Duration {
        Duration::from_secs(self.connect_secs)
    }

    pub fn linger(&self) -> Duration {
        Duration::from_millis(self.linger_ms)
    }

    pub fn drain(&self) -> Duration {
        Duration::from_secs(self.drain_secs)
    }
}

/// Bounds applied while reading a request.
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Longest accepted line, terminator included.
    pub max_line_bytes: usize,

    /// Most header lines accepted in one request.
    pub max_headers: usize,

    /// Most unread request bytes discarded while closing.
    pub linger_bytes: u64,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_line_bytes: 8 * 1024,
            max_headers: 100,
            linger_bytes: 64 * 1024,
        }
    }
}

/// Static resource store configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct FilesConfig {
    /// Directory that request paths are resolved against.
    pub root: PathBuf,

    /// Extension (lowercase, with the dot) to Content-Type.
    pub mime_types: BTreeMap<String, String>,
}

impl Default for FilesConfig {
    fn default() -> Self {
        let mime_types = [
            (".html", "text/html"),
            (".txt", "text/plain"),
            (".gif", "image/gif"),
            (".jpeg", "image/jpeg"),
            (".jpg", "image/jpeg"),
            (".css", "text/css"),
        ]
        .into_iter()
        .map(|(ext, mime)| (ext.to_string(), mime.to_string()))
        .collect();

        Self {
            root: PathBuf::from("."),
            mime_types,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error) used when RUST_LOG is unset.
    pub log_level: String,

    /// Emit logs as JSON lines instead of the human format.
    pub json_logs: bool,

    /// Prometheus scrape endpoint bind address; disabled when unset.
    pub metrics_address: Option<String>,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_address: None,
        }
    }
}
