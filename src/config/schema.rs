//! Configuration schema definitions.
//!
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::observability::logging::LoggerConfig;

/// Root configuration for a service.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ServiceConfig {
    /// HTTP server settings.
    pub server: ServerConfig,

    /// Logging settings.
    pub logging: LoggerConfig,

    /// Metrics settings.
    pub observability: ObservabilityConfig,
}

/// HTTP server configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub http_address: String,

    /// Deadline for handling one request.
    pub request_timeout_secs: u64,

    /// Maximum accepted request body size.
    pub max_body_bytes: usize,

    /// Bind attempts before start gives up, with backoff in between.
    pub bind_attempts: u32,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            http_address: "0.0.0.0:8080".to_string(),
            request_timeout_secs: 10,
            max_body_bytes: 2 * 1024 * 1024,
            bind_attempts: 3,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Expose Prometheus metrics.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
