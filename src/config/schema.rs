//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for a server
//! process. All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

use crate::lifecycle::TestsRunConfig;

/// Root configuration for a lifecycle-managed server.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AppConfig {
    /// Identity, port and startup behaviour.
    pub server: ServerSettings,

    /// How server tests are run.
    pub tests: TestsRunConfig,

    /// Knobs for the default HTTP middleware.
    pub http: HttpConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Server identity and startup settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Server tag name, used in logs and status messages.
    pub name: String,

    /// Port to listen on. May instead be supplied to `listen`.
    pub port: Option<u16>,

    /// Interface the host server binds to.
    pub bind_host: String,

    /// Run every server test before binding; a failed run aborts `listen`.
    pub run_tests_before_listening: bool,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            name: "server".to_string(),
            port: None,
            bind_host: "0.0.0.0".to_string(),
            run_tests_before_listening: false,
        }
    }
}

/// Settings for the default middleware pipeline.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Request timeout (total time for request/response) in seconds.
    pub request_timeout_secs: u64,

    /// Maximum request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            request_timeout_secs: 30,
            max_body_bytes: 20 * 1024 * 1024, // 20MB
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
