//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the router.
//! All types derive Serde traits for deserialization from config files.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::routing::RouteId;

/// Request timeout applied when none (or a non-positive one) is configured.
pub const DEFAULT_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct AppConfig {
    /// Listener configuration (bind address, body limit).
    pub listener: ListenerConfig,

    /// Secrets for signing tokens. The first one is the primary secret;
    /// the rest stay valid for verification so secrets can be rotated.
    pub secrets: Vec<String>,

    /// Per-request handler timeout in seconds. Zero or negative selects the
    /// 60 second default.
    pub request_timeout_secs: i64,

    /// Route ids to bypass or disable.
    pub routing: RoutingConfig,

    /// Legacy backend settings.
    pub legacy: LegacyConfig,

    /// Plugins to load.
    pub plugins: PluginConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

impl AppConfig {
    /// The secret used for signing and for logging wrappers.
    pub fn primary_secret(&self) -> Option<&str> {
        self.secrets.first().map(String::as_str)
    }

    pub fn request_timeout(&self) -> Duration {
        if self.request_timeout_secs > 0 {
            Duration::from_secs(self.request_timeout_secs as u64)
        } else {
            DEFAULT_REQUEST_TIMEOUT
        }
    }
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8443").
    pub bind_address: String,

    /// Maximum request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Route ids handled outside the normal dispatch path.
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct RoutingConfig {
    /// Routes forwarded to the legacy backend instead of their own handler.
    pub legacy_routes: Vec<RouteId>,

    /// Routes answered with the "disabled" response.
    pub disabled_routes: Vec<RouteId>,
}

/// Legacy backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct LegacyConfig {
    /// Base URL of the legacy backend (e.g., "http://127.0.0.1:3000").
    pub url: Option<String>,

    /// Upstream request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for LegacyConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 60,
        }
    }
}

#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
#[serde(default)]
pub struct PluginConfig {
    /// Built-in plugin names, run in this order.
    pub enabled: Vec<String>,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Pretty for terminals, JSON for log shippers.
    pub log_format: LogFormat,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            log_format: LogFormat::Pretty,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
