//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for crosswire.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::matching::{HttpMethod, RequestPattern};

/// Root configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct CrosswireConfig {
    /// Channel registry and handshake settings.
    pub broadcast: BroadcastConfig,

    /// Request interception settings.
    pub intercept: InterceptConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Channel registry configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct BroadcastConfig {
    /// Name of the control channel used for handshakes.
    pub internal_channel: String,

    /// Keep exchanging ping/pong with known peers.
    pub continuous_handshake: bool,

    /// Lower bound of the jittered reply delay in milliseconds.
    pub ping_delay_min_ms: u64,

    /// Upper bound of the jittered reply delay in milliseconds.
    pub ping_delay_max_ms: u64,

    /// Time between a close notice and the actual close, in milliseconds.
    pub close_grace_ms: u64,
}

impl BroadcastConfig {
    pub fn close_grace(&self) -> Duration {
        Duration::from_millis(self.close_grace_ms)
    }
}

impl Default for BroadcastConfig {
    fn default() -> Self {
        Self {
            internal_channel: "crosswire-internal".to_string(),
            continuous_handshake: true,
            ping_delay_min_ms: 369,
            ping_delay_max_ms: 3963,
            close_grace_ms: 3693,
        }
    }
}

/// Request interception configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct InterceptConfig {
    /// Install the interception hook on the host's HTTP client.
    pub enabled: bool,

    /// Observable request patterns, checked in order.
    pub patterns: Vec<RequestPattern>,
}

impl Default for InterceptConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            patterns: default_patterns(),
        }
    }
}

fn default_patterns() -> Vec<RequestPattern> {
    [
        ("Generate", "*/v1/generations", HttpMethod::Post),
        ("Track", "*/v1/generations/track", HttpMethod::Post),
        ("Limit", "*/v1/generations?limit*", HttpMethod::Get),
        ("Cursor", "*/v1/generations?cursor*", HttpMethod::Get),
        ("Delete", "*/v1/generations/*", HttpMethod::Delete),
    ]
    .into_iter()
    .filter_map(|(name, url, method)| RequestPattern::new(name, url, method).ok())
    .collect()
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
            metrics_address: "127.0.0.1:9090".to_string(),
        }
    }
}
