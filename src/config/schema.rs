//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gateway.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the chat gateway.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct GatewayConfig {
    /// Listener configuration (bind address).
    pub listener: ListenerConfig,

    /// Bearer token authentication.
    pub auth: AuthConfig,

    /// Admission control (concurrent backend calls).
    pub admission: AdmissionConfig,

    /// Request size limits.
    pub limits: LimitsConfig,

    /// Per-session serialization settings.
    pub sessions: SessionConfig,

    /// Timeout configuration.
    pub timeouts: TimeoutConfig,

    /// Backend provider selection.
    pub backend: BackendConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:8080").
    pub bind_address: String,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:8080".to_string(),
        }
    }
}

/// Authentication configuration.
///
/// An empty `api_key` disables the check entirely.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Shared secret expected as `Authorization: Bearer <api_key>`.
    pub api_key: String,
}

/// Admission control configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct AdmissionConfig {
    /// Maximum number of backend calls in flight at once.
    pub max_concurrent: usize,
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self { max_concurrent: 4 }
    }
}

/// Request limits.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LimitsConfig {
    /// Maximum chat request body size in bytes.
    pub max_body_bytes: usize,
}

impl Default for LimitsConfig {
    fn default() -> Self {
        Self {
            max_body_bytes: 1024 * 1024, // 1 MiB
        }
    }
}

/// Session lock configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Prefix scoping session keys to this transport (`<prefix>:<conversation_id>`).
    pub channel: String,

    /// Drop a session's lock once no request holds or waits on it.
    /// When false, locks are retained for the process lifetime.
    pub evict_idle: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            channel: "http".to_string(),
            evict_idle: true,
        }
    }
}

/// Timeout configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TimeoutConfig {
    /// Timeout for non-chat routes in seconds.
    pub request_secs: u64,

    /// How long a chat request may take to deliver its body.
    pub body_read_secs: u64,

    /// How long shutdown waits for in-flight work before giving up.
    pub shutdown_secs: u64,

    /// Optional deadline for a single backend call. `None` lets calls run to completion.
    ///
    /// On expiry the call's context is cancelled and the session stays locked
    /// until the backend returns. A backend that ignores cancellation keeps
    /// its slot and lock until it finishes on its own.
    pub backend_deadline_secs: Option<u64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            request_secs: 30,
            body_read_secs: 30,
            shutdown_secs: 10,
            backend_deadline_secs: None,
        }
    }
}

/// Which provider the agent loop drives.
#[derive(Debug, Clone, Copy, Deserialize, Serialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    /// Replies with the message it was given. Local development only.
    #[default]
    Echo,
    /// Forwards messages to an HTTP agent.
    Upstream,
}

/// Backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct BackendConfig {
    /// Provider implementation.
    pub provider: ProviderKind,

    /// Base URL of the upstream agent (required for `upstream`).
    pub upstream_url: Option<String>,

    /// Upstream HTTP request timeout in seconds.
    pub upstream_timeout_secs: u64,

    /// Capacity of the agent loop's job queue.
    pub queue_depth: usize,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            provider: ProviderKind::Echo,
            upstream_url: None,
            upstream_timeout_secs: 300,
            queue_depth: 64,
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Emit logs as JSON lines.
    pub json_logs: bool,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            json_logs: false,
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
