//! Configuration validation.
//!
//! Serde handles syntax; this module checks value ranges and cross-field
//! requirements. All problems are collected, not just the first.

use thiserror::Error;
use tokio::sync::Semaphore;

use crate::config::schema::{GatewayConfig, ProviderKind};

/// A single semantic problem in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a host:port pair")]
    BindAddress(String),

    #[error("admission.max_concurrent must be greater than zero")]
    ZeroCapacity,

    #[error("admission.max_concurrent {0} exceeds the maximum of {1}")]
    CapacityTooLarge(usize, usize),

    #[error("limits.max_body_bytes must be greater than zero")]
    ZeroBodyLimit,

    #[error("sessions.channel `{0}` must be non-empty lowercase letters, digits, `_` or `-`")]
    Channel(String),

    #[error("backend.upstream_url is required for the upstream provider")]
    MissingUpstreamUrl,

    #[error("backend.upstream_url `{0}` is not a valid http(s) URL")]
    UpstreamUrl(String),

    #[error("backend.queue_depth must be greater than zero")]
    ZeroQueueDepth,

    #[error("timeouts.{0} must be greater than zero")]
    ZeroTimeout(&'static str),
}

/// Validate a parsed configuration.
pub fn validate_config(config: &GatewayConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if !is_host_port(&config.listener.bind_address) {
        errors.push(ValidationError::BindAddress(
            config.listener.bind_address.clone(),
        ));
    }

    let capacity = config.admission.max_concurrent;
    if capacity == 0 {
        errors.push(ValidationError::ZeroCapacity);
    } else if capacity > Semaphore::MAX_PERMITS {
        errors.push(ValidationError::CapacityTooLarge(
            capacity,
            Semaphore::MAX_PERMITS,
        ));
    }

    if config.limits.max_body_bytes == 0 {
        errors.push(ValidationError::ZeroBodyLimit);
    }

    let channel = &config.sessions.channel;
    let channel_ok = !channel.is_empty()
        && channel
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_' || b == b'-');
    if !channel_ok {
        errors.push(ValidationError::Channel(channel.clone()));
    }

    if config.backend.queue_depth == 0 {
        errors.push(ValidationError::ZeroQueueDepth);
    }

    if config.backend.provider == ProviderKind::Upstream {
        match &config.backend.upstream_url {
            None => errors.push(ValidationError::MissingUpstreamUrl),
            Some(raw) => match url::Url::parse(raw) {
                Ok(u) if u.scheme() == "http" || u.scheme() == "https" => {}
                _ => errors.push(ValidationError::UpstreamUrl(raw.clone())),
            },
        }
    }

    if config.timeouts.request_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("request_secs"));
    }
    if config.timeouts.body_read_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("body_read_secs"));
    }
    if config.timeouts.shutdown_secs == 0 {
        errors.push(ValidationError::ZeroTimeout("shutdown_secs"));
    }
    if config.timeouts.backend_deadline_secs == Some(0) {
        errors.push(ValidationError::ZeroTimeout("backend_deadline_secs"));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

/// Accepts `host:port` with a non-empty host and a numeric port, including
/// bracketed IPv6 literals. Name resolution happens at bind time.
fn is_host_port(addr: &str) -> bool {
    match addr.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}
