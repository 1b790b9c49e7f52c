//! Bearer token authentication for the chat endpoint.

use axum::http::{header, HeaderMap};

use crate::error::GatewayError;

/// Optional shared-secret check.
///
/// With no key configured every request passes.
#[derive(Debug, Clone, Default)]
pub struct AuthGate {
    expected: Option<String>,
}

impl AuthGate {
    pub fn new(api_key: &str) -> Self {
        let expected = if api_key.is_empty() {
            None
        } else {
            Some(format!("Bearer {}", api_key))
        };
        Self { expected }
    }

    pub fn is_enabled(&self) -> bool {
        self.expected.is_some()
    }

    /// Require `Authorization: Bearer <api_key>` when a key is configured.
    pub fn check(&self, headers: &HeaderMap) -> Result<(), GatewayError> {
        let Some(expected) = &self.expected else {
            return Ok(());
        };

        let presented = headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok());

        match presented {
            Some(value) if value == expected => Ok(()),
            _ => Err(GatewayError::Unauthorized),
        }
    }
}
