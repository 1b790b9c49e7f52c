//! Error taxonomy for the chat front door.
//!
//! Every rejection the gateway can produce maps to exactly one variant here.
//! The HTTP mapping lives in `http::response`.

use thiserror::Error;

use crate::backend::BackendError;

/// Errors surfaced to callers of the chat endpoint.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Body unparseable, too large, or missing the message.
    #[error("malformed input: {0}")]
    MalformedInput(&'static str),

    /// `conversation_id` failed the character class or length rule.
    #[error("invalid conversation_id")]
    InvalidSessionId,

    /// Bearer credential missing or wrong.
    #[error("unauthorized")]
    Unauthorized,

    /// Verb other than POST on the chat endpoint.
    #[error("method not allowed")]
    MethodNotAllowed,

    /// All admission slots are held.
    #[error("server busy")]
    ServerBusy,

    /// Backend call failed. The cause is kept for logging only.
    #[error("internal error")]
    Internal(#[source] BackendError),
}

impl GatewayError {
    /// Short machine-readable label used for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            GatewayError::MalformedInput(_) => "malformed_input",
            GatewayError::InvalidSessionId => "invalid_session_id",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::MethodNotAllowed => "method_not_allowed",
            GatewayError::ServerBusy => "server_busy",
            GatewayError::Internal(_) => "internal_error",
        }
    }
}

impl From<BackendError> for GatewayError {
    fn from(err: BackendError) -> Self {
        GatewayError::Internal(err)
    }
}
