//! Error responses.
//!
//! Each `GatewayError` becomes a status code plus `{"error": "..."}`. Backend
//! failure causes stay in the logs; the client only sees a generic message.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::error::GatewayError;

/// JSON body of every error response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

impl GatewayError {
    pub fn status(&self) -> StatusCode {
        match self {
            GatewayError::MalformedInput(_) | GatewayError::InvalidSessionId => {
                StatusCode::BAD_REQUEST
            }
            GatewayError::Unauthorized => StatusCode::UNAUTHORIZED,
            GatewayError::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            GatewayError::ServerBusy => StatusCode::SERVICE_UNAVAILABLE,
            GatewayError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Text shown to the client.
    pub fn public_message(&self) -> &'static str {
        match self {
            GatewayError::MalformedInput(reason) => *reason,
            GatewayError::InvalidSessionId => "invalid conversation_id",
            GatewayError::Unauthorized => "unauthorized",
            GatewayError::MethodNotAllowed => "method not allowed",
            GatewayError::ServerBusy => "server busy",
            GatewayError::Internal(_) => "internal server error",
        }
    }
}

impl IntoResponse for GatewayError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.public_message().to_string(),
        };
        (self.status(), Json(body)).into_response()
    }
}
