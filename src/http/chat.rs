//! Chat and health handlers.

use std::error::Error as _;
use std::time::{Duration, Instant};

use axum::{
    body::{to_bytes, Body, Bytes},
    extract::State,
    http::{header, HeaderMap, Request, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use http_body_util::LengthLimitError;
use serde_json::json;

use crate::error::GatewayError;
use crate::gateway::ChatResponse;
use crate::http::request::request_id;
use crate::http::server::AppState;
use crate::observability::metrics;

/// `GET /api/health`. No auth, no side effects.
pub async fn health_handler() -> impl IntoResponse {
    Json(json!({ "status": "ok" }))
}

/// Any verb other than POST on `/api/chat`.
pub async fn method_not_allowed() -> GatewayError {
    GatewayError::MethodNotAllowed
}

/// `POST /api/chat`.
pub async fn chat_handler(State(state): State<AppState>, request: Request<Body>) -> Response {
    let start = Instant::now();
    let (parts, body) = request.into_parts();
    let request_id = request_id(&parts.headers);

    if !state.shutdown.is_running() {
        tracing::info!(request_id = %request_id, "Rejecting chat request while draining");
        return finish(Err(GatewayError::ServerBusy), &request_id, start);
    }

    let limit = state.dispatcher.max_body_bytes();
    if declared_length(&parts.headers).is_some_and(|len| len > limit) {
        return finish(
            Err(GatewayError::MalformedInput("request body too large")),
            &request_id,
            start,
        );
    }

    let bytes = match read_body(body, limit, state.body_read_timeout).await {
        Ok(bytes) => bytes,
        Err(e) => return finish(Err(e), &request_id, start),
    };

    let result = state
        .dispatcher
        .dispatch(&request_id, &parts.headers, &bytes)
        .await;
    finish(result, &request_id, start)
}

/// Buffer the body, giving up once it exceeds `limit` or stalls past `timeout`.
async fn read_body(body: Body, limit: usize, timeout: Duration) -> Result<Bytes, GatewayError> {
    match tokio::time::timeout(timeout, to_bytes(body, limit)).await {
        Ok(Ok(bytes)) => Ok(bytes),
        Ok(Err(e)) if exceeds_limit(&e) => {
            Err(GatewayError::MalformedInput("request body too large"))
        }
        Ok(Err(e)) => {
            tracing::debug!(error = %e, "Failed to read chat body");
            Err(GatewayError::MalformedInput("invalid request body"))
        }
        Err(_) => {
            tracing::debug!(timeout_secs = timeout.as_secs(), "Chat body read timed out");
            Err(GatewayError::MalformedInput("invalid request body"))
        }
    }
}

fn exceeds_limit(err: &axum::Error) -> bool {
    let mut source = err.source();
    while let Some(inner) = source {
        if inner.is::<LengthLimitError>() {
            return true;
        }
        source = inner.source();
    }
    false
}

fn declared_length(headers: &HeaderMap) -> Option<usize> {
    headers
        .get(header::CONTENT_LENGTH)?
        .to_str()
        .ok()?
        .parse()
        .ok()
}

fn finish(
    result: Result<ChatResponse, GatewayError>,
    request_id: &str,
    start: Instant,
) -> Response {
    match result {
        Ok(body) => {
            metrics::record_request("ok", StatusCode::OK.as_u16(), start);
            tracing::debug!(
                request_id = %request_id,
                conversation_id = %body.conversation_id,
                elapsed_ms = start.elapsed().as_millis() as u64,
                "Chat request completed"
            );
            Json(body).into_response()
        }
        Err(err) => {
            let status = err.status();
            metrics::record_request(err.kind(), status.as_u16(), start);
            if !matches!(err, GatewayError::Internal(_)) {
                tracing::debug!(request_id = %request_id, kind = err.kind(), "Chat request rejected");
            }
            err.into_response()
        }
    }
}
