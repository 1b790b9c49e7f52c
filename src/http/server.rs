//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create the Axum router with the chat and health handlers
//! - Wire up middleware (request ID, tracing, timeouts)
//! - Serve on a listener until the shutdown coordinator starts draining

use std::sync::Arc;
use std::time::Duration;

use axum::{
    routing::{get, post},
    Router,
};
use tokio::net::TcpListener;
use tower_http::{
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::config::GatewayConfig;
use crate::gateway::Dispatcher;
use crate::http::chat::{chat_handler, health_handler, method_not_allowed};
use crate::http::request::UuidRequestId;
use crate::lifecycle::Shutdown;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Shutdown,
    /// Budget for receiving a chat request body.
    pub body_read_timeout: Duration,
}

/// HTTP server for the chat gateway.
pub struct HttpServer {
    router: Router,
    shutdown: Shutdown,
}

impl HttpServer {
    /// Create a new HTTP server around an already-built dispatcher.
    pub fn new(config: &GatewayConfig, dispatcher: Arc<Dispatcher>, shutdown: Shutdown) -> Self {
        let state = AppState {
            dispatcher,
            shutdown: shutdown.clone(),
            body_read_timeout: Duration::from_secs(config.timeouts.body_read_secs),
        };
        let router = build_router(config, state);
        Self { router, shutdown }
    }

    /// The fully layered router, for in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until shutdown is triggered and open requests finish.
    pub async fn run(self, listener: TcpListener) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(self.shutdown.triggered())
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

/// Build the Axum router with all middleware layers.
///
/// The chat route carries no timeout: a backend call is never cut short by the
/// transport, only by the optional backend deadline.
#[allow(deprecated)]
pub fn build_router(config: &GatewayConfig, state: AppState) -> Router {
    let health_timeout = Duration::from_secs(config.timeouts.request_secs);

    Router::new()
        .route(
            "/api/health",
            get(health_handler).layer(TimeoutLayer::new(health_timeout)),
        )
        .route("/api/chat", post(chat_handler).fallback(method_not_allowed))
        .with_state(state)
        .layer(PropagateRequestIdLayer::x_request_id())
        .layer(TraceLayer::new_for_http())
        .layer(SetRequestIdLayer::x_request_id(UuidRequestId))
}
