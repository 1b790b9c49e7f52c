//! Shared utilities for integration testing.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use agent_gateway::backend::{AgentBackend, BackendError, CallContext};
use agent_gateway::gateway::{Dispatcher, SessionKey};
use agent_gateway::{GatewayConfig, HttpServer, Shutdown};
use async_trait::async_trait;
use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use serde_json::Value;
use tokio_util::sync::CancellationToken;
use tower::ServiceExt;

/// Replies with a fixed response or error after an optional delay.
#[derive(Default)]
pub struct MockBackend {
    pub response: String,
    pub error: Option<String>,
    pub delay: Duration,
    pub calls: AtomicUsize,
}

impl MockBackend {
    pub fn replying(response: &str) -> Self {
        Self {
            response: response.to_string(),
            ..Self::default()
        }
    }

    pub fn failing(error: &str) -> Self {
        Self {
            error: Some(error.to_string()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl AgentBackend for MockBackend {
    async fn process_direct(
        &self,
        _ctx: CallContext,
        _content: &str,
        _session_key: &SessionKey,
    ) -> Result<String, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        match &self.error {
            Some(e) => Err(BackendError::Provider(e.clone())),
            None => Ok(self.response.clone()),
        }
    }
}

/// Panics inside every call.
pub struct PanickingBackend;

#[async_trait]
impl AgentBackend for PanickingBackend {
    async fn process_direct(
        &self,
        _ctx: CallContext,
        _content: &str,
        _session_key: &SessionKey,
    ) -> Result<String, BackendError> {
        panic!("agent crashed mid-call");
    }
}

/// Blocks every call until `release` is called.
#[derive(Default)]
pub struct BlockingBackend {
    gate: CancellationToken,
    pub entered: AtomicUsize,
}

impl BlockingBackend {
    pub fn release(&self) {
        self.gate.cancel();
    }
}

#[async_trait]
impl AgentBackend for BlockingBackend {
    async fn process_direct(
        &self,
        _ctx: CallContext,
        _content: &str,
        _session_key: &SessionKey,
    ) -> Result<String, BackendError> {
        self.entered.fetch_add(1, Ordering::SeqCst);
        self.gate.cancelled().await;
        Ok("ok".to_string())
    }
}

/// Records overall and per-session concurrency of calls.
pub struct TrackingBackend {
    delay: Duration,
    running: AtomicUsize,
    max_running: AtomicUsize,
    per_session: Mutex<HashMap<String, (usize, usize)>>,
    seen: Mutex<Vec<String>>,
}

impl TrackingBackend {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            running: AtomicUsize::new(0),
            max_running: AtomicUsize::new(0),
            per_session: Mutex::new(HashMap::new()),
            seen: Mutex::new(Vec::new()),
        }
    }

    pub fn max_running(&self) -> usize {
        self.max_running.load(Ordering::SeqCst)
    }

    /// Highest concurrency observed for `session_key`.
    pub fn max_for(&self, session_key: &str) -> usize {
        self.per_session
            .lock()
            .unwrap()
            .get(session_key)
            .map(|(_, max)| *max)
            .unwrap_or(0)
    }

    pub fn seen(&self) -> Vec<String> {
        self.seen.lock().unwrap().clone()
    }
}

#[async_trait]
impl AgentBackend for TrackingBackend {
    async fn process_direct(
        &self,
        _ctx: CallContext,
        _content: &str,
        session_key: &SessionKey,
    ) -> Result<String, BackendError> {
        let key = session_key.as_str().to_string();
        self.seen.lock().unwrap().push(key.clone());

        let now = self.running.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_running.fetch_max(now, Ordering::SeqCst);
        {
            let mut sessions = self.per_session.lock().unwrap();
            let entry = sessions.entry(key.clone()).or_insert((0, 0));
            entry.0 += 1;
            entry.1 = entry.1.max(entry.0);
        }

        tokio::time::sleep(self.delay).await;

        self.per_session.lock().unwrap().get_mut(&key).unwrap().0 -= 1;
        self.running.fetch_sub(1, Ordering::SeqCst);
        Ok("ok".to_string())
    }
}

/// A router wired exactly like production, plus handles for inspection.
pub struct TestApp {
    pub router: Router,
    pub dispatcher: Arc<Dispatcher>,
    pub shutdown: Shutdown,
}

pub fn test_app(backend: Arc<dyn AgentBackend>, api_key: &str) -> TestApp {
    let mut config = GatewayConfig::default();
    config.auth.api_key = api_key.to_string();
    test_app_with(config, backend)
}

pub fn test_app_with(config: GatewayConfig, backend: Arc<dyn AgentBackend>) -> TestApp {
    let shutdown = Shutdown::new();
    let dispatcher = Arc::new(Dispatcher::new(&config, backend));
    let server = HttpServer::new(&config, dispatcher.clone(), shutdown.clone());
    TestApp {
        router: server.router(),
        dispatcher,
        shutdown,
    }
}

/// POST a raw body to `/api/chat`.
pub async fn post_chat(router: &Router, body: &str, auth: Option<&str>) -> (StatusCode, Value) {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/api/chat")
        .header("content-type", "application/json");
    if let Some(auth) = auth {
        builder = builder.header("authorization", auth);
    }
    let request = builder.body(Body::from(body.to_string())).unwrap();
    send(router, request).await
}

pub async fn send(router: &Router, request: Request<Body>) -> (StatusCode, Value) {
    let response = router.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let json = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, json)
}

/// Poll `cond` until it holds or a second passes.
pub async fn wait_until<F: Fn() -> bool>(cond: F) {
    for _ in 0..200 {
        if cond() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(5)).await;
    }
    panic!("condition not reached in time");
}
