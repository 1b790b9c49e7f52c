//! Backend collaborator subsystem.
//!
//! # Data Flow
//! ```text
//! Dispatcher
//!     → AgentBackend::process_direct (the one call the gateway protects)
//!     → agent_loop.rs (background task, bounded job queue)
//!     → provider.rs (echo / upstream HTTP agent)
//! ```
//!
//! # Design Decisions
//! - The gateway only knows the `AgentBackend` trait; everything behind it is replaceable
//! - Providers are chosen once at startup by `provider::create_provider`
//! - The agent loop is started once and stopped once by the lifecycle coordinator

pub mod agent_loop;
pub mod provider;

use std::time::Instant;

use async_trait::async_trait;
use thiserror::Error;
use tokio_util::sync::CancellationToken;

use crate::gateway::SessionKey;

pub use agent_loop::{AgentLoop, AgentLoopHandle};
pub use provider::{create_provider, EchoProvider, Provider, UpstreamProvider};

/// Errors produced behind the backend seam.
#[derive(Debug, Error)]
pub enum BackendError {
    /// The provider failed to produce a reply.
    #[error("provider error: {0}")]
    Provider(String),

    /// The agent loop has been stopped or its queue is closed.
    #[error("agent loop stopped")]
    Stopped,

    /// The call did not finish before its deadline.
    #[error("deadline exceeded after {0:?}")]
    DeadlineExceeded(std::time::Duration),

    /// The call was cancelled by its caller.
    #[error("call cancelled")]
    Cancelled,

    /// The task running the call panicked or was aborted.
    #[error("backend task failed: {0}")]
    TaskFailed(String),

    /// HTTP transport failure talking to an upstream agent.
    #[error("upstream request failed: {0}")]
    Upstream(#[from] reqwest::Error),
}

/// Per-call context handed to the backend.
#[derive(Debug, Clone)]
pub struct CallContext {
    /// Correlation id of the inbound request.
    pub request_id: String,
    /// Point in time after which the caller no longer wants the result.
    pub deadline: Option<Instant>,
    /// Cooperative cancellation for the call.
    pub cancel: CancellationToken,
}

impl CallContext {
    pub fn new(request_id: impl Into<String>) -> Self {
        Self {
            request_id: request_id.into(),
            deadline: None,
            cancel: CancellationToken::new(),
        }
    }

    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }
}

/// The single synchronous operation the gateway protects and serializes.
///
/// Implementations may assume that calls for the same `session_key` never
/// overlap; the gateway guarantees it.
#[async_trait]
pub trait AgentBackend: Send + Sync {
    async fn process_direct(
        &self,
        ctx: CallContext,
        content: &str,
        session_key: &SessionKey,
    ) -> Result<String, BackendError>;
}
