//! Shutdown coordination for the gateway.
//!
//! Running → Draining → Stopped. The transition to Draining stops new
//! admissions; Stopped is terminal and reached once the HTTP server and the
//! agent loop have quiesced or the grace period ran out.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::Instant;

use crate::backend::AgentLoopHandle;

/// Lifecycle state of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Running,
    Draining,
    Stopped,
}

/// Coordinator for graceful shutdown.
///
/// Cheap to clone; every clone observes the same state.
#[derive(Debug, Clone)]
pub struct Shutdown {
    tx: Arc<watch::Sender<LifecycleState>>,
}

impl Shutdown {
    /// Create a new shutdown coordinator in the Running state.
    pub fn new() -> Self {
        let (tx, _) = watch::channel(LifecycleState::Running);
        Self { tx: Arc::new(tx) }
    }

    pub fn state(&self) -> LifecycleState {
        *self.tx.borrow()
    }

    pub fn is_running(&self) -> bool {
        self.state() == LifecycleState::Running
    }

    /// Move Running → Draining. Later calls are no-ops.
    pub fn trigger(&self) {
        let changed = self.tx.send_if_modified(|state| {
            if *state == LifecycleState::Running {
                *state = LifecycleState::Draining;
                true
            } else {
                false
            }
        });
        if changed {
            tracing::info!("Draining: no longer admitting new requests");
        }
    }

    fn mark_stopped(&self) {
        self.tx.send_replace(LifecycleState::Stopped);
    }

    /// Resolves once shutdown has been triggered.
    pub fn triggered(&self) -> impl Future<Output = ()> + Send + 'static {
        let mut rx = self.tx.subscribe();
        async move {
            let _ = rx.wait_for(|state| *state != LifecycleState::Running).await;
        }
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// How the drain went.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    pub server_drained: bool,
    pub agent_loop_stopped: bool,
}

impl DrainReport {
    pub fn is_clean(&self) -> bool {
        self.server_drained && self.agent_loop_stopped
    }
}

/// Drain the HTTP server, stop the agent loop, and wait for both within `grace`.
///
/// In-flight backend calls are never cancelled; whatever is still running when
/// the grace period expires is left behind.
pub async fn drain<E>(
    shutdown: &Shutdown,
    server: JoinHandle<Result<(), E>>,
    agent_loop: JoinHandle<()>,
    agent: &AgentLoopHandle,
    grace: Duration,
) -> DrainReport
where
    E: std::fmt::Display,
{
    shutdown.trigger();
    let deadline = Instant::now() + grace;

    let server_drained = match tokio::time::timeout_at(deadline, server).await {
        Ok(Ok(Ok(()))) => true,
        Ok(Ok(Err(e))) => {
            tracing::error!(error = %e, "HTTP server exited with error");
            true
        }
        Ok(Err(e)) => {
            tracing::error!(error = %e, "HTTP server task failed");
            true
        }
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "HTTP drain timed out");
            false
        }
    };

    agent.stop();

    let agent_loop_stopped = match tokio::time::timeout_at(deadline, agent_loop).await {
        Ok(Ok(())) => true,
        Ok(Err(e)) => {
            tracing::error!(error = %e, "Agent loop task failed");
            true
        }
        Err(_) => {
            tracing::warn!(grace_secs = grace.as_secs(), "Agent loop did not stop in time");
            false
        }
    };

    shutdown.mark_stopped();

    DrainReport {
        server_drained,
        agent_loop_stopped,
    }
}
