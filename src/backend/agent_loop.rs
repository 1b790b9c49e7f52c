//! Background agent loop.
//!
//! # Responsibilities
//! - Own the provider and run each accepted job on its own task
//! - Accept jobs through a bounded queue fed by `AgentLoopHandle`
//! - On stop: refuse queued jobs, let running jobs finish, then exit

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;

use crate::backend::{AgentBackend, BackendError, CallContext, Provider};
use crate::gateway::SessionKey;

struct Job {
    ctx: CallContext,
    content: String,
    session_key: SessionKey,
    reply: oneshot::Sender<Result<String, BackendError>>,
}

/// The long-lived processing task. Started once with [`AgentLoop::run`].
pub struct AgentLoop {
    provider: Arc<dyn Provider>,
    jobs: mpsc::Receiver<Job>,
    stop: CancellationToken,
}

/// Cloneable entry point into a running [`AgentLoop`].
#[derive(Clone)]
pub struct AgentLoopHandle {
    jobs: mpsc::Sender<Job>,
    stop: CancellationToken,
}

impl AgentLoop {
    /// Create a loop and the handle used to submit work to it.
    pub fn new(provider: Arc<dyn Provider>, queue_depth: usize) -> (Self, AgentLoopHandle) {
        let (tx, rx) = mpsc::channel(queue_depth.max(1));
        let stop = CancellationToken::new();
        let agent_loop = Self {
            provider,
            jobs: rx,
            stop: stop.clone(),
        };
        (agent_loop, AgentLoopHandle { jobs: tx, stop })
    }

    /// Process jobs until [`AgentLoopHandle::stop`] is called or every handle is dropped.
    pub async fn run(mut self) {
        tracing::info!(provider = self.provider.name(), "Agent loop starting");

        let mut in_flight = JoinSet::new();

        loop {
            tokio::select! {
                _ = self.stop.cancelled() => break,
                job = self.jobs.recv() => match job {
                    Some(job) => {
                        in_flight.spawn(process(self.provider.clone(), job));
                    }
                    None => break,
                },
                Some(joined) = in_flight.join_next(), if !in_flight.is_empty() => {
                    log_join(joined);
                }
            }
        }

        self.jobs.close();
        let mut refused = 0usize;
        while let Ok(job) = self.jobs.try_recv() {
            let _ = job.reply.send(Err(BackendError::Stopped));
            refused += 1;
        }

        tracing::info!(
            running = in_flight.len(),
            refused,
            "Agent loop stopping, waiting for running jobs"
        );

        while let Some(joined) = in_flight.join_next().await {
            log_join(joined);
        }

        tracing::info!("Agent loop stopped");
    }
}

impl AgentLoopHandle {
    /// Signal the loop to stop. Jobs already running are not interrupted.
    pub fn stop(&self) {
        self.stop.cancel();
    }

    pub fn is_stopped(&self) -> bool {
        self.stop.is_cancelled()
    }
}

#[async_trait]
impl AgentBackend for AgentLoopHandle {
    async fn process_direct(
        &self,
        ctx: CallContext,
        content: &str,
        session_key: &SessionKey,
    ) -> Result<String, BackendError> {
        if self.stop.is_cancelled() {
            return Err(BackendError::Stopped);
        }

        let (reply_tx, reply_rx) = oneshot::channel();
        let job = Job {
            ctx,
            content: content.to_string(),
            session_key: session_key.clone(),
            reply: reply_tx,
        };

        self.jobs.send(job).await.map_err(|_| BackendError::Stopped)?;

        reply_rx
            .await
            .map_err(|_| BackendError::TaskFailed("agent loop dropped the job".into()))?
    }
}

async fn process(provider: Arc<dyn Provider>, job: Job) {
    let Job {
        ctx,
        content,
        session_key,
        reply,
    } = job;

    tracing::debug!(
        request_id = %ctx.request_id,
        session = %session_key,
        "Agent loop processing job"
    );

    let result = tokio::select! {
        res = provider.complete(&content, &session_key) => res,
        _ = ctx.cancel.cancelled() => Err(BackendError::Cancelled),
    };

    // Caller may have gone away; the result is discarded then.
    let _ = reply.send(result);
}

fn log_join(joined: Result<(), tokio::task::JoinError>) {
    if let Err(e) = joined {
        tracing::error!(error = %e, "Agent loop job task failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::EchoProvider;
    use std::time::Duration;
    use tokio::sync::Notify;

    struct GatedProvider {
        gate: Arc<Notify>,
    }

    #[async_trait]
    impl Provider for GatedProvider {
        fn name(&self) -> &'static str {
            "gated"
        }

        async fn complete(&self, content: &str, _key: &SessionKey) -> Result<String, BackendError> {
            self.gate.notified().await;
            Ok(format!("done: {}", content))
        }
    }

    fn key(id: &str) -> SessionKey {
        SessionKey::new("http", Some(id)).unwrap()
    }

    #[tokio::test]
    async fn processes_jobs_through_provider() {
        let (agent_loop, handle) = AgentLoop::new(Arc::new(EchoProvider), 4);
        let task = tokio::spawn(agent_loop.run());

        let reply = handle
            .process_direct(CallContext::new("r1"), "ping", &key("a"))
            .await
            .unwrap();
        assert_eq!(reply, "ping");

        handle.stop();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn stopped_loop_refuses_new_work() {
        let (agent_loop, handle) = AgentLoop::new(Arc::new(EchoProvider), 4);
        let task = tokio::spawn(agent_loop.run());
        handle.stop();
        task.await.unwrap();

        let err = handle
            .process_direct(CallContext::new("r2"), "ping", &key("a"))
            .await
            .unwrap_err();
        assert!(matches!(err, BackendError::Stopped));
    }

    #[tokio::test]
    async fn stop_lets_running_job_finish() {
        let gate = Arc::new(Notify::new());
        let provider = Arc::new(GatedProvider { gate: gate.clone() });
        let (agent_loop, handle) = AgentLoop::new(provider, 4);
        let task = tokio::spawn(agent_loop.run());

        let h = handle.clone();
        let call = tokio::spawn(async move {
            h.process_direct(CallContext::new("r3"), "work", &key("b")).await
        });

        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop();
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert!(!task.is_finished(), "loop must wait for the running job");

        gate.notify_one();
        assert_eq!(call.await.unwrap().unwrap(), "done: work");
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancelled_call_reports_cancelled() {
        let gate = Arc::new(Notify::new());
        let (agent_loop, handle) = AgentLoop::new(Arc::new(GatedProvider { gate }), 4);
        let task = tokio::spawn(agent_loop.run());

        let ctx = CallContext::new("r4");
        let cancel = ctx.cancel.clone();
        let h = handle.clone();
        let call = tokio::spawn(async move { h.process_direct(ctx, "work", &key("c")).await });

        tokio::time::sleep(Duration::from_millis(20)).await;
        cancel.cancel();
        assert!(matches!(call.await.unwrap(), Err(BackendError::Cancelled)));

        handle.stop();
        task.await.unwrap();
    }
}
