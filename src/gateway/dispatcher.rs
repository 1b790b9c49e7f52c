//! Chat request pipeline.
//!
//! validate → authenticate → admission slot → session lock → backend call
//! → release lock → release slot → encode.
//!
//! Validation and authentication never touch shared state, so rejections at
//! that stage need no cleanup. Once acquired, the slot and the lock travel
//! together in a [`CallPermit`] owned by the task running the backend call.

use std::sync::Arc;
use std::time::{Duration, Instant};

use axum::http::HeaderMap;

use crate::backend::{AgentBackend, BackendError, CallContext};
use crate::config::GatewayConfig;
use crate::error::GatewayError;
use crate::gateway::{
    AdmissionController, AdmissionSlot, ChatResponse, RequestValidator, SessionKey, SessionLock,
    SessionLockRegistry,
};
use crate::observability::metrics;
use crate::security::AuthGate;

/// Both resources a backend call needs.
///
/// Fields drop in declaration order: the session lock goes first, then the
/// admission slot.
struct CallPermit {
    lock: SessionLock,
    slot: AdmissionSlot,
}

impl CallPermit {
    fn release(self) {
        let CallPermit { lock, slot } = self;
        lock.release();
        slot.release();
    }
}

/// Owns the admission pool and the session lock registry and sequences
/// every chat request through them.
pub struct Dispatcher {
    validator: RequestValidator,
    auth: AuthGate,
    admission: AdmissionController,
    sessions: SessionLockRegistry,
    backend: Arc<dyn AgentBackend>,
    backend_deadline: Option<Duration>,
}

impl Dispatcher {
    pub fn new(config: &GatewayConfig, backend: Arc<dyn AgentBackend>) -> Self {
        Self {
            validator: RequestValidator::new(
                config.sessions.channel.clone(),
                config.limits.max_body_bytes,
            ),
            auth: AuthGate::new(&config.auth.api_key),
            admission: AdmissionController::new(config.admission.max_concurrent),
            sessions: SessionLockRegistry::new(config.sessions.evict_idle),
            backend,
            backend_deadline: config.timeouts.backend_deadline_secs.map(Duration::from_secs),
        }
    }

    pub fn admission(&self) -> &AdmissionController {
        &self.admission
    }

    pub fn sessions(&self) -> &SessionLockRegistry {
        &self.sessions
    }

    pub fn max_body_bytes(&self) -> usize {
        self.validator.max_body_bytes()
    }

    /// Run one chat request through the full pipeline.
    pub async fn dispatch(
        &self,
        request_id: &str,
        headers: &HeaderMap,
        body: &[u8],
    ) -> Result<ChatResponse, GatewayError> {
        let chat = self.validator.validate(body)?;
        self.auth.check(headers)?;

        let Some(slot) = self.admission.try_acquire() else {
            tracing::warn!(
                request_id = %request_id,
                session = %chat.session_key,
                capacity = self.admission.capacity(),
                "Admission slots exhausted"
            );
            metrics::record_admission_rejected();
            return Err(GatewayError::ServerBusy);
        };

        // Dropping this future while waiting releases the slot and the place in line.
        let lock = self.sessions.acquire(&chat.session_key).await;
        let permit = CallPermit { lock, slot };

        let mut ctx = CallContext::new(request_id);
        if let Some(deadline) = self.backend_deadline {
            ctx = ctx.with_deadline(Instant::now() + deadline);
        }

        // The call runs on its own task so a disconnecting client cannot abort
        // it halfway; the permit is released when the task ends, even on panic.
        let backend = self.backend.clone();
        let session_key = chat.session_key.clone();
        let message = chat.message;
        let deadline = self.backend_deadline;
        let call = tokio::spawn(async move {
            let result = call_backend(backend, ctx, &message, &session_key, deadline).await;
            permit.release();
            result
        });

        let result = match call.await {
            Ok(result) => result,
            Err(e) => Err(BackendError::TaskFailed(e.to_string())),
        };

        match result {
            Ok(response) => Ok(ChatResponse {
                response,
                conversation_id: chat.conversation_id.into_string(),
            }),
            Err(e) => {
                tracing::error!(
                    request_id = %request_id,
                    session = %chat.session_key,
                    error = %e,
                    "Backend call failed"
                );
                Err(GatewayError::Internal(e))
            }
        }
    }
}

async fn call_backend(
    backend: Arc<dyn AgentBackend>,
    ctx: CallContext,
    message: &str,
    session_key: &SessionKey,
    deadline: Option<Duration>,
) -> Result<String, BackendError> {
    let started = Instant::now();
    let cancel = ctx.cancel.clone();

    let call = backend.process_direct(ctx, message, session_key);
    tokio::pin!(call);

    let result = match deadline {
        Some(limit) => tokio::select! {
            result = &mut call => result,
            _ = tokio::time::sleep(limit) => {
                // The permit stays held until the backend has let go of the session.
                cancel.cancel();
                if let Err(e) = call.await {
                    tracing::debug!(error = %e, "Backend call wound down after deadline");
                }
                Err(BackendError::DeadlineExceeded(limit))
            }
        },
        None => call.await,
    };

    metrics::record_backend_call(result.is_ok(), started);
    result
}
