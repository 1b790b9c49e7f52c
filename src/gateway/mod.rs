//! Admission control and per-session serialization.
//!
//! # Data Flow
//! ```text
//! raw body + headers
//!     → validate.rs (decode, conversation_id rules, session key)
//!     → security::auth (optional bearer token)
//!     → admission.rs (non-blocking slot, ServerBusy when exhausted)
//!     → session_lock.rs (wait for the session's exclusive lock)
//!     → backend call
//!     → release lock, release slot
//! ```
//!
//! # Design Decisions
//! - One `Dispatcher` owns both shared resources; it is built once at startup
//!   and injected into the HTTP layer
//! - Both resources are RAII guards, so release happens on every exit path
//! - Only the session lock ever waits; the slot pool fails fast

pub mod admission;
pub mod dispatcher;
pub mod session_key;
pub mod session_lock;
pub mod validate;

pub use admission::{AdmissionController, AdmissionSlot};
pub use dispatcher::Dispatcher;
pub use session_key::{ConversationId, SessionKey, MAX_CONVERSATION_ID_LEN};
pub use session_lock::{SessionLock, SessionLockRegistry};
pub use validate::{ChatRequest, ChatResponse, RequestValidator, ValidatedChat};
