//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming chat request:
//!     → body size limit (enforced while reading the body)
//!     → auth.rs (optional bearer token)
//!     → Pass to admission control
//! ```
//!
//! # Design Decisions
//! - Authentication is opt-in per deployment: no key, no check
//! - Fail closed once a key is configured
//! - Rejections happen before any shared resource is touched

pub mod auth;

pub use auth::AuthGate;
