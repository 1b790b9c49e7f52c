//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup (main.rs):
//!     Load config → Create provider → Start agent loop → Bind listener → Serve
//!
//! Shutdown (shutdown.rs):
//!     Signal received → Draining (stop admitting) → drain HTTP → stop agent loop
//!     → Stopped
//!
//! Signals (signals.rs):
//!     SIGTERM/SIGINT → Trigger graceful shutdown
//! ```
//!
//! # Design Decisions
//! - Ordered shutdown: stop accepting, drain, then stop the background loop
//! - Shutdown has a deadline shared by every step
//! - In-flight backend calls are never cancelled by shutdown

pub mod shutdown;
pub mod signals;

pub use shutdown::{drain, DrainReport, LifecycleState, Shutdown};
pub use signals::{spawn_signal_listener, termination_signal};
