//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, middleware)
//!     → request.rs (request ID)
//!     → chat.rs (method check, body limit, hand off to the dispatcher)
//!     → response.rs (error → status + JSON body)
//!     → Send to client
//! ```

pub mod chat;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_id, UuidRequestId, X_REQUEST_ID};
pub use response::ErrorBody;
pub use server::{build_router, AppState, HttpServer};
