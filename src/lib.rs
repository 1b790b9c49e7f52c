//! Synchronous chat front door for a conversational agent.
//!
//! Admits a bounded number of concurrent backend calls and serializes calls
//! that share a conversation.

pub mod backend;
pub mod config;
pub mod error;
pub mod gateway;
pub mod http;
pub mod lifecycle;
pub mod observability;
pub mod security;

pub use config::schema::GatewayConfig;
pub use error::GatewayError;
pub use gateway::Dispatcher;
pub use http::HttpServer;
pub use lifecycle::Shutdown;
