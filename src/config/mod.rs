//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize, apply HOST/PORT/ASSISTANT_API_KEY)
//!     → validation.rs (semantic checks)
//!     → GatewayConfig (validated, immutable)
//!     → handed to each subsystem at startup
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use schema::{
    AdmissionConfig, AuthConfig, BackendConfig, GatewayConfig, LimitsConfig, ListenerConfig,
    ObservabilityConfig, ProviderKind, SessionConfig, TimeoutConfig,
};
