//! Configuration subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     CLI args → loader.rs (read TOML) → validation.rs (semantic checks)
//!     → ProxyConfig accepted → engine + server constructed from it
//! ```
//!
//! # Design Decisions
//! - Everything has a default; an empty file is a valid config
//! - Validation collects all errors, not just the first

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load_config, ConfigError};
pub use schema::{
    EngineConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, RetryConfig, UpstreamConfig,
};
