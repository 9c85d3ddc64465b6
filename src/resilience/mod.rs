//! Resilience subsystem for the upstream fetch path.
//!
//! # Data Flow
//! ```text
//! Fetch attempt fails:
//!     → retry.rs (is this method + failure retryable?)
//!     → backoff.rs (how long to wait before the next attempt)
//! ```
//!
//! # Design Decisions
//! - Retries only for idempotent methods (GET, HEAD)
//! - Only transport failures retry; any response, whatever its status,
//!   is returned as-is
//! - Jittered backoff prevents synchronized refetch bursts

pub mod backoff;
pub mod retry;

pub use backoff::calculate_backoff;
pub use retry::is_retryable;
