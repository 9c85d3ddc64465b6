//! Lifecycle management subsystem.
//!
//! # Data Flow
//! ```text
//! Startup:
//!     Load config → Validate → Build engine → Bind listener → Serve
//!
//! Shutdown:
//!     Ctrl+C (or test trigger) → stop accepting → drain in-flight → exit
//! ```

pub mod shutdown;

pub use shutdown::{Shutdown, ShutdownSignal};
