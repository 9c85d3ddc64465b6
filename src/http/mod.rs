//! HTTP subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum routes: prefix, encoded-path, wisp stub,
//!                  catch-all; per-request orchestration)
//!     → request.rs (request ID layer)
//!     → [proxy engine fetches + rewrite transforms]
//!     → response.rs (filter headers, attach CORS, write body)
//! ```

pub mod request;
pub mod response;
pub mod server;

pub use request::{RequestIdLayer, X_REQUEST_ID};
pub use server::HttpServer;
