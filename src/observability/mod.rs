//! Observability subsystem.
//!
//! Tracing is initialized in `main`; this module owns the metrics
//! exporter and the per-request recording helpers used by handlers.

pub mod metrics;
