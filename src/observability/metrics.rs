//! Metrics collection and exposition.
//!
//! # Metrics
//! - `proxy_requests_total` (counter): total requests by prefix, method, status
//! - `proxy_request_duration_seconds` (histogram): latency distribution by prefix
//!
//! # Design Decisions
//! - Low-overhead updates (the metrics crate's atomic registry)
//! - Prometheus exporter is optional and bound on its own address

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter on its own listener.
///
/// Failure to bind is logged, not fatal; the proxy serves traffic either way.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(err) => tracing::error!(error = %err, "Failed to install metrics exporter"),
    }
}

/// Record one completed request.
pub fn record_request(prefix: &str, method: &str, status: u16, start: Instant) {
    counter!(
        "proxy_requests_total",
        "prefix" => prefix.to_string(),
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    histogram!(
        "proxy_request_duration_seconds",
        "prefix" => prefix.to_string(),
    )
    .record(start.elapsed().as_secs_f64());
}
