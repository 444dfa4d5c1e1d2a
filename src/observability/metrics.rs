//! Metrics collection and exposition.
//!
//! # Metrics
//! - `http_requests_total` (counter): logged requests by method, route, status
//! - `http_request_duration_seconds` (histogram): latency by method, route
//! - `http_log_skipped_total` (counter): records suppressed by a transformer
//! - `http_log_hook_failures_total` (counter): transformer hooks that failed
//!
//! # Design Decisions
//! - Recording is a no-op until an exporter is installed
//! - Labels use the route template, never the raw path

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter with a scrape endpoint on `addr`.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

/// Record a completed, logged request.
pub fn record_request(method: &str, route: &str, status: u16, start: Instant) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "route" => route.to_string(),
        "status" => status.to_string()
    )
    .increment(1);

    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "route" => route.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record a request whose log record was suppressed by its transformer.
pub fn record_skipped(route: &str) {
    counter!("http_log_skipped_total", "route" => route.to_string()).increment(1);
}

/// Record a failed transformer hook (`skip`, `request`, `response`).
pub fn record_hook_failure(route: &str, hook: &'static str) {
    counter!(
        "http_log_hook_failures_total",
        "route" => route.to_string(),
        "hook" => hook
    )
    .increment(1);
}
