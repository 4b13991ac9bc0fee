//! Metrics collection and exposition.
//!
//! # Metrics
//! - `api_requests_total` (counter): requests by method, status, outcome
//! - `api_request_duration_seconds` (histogram): dispatch latency
//! - `api_route_table_paths` (gauge): compiled paths in the live table
//! - `api_config_reloads_total` (counter): reloads by result
//!
//! Recording is a no-op until an exporter is installed, so unit tests and
//! deployments without `metrics_enabled` pay almost nothing.

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder};

const REQUEST_DURATION_BUCKETS: &[f64] = &[
    0.001, 0.0025, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0, 60.0,
];

/// Install the Prometheus exporter with an HTTP scrape listener on `addr`.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new()
        .with_http_listener(addr)
        .set_buckets_for_metric(
            Matcher::Full("api_request_duration_seconds".to_string()),
            REQUEST_DURATION_BUCKETS,
        )?
        .install()?;
    tracing::info!(address = %addr, "Prometheus exporter listening");
    Ok(())
}

/// Record one dispatched request.
pub fn record_request(method: &str, status: u16, outcome: &'static str, start: Instant) {
    let method = method.to_string();
    let status = status.to_string();
    metrics::counter!(
        "api_requests_total",
        "method" => method.clone(),
        "status" => status.clone(),
        "outcome" => outcome
    )
    .increment(1);
    metrics::histogram!(
        "api_request_duration_seconds",
        "method" => method,
        "status" => status,
        "outcome" => outcome
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn set_route_table_size(paths: usize) {
    metrics::gauge!("api_route_table_paths").set(paths as f64);
}

pub fn record_reload(applied: bool) {
    let result = if applied { "applied" } else { "rejected" };
    metrics::counter!("api_config_reloads_total", "result" => result).increment(1);
}
