//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define governor metrics (outcomes, rejections, upstream latency)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `governor_requests_total` (counter): requests by terminal outcome
//! - `governor_rate_limited_total` (counter): 429 responses
//! - `governor_rate_table_size` (gauge): tracked client identities
//! - `governor_upstream_requests_total` (counter): forwarded requests by status
//! - `governor_upstream_duration_seconds` (histogram): upstream latency
//! - `governor_upstream_health` (gauge): 1=healthy, 0=unhealthy
//!
//! # Design Decisions
//! - Recording without an installed exporter is a no-op, so tests need no setup
//! - Labels are low-cardinality (outcome, status); never client identity

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter with its own HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_outcome(outcome: &'static str) {
    ::metrics::counter!("governor_requests_total", "outcome" => outcome).increment(1);
}

pub fn record_rate_limited() {
    ::metrics::counter!("governor_rate_limited_total").increment(1);
}

pub fn record_rate_table_size(size: usize) {
    ::metrics::gauge!("governor_rate_table_size").set(size as f64);
}

pub fn record_upstream(status: u16, start: Instant) {
    ::metrics::counter!("governor_upstream_requests_total", "status" => status.to_string())
        .increment(1);
    ::metrics::histogram!("governor_upstream_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_upstream_health(healthy: bool) {
    ::metrics::gauge!("governor_upstream_health").set(if healthy { 1.0 } else { 0.0 });
}
