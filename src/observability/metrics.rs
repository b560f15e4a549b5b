//! Metrics collection and exposition.
//!
//! # Metrics
//! - `component_http_connections_accepted_total` (counter)
//! - `component_http_connections_active` (gauge)
//! - `component_http_requests_total` (counter): by method, status
//! - `component_http_request_duration_seconds` (histogram): read → response written
//! - `component_http_forwarded_total` (counter): POST payload deliveries
//! - `component_http_empty_reads_total` (counter)
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op
//! - The Prometheus exporter is installed only by the binary

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_connection_opened() {
    counter!("component_http_connections_accepted_total").increment(1);
    gauge!("component_http_connections_active").increment(1.0);
}

pub fn record_connection_closed() {
    gauge!("component_http_connections_active").decrement(1.0);
}

pub fn record_empty_read() {
    counter!("component_http_empty_reads_total").increment(1);
}

pub fn record_request(method: &str, status: u16, started: Option<Instant>) {
    counter!(
        "component_http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    if let Some(started) = started {
        histogram!("component_http_request_duration_seconds").record(started.elapsed().as_secs_f64());
    }
}

pub fn record_forwarded(count: usize) {
    counter!("component_http_forwarded_total").increment(count as u64);
}

pub fn record_forward_dropped() {
    counter!("component_http_forwards_dropped_total").increment(1);
}
