//! Metrics collection and exposition.
//!
//! # Metrics
//! - `relay_requests_total` (counter): responses by service and status
//! - `relay_upstream_duration_seconds` (histogram): upstream call latency
//!   by upstream and outcome
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape listener.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

/// Record a response written by `service`.
pub fn record_request(service: &'static str, status: u16) {
    counter!(
        "relay_requests_total",
        "service" => service,
        "status" => status.to_string()
    )
    .increment(1);
}

/// Record one upstream call that started at `started`.
pub fn record_upstream(upstream: &'static str, outcome: &'static str, started: Instant) {
    histogram!(
        "relay_upstream_duration_seconds",
        "upstream" => upstream,
        "outcome" => outcome
    )
    .record(started.elapsed().as_secs_f64());
}
