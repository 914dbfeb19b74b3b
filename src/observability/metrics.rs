//! Metrics collection and exposition.
//!
//! # Metrics
//! - `shield_requests_total` (counter): facade calls by service, outcome
//! - `shield_request_duration_seconds` (histogram): facade latency incl. queueing
//! - `shield_retries_total` (counter): retry sleeps by service, reason
//! - `shield_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `shield_circuit_rejections_total` (counter): calls refused by an open circuit
//! - `shield_cache_lookups_total` (counter): by service, result (hit/miss)
//! - `shield_queue_depth` (gauge): operations waiting or running per service
//!
//! Without an installed recorder every call is a no-op.

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;
use std::net::SocketAddr;
use std::time::Instant;

/// Install the Prometheus exporter listening on `addr`.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_request(service: &str, outcome: &'static str, start: Instant) {
    counter!("shield_requests_total", "service" => service.to_string(), "outcome" => outcome)
        .increment(1);
    histogram!("shield_request_duration_seconds", "service" => service.to_string())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_retry(service: &str, reason: &'static str) {
    counter!("shield_retries_total", "service" => service.to_string(), "reason" => reason)
        .increment(1);
}

pub fn record_circuit_state(service: &str, state: u8) {
    gauge!("shield_circuit_state", "service" => service.to_string()).set(state as f64);
}

pub fn record_circuit_rejection(service: &str) {
    counter!("shield_circuit_rejections_total", "service" => service.to_string()).increment(1);
}

pub fn record_cache_lookup(service: &str, hit: bool) {
    let result = if hit { "hit" } else { "miss" };
    counter!("shield_cache_lookups_total", "service" => service.to_string(), "result" => result)
        .increment(1);
}

pub fn record_queue_depth(service: &str, depth: usize) {
    gauge!("shield_queue_depth", "service" => service.to_string()).set(depth as f64);
}
