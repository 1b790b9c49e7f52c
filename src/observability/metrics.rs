//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): chat requests by outcome
//! - `gateway_request_duration_seconds` (histogram): end-to-end chat latency
//! - `gateway_admission_rejected_total` (counter): requests turned away as busy
//! - `gateway_admission_in_flight` (gauge): admission slots currently held
//! - `gateway_session_locks` (gauge): session keys with a live lock entry
//! - `gateway_backend_calls_total` (counter): backend calls by result
//! - `gateway_backend_duration_seconds` (histogram): backend call latency
//!
//! Without an installed recorder every call here is a no-op.

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

/// Record a finished chat request.
pub fn record_request(outcome: &'static str, status: u16, start: Instant) {
    counter!(
        "gateway_requests_total",
        "outcome" => outcome,
        "status" => status.to_string()
    )
    .increment(1);
    histogram!("gateway_request_duration_seconds", "outcome" => outcome)
        .record(start.elapsed().as_secs_f64());
}

pub fn record_admission_rejected() {
    counter!("gateway_admission_rejected_total").increment(1);
}

pub fn set_admission_in_flight(held: usize) {
    gauge!("gateway_admission_in_flight").set(held as f64);
}

pub fn set_session_locks(count: usize) {
    gauge!("gateway_session_locks").set(count as f64);
}

/// Record one backend call.
pub fn record_backend_call(ok: bool, start: Instant) {
    let result = if ok { "ok" } else { "error" };
    counter!("gateway_backend_calls_total", "result" => result).increment(1);
    histogram!("gateway_backend_duration_seconds").record(start.elapsed().as_secs_f64());
}
