//! Metrics collection and exposition.
//!
//! # Metrics
//! - `callguard_calls_total` (counter): guarded calls by breaker and outcome
//!   (`success`, `failure`, `ignored`, `rejected`)
//! - `callguard_circuit_state` (gauge): 0=closed, 1=open, 2=half-open
//! - `callguard_timeouts_total` (counter): calls that exceeded their bound
//! - `callguard_call_duration_seconds` (histogram): time spent in admitted calls
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a no-op, which keeps the library usable on its own
//! - The Prometheus exporter is opt-in from the binary

use std::net::SocketAddr;
use std::time::Duration;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::CircuitState;

/// Install the Prometheus recorder and its HTTP scrape endpoint.
///
/// Must be called from within a tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_call(breaker: &str, outcome: &'static str) {
    metrics::counter!("callguard_calls_total", "breaker" => breaker.to_string(), "outcome" => outcome)
        .increment(1);
}

pub fn record_circuit_state(breaker: &str, state: CircuitState) {
    metrics::gauge!("callguard_circuit_state", "breaker" => breaker.to_string()).set(state as u8 as f64);
}

pub fn record_timeout() {
    metrics::counter!("callguard_timeouts_total").increment(1);
}

pub fn record_call_duration(breaker: &str, elapsed: Duration) {
    metrics::histogram!("callguard_call_duration_seconds", "breaker" => breaker.to_string())
        .record(elapsed.as_secs_f64());
}
