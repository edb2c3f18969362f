//! Metrics collection and exposition.
//!
//! # Metrics
//! - `breaker_calls_total` (counter): completed calls by service, endpoint, outcome
//! - `breaker_call_duration_seconds` (histogram): latency of completed calls
//! - `breaker_rejections_total` (counter): short-circuited calls
//! - `breaker_transitions_total` (counter): state changes by target state
//! - `breaker_state` (gauge): 0=closed, 1=half-open, 2=open
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; without an installed
//!   recorder every call is a cheap no-op (tests, library use)
//! - Prometheus exporter is opt-in from configuration

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

use crate::resilience::types::{BreakerKey, CallOutcome, CircuitState};

/// Install the Prometheus recorder and its HTTP listener.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Prometheus metrics endpoint started");
    Ok(())
}

pub fn record_call(key: &BreakerKey, outcome: CallOutcome, latency_ms: u64) {
    counter!(
        "breaker_calls_total",
        "service" => key.service_name.clone(),
        "endpoint" => key.endpoint.clone(),
        "outcome" => outcome.as_str()
    )
    .increment(1);
    histogram!(
        "breaker_call_duration_seconds",
        "service" => key.service_name.clone(),
        "endpoint" => key.endpoint.clone()
    )
    .record(latency_ms as f64 / 1000.0);
}

pub fn record_rejection(key: &BreakerKey) {
    counter!(
        "breaker_rejections_total",
        "service" => key.service_name.clone(),
        "endpoint" => key.endpoint.clone()
    )
    .increment(1);
}

pub fn record_transition(key: &BreakerKey, to: CircuitState) {
    counter!(
        "breaker_transitions_total",
        "service" => key.service_name.clone(),
        "endpoint" => key.endpoint.clone(),
        "to" => to.to_string()
    )
    .increment(1);
    record_state(key, to);
}

pub fn record_state(key: &BreakerKey, state: CircuitState) {
    gauge!(
        "breaker_state",
        "service" => key.service_name.clone(),
        "endpoint" => key.endpoint.clone()
    )
    .set(state.as_gauge());
}
