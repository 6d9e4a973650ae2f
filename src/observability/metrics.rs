//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_phase_total` (counter): completed phase transitions by phase
//! - `lifecycle_hook_duration_seconds` (histogram): time spent in a hook list, by phase
//! - `lifecycle_tests_total` (counter): server test results by outcome
//! - `lifecycle_running` (gauge): 1 while a listener is bound, 0 otherwise, by server name

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

use crate::lifecycle::Phase;

/// Install the Prometheus exporter on `addr`. Must run inside a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics exporter listening"),
        Err(e) => {
            tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter")
        }
    }
}

pub fn record_phase(phase: Phase) {
    counter!("lifecycle_phase_total", "phase" => phase.as_str()).increment(1);
}

pub fn record_hook_duration(phase: Phase, start: Instant) {
    histogram!("lifecycle_hook_duration_seconds", "phase" => phase.as_str())
        .record(start.elapsed().as_secs_f64());
}

pub fn record_test_result(passed: bool) {
    let outcome = if passed { "passed" } else { "failed" };
    counter!("lifecycle_tests_total", "outcome" => outcome).increment(1);
}

pub fn set_running(server: &str, running: bool) {
    let value = if running { 1.0 } else { 0.0 };
    gauge!("lifecycle_running", "server" => server.to_string()).set(value);
}
