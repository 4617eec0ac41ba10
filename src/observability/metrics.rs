//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define health metrics (overall state, per-metric streaks, tracers)
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `tunnel_health_overall` (gauge): 0=initializing, 1=good, 2=bad
//! - `tunnel_health_metric_bad_streak` (gauge): consecutive bad samples per metric
//! - `tunnel_health_verdicts_total` (counter): verdicts by metric and outcome
//! - `tunnel_health_tracers_injected_total` (counter): every tracer manufactured
//! - `tunnel_health_tracer_offer_failures_total` (counter): tracers the work queue rejected
//! - `tunnel_health_tracer_registry_size` (gauge)
//! - `tunnel_health_tracer_evictions` (gauge): evictions since start
//! - `tunnel_health_cycle_faults_total` (counter): by task

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

use crate::health::{HealthMetric, HealthVerdict};

/// Install the Prometheus recorder and its HTTP listener.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_overall_health(state: HealthVerdict) {
    let value = match state {
        HealthVerdict::Initializing => 0.0,
        HealthVerdict::Good => 1.0,
        HealthVerdict::Bad => 2.0,
    };
    metrics::gauge!("tunnel_health_overall").set(value);
}

pub fn record_metric_verdict(metric: HealthMetric, verdict: HealthVerdict, bad_streak: u32) {
    metrics::counter!(
        "tunnel_health_verdicts_total",
        "metric" => metric.as_str(),
        "verdict" => verdict.as_str()
    )
    .increment(1);
    metrics::gauge!("tunnel_health_metric_bad_streak", "metric" => metric.as_str()).set(bad_streak as f64);
}

pub fn record_tracer_injected(accepted: bool) {
    metrics::counter!("tunnel_health_tracers_injected_total").increment(1);
    if !accepted {
        metrics::counter!("tunnel_health_tracer_offer_failures_total").increment(1);
    }
}

pub fn record_tracer_registry(size: usize, evictions: u64) {
    metrics::gauge!("tunnel_health_tracer_registry_size").set(size as f64);
    metrics::gauge!("tunnel_health_tracer_evictions").set(evictions as f64);
}

pub fn record_cycle_fault(task: &'static str) {
    metrics::counter!("tunnel_health_cycle_faults_total", "task" => task).increment(1);
}
