//! Metrics collection and exposition.
//!
//! # Metrics
//! - `catalog_registration_attempts_total` (counter): by target, kind (register/renew), outcome
//! - `catalog_registration_state` (gauge): 1=registered, 0 otherwise, by target
//! - `catalog_deregistrations_total` (counter): by target, outcome
//! - `http_requests_total` (counter): by method, status

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus scrape endpoint. Failure leaves metrics disabled.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::warn!(address = %addr, error = %e, "Failed to start metrics endpoint"),
    }
}

fn outcome(success: bool) -> &'static str {
    if success {
        "success"
    } else {
        "failure"
    }
}

pub fn record_registration_attempt(target: &str, kind: &'static str, success: bool) {
    metrics::counter!(
        "catalog_registration_attempts_total",
        "target" => target.to_string(),
        "kind" => kind,
        "outcome" => outcome(success)
    )
    .increment(1);
}

pub fn set_registered(target: &str, registered: bool) {
    metrics::gauge!("catalog_registration_state", "target" => target.to_string())
        .set(if registered { 1.0 } else { 0.0 });
}

pub fn record_deregistration(target: &str, success: bool) {
    metrics::counter!(
        "catalog_deregistrations_total",
        "target" => target.to_string(),
        "outcome" => outcome(success)
    )
    .increment(1);
}

pub fn record_request(method: &str, status: u16) {
    metrics::counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
}
