//! Metrics collection and exposition.
//!
//! # Metrics
//! - `lifecycle_component_starts_total` (counter): by component, outcome
//! - `lifecycle_component_stops_total` (counter): by component, outcome
//! - `http_error_responses_total` (counter): by status
//!
//! Recording is a no-op until [`init_metrics`] installs the exporter.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};
use std::net::SocketAddr;

/// Install the Prometheus recorder and its scrape endpoint.
///
/// Must be called from within a Tokio runtime.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "metrics exporter listening");
    Ok(())
}

pub fn record_component_start(component: &'static str, ok: bool) {
    ::metrics::counter!(
        "lifecycle_component_starts_total",
        "component" => component,
        "outcome" => outcome(ok)
    )
    .increment(1);
}

pub fn record_component_stop(component: &'static str, ok: bool) {
    ::metrics::counter!(
        "lifecycle_component_stops_total",
        "component" => component,
        "outcome" => outcome(ok)
    )
    .increment(1);
}

pub fn record_error_response(status: u16) {
    ::metrics::counter!("http_error_responses_total", "status" => status.to_string()).increment(1);
}

fn outcome(ok: bool) -> &'static str {
    if ok {
        "success"
    } else {
        "failure"
    }
}
