//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gothere_resolutions_total` (counter): requests by outcome (found, default, not_found)
//! - `gothere_reloads_total` (counter): reload attempts by result (ok, error)
//! - `gothere_mapping_entries` (gauge): entries in the live snapshot
//! - `gothere_load_anomalies_total` (counter): skipped or overridden lines by kind

use std::net::SocketAddr;

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

pub const RESOLUTIONS_TOTAL: &str = "gothere_resolutions_total";
pub const RELOADS_TOTAL: &str = "gothere_reloads_total";
pub const MAPPING_ENTRIES: &str = "gothere_mapping_entries";
pub const LOAD_ANOMALIES_TOTAL: &str = "gothere_load_anomalies_total";

/// Serve a Prometheus scrape endpoint on `addr`. Must run inside a Tokio runtime.
pub fn init_exporter(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics exporter listening");
    Ok(())
}

pub fn record_resolution(outcome: &'static str) {
    metrics::counter!(RESOLUTIONS_TOTAL, "outcome" => outcome).increment(1);
}

pub fn record_reload(success: bool) {
    let result = if success { "ok" } else { "error" };
    metrics::counter!(RELOADS_TOTAL, "result" => result).increment(1);
}

pub fn set_mapping_entries(entries: usize) {
    metrics::gauge!(MAPPING_ENTRIES).set(entries as f64);
}

pub fn record_anomaly(kind: &'static str) {
    metrics::counter!(LOAD_ANOMALIES_TOTAL, "kind" => kind).increment(1);
}
