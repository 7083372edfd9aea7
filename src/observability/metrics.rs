//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_connections_accepted_total` (counter): admitted connections
//! - `gateway_accept_errors_total` (counter): transient accept failures
//! - `gateway_active_connections` (gauge): connections with a live handler
//! - `gateway_connections_closed_total` (counter): closes by `reason`
//! - `gateway_frames_decoded_total` (counter): frames handed to agents
//! - `gateway_frame_bytes` (histogram): payload sizes
//!
//! # Design Decisions
//! - Recording is a no-op until [`init_metrics`] installs the exporter
//! - Refused (banned) peers are not counted

use std::net::SocketAddr;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, PrometheusBuilder};

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) -> Result<(), BuildError> {
    PrometheusBuilder::new().with_http_listener(addr).install()?;
    tracing::info!(address = %addr, "Metrics endpoint listening");
    Ok(())
}

pub fn record_connection_opened() {
    counter!("gateway_connections_accepted_total").increment(1);
    gauge!("gateway_active_connections").increment(1.0);
}

pub fn record_connection_released() {
    gauge!("gateway_active_connections").decrement(1.0);
}

pub fn record_connection_closed(reason: &'static str) {
    counter!("gateway_connections_closed_total", "reason" => reason).increment(1);
}

pub fn record_accept_error() {
    counter!("gateway_accept_errors_total").increment(1);
}

pub fn record_frame(len: usize) {
    counter!("gateway_frames_decoded_total").increment(1);
    histogram!("gateway_frame_bytes").record(len as f64);
}
