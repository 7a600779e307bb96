//! Metrics collection and exposition.
//!
//! # Metrics
//! - `crosswire_broadcasts_total` (counter): envelopes posted, by channel
//! - `crosswire_handshake_messages_total` (counter): control traffic sent, by title and message
//! - `crosswire_known_peers` (gauge): peers discovered by this context
//! - `crosswire_intercepted_requests_total` (counter): completed requests, by method and match

use std::net::SocketAddr;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(address = %addr, error = %e, "Failed to install metrics exporter"),
    }
}

pub fn record_broadcast(channel: &str) {
    metrics::counter!("crosswire_broadcasts_total", "channel" => channel.to_string()).increment(1);
}

pub fn record_handshake(title: &str, message: &str) {
    metrics::counter!(
        "crosswire_handshake_messages_total",
        "title" => title.to_string(),
        "message" => message.to_string()
    )
    .increment(1);
}

pub fn record_peer_count(count: usize) {
    metrics::gauge!("crosswire_known_peers").set(count as f64);
}

pub fn record_intercepted(method: &str, matched: bool) {
    metrics::counter!(
        "crosswire_intercepted_requests_total",
        "method" => method.to_uppercase(),
        "matched" => if matched { "true" } else { "false" }
    )
    .increment(1);
}
