//! Metrics collection and exposition.
//!
//! # Metrics
//! - `gateway_requests_total` (counter): requests by method, status
//! - `gateway_request_duration_seconds` (histogram): pipeline latency
//! - `gateway_tenant_cache_total` (counter): lookups by hit/miss
//! - `gateway_tenant_resolution_total` (counter): resolutions by source
//! - `gateway_abuse_denied_total` (counter): denials by reason
//! - `gateway_rate_limited_total` (counter): throttles by scope
//! - `gateway_auth_redirects_total` (counter): gate redirects

use std::net::SocketAddr;
use std::time::Instant;

use metrics_exporter_prometheus::PrometheusBuilder;

/// Start the Prometheus exposition endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint started"),
        Err(e) => tracing::error!(error = %e, "Failed to start metrics endpoint"),
    }
}

pub fn record_request(method: &str, status: u16, start: Instant) {
    metrics::counter!(
        "gateway_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
    )
    .increment(1);
    metrics::histogram!("gateway_request_duration_seconds")
        .record(start.elapsed().as_secs_f64());
}

pub fn record_tenant_cache(outcome: &'static str) {
    metrics::counter!("gateway_tenant_cache_total", "outcome" => outcome).increment(1);
}

pub fn record_tenant_resolution(source: &'static str) {
    metrics::counter!("gateway_tenant_resolution_total", "source" => source).increment(1);
}

pub fn record_abuse_denied(reason: &'static str) {
    metrics::counter!("gateway_abuse_denied_total", "reason" => reason).increment(1);
}

pub fn record_rate_limited(scope: &'static str) {
    metrics::counter!("gateway_rate_limited_total", "scope" => scope).increment(1);
}

pub fn record_auth_redirect() {
    metrics::counter!("gateway_auth_redirects_total").increment(1);
}
