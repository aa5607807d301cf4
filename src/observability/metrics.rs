//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define proxy and cache metrics
//! - Expose Prometheus-compatible metrics endpoint
//!
//! # Metrics
//! - `proxy_requests_total` (counter): requests by method, status, source
//! - `proxy_request_duration_seconds` (histogram): latency by method, source
//! - `proxy_cache_lookups_total` (counter): hit / miss / expired
//! - `proxy_cache_stores_total` (counter): stored / too_large
//! - `proxy_cache_evictions_total` (counter)
//! - `proxy_cache_entries`, `proxy_cache_bytes` (gauges)
//!
//! Without an installed recorder every call here is a no-op.

use std::net::SocketAddr;
use std::time::Instant;

use metrics::{counter, gauge, histogram};
use metrics_exporter_prometheus::PrometheusBuilder;

/// Install the Prometheus recorder and its scrape endpoint.
pub fn init_metrics(addr: SocketAddr) {
    match PrometheusBuilder::new().with_http_listener(addr).install() {
        Ok(()) => tracing::info!(address = %addr, "Metrics endpoint listening"),
        Err(e) => tracing::error!(error = %e, "Failed to install metrics exporter"),
    }
}

/// Record a finished request. `source` is "cache", "upstream" or "error".
pub fn record_request(method: &str, status: u16, source: &'static str, start: Instant) {
    counter!(
        "proxy_requests_total",
        "method" => method.to_string(),
        "status" => status.to_string(),
        "source" => source
    )
    .increment(1);

    histogram!(
        "proxy_request_duration_seconds",
        "method" => method.to_string(),
        "source" => source
    )
    .record(start.elapsed().as_secs_f64());
}

pub fn record_cache_lookup(result: &'static str) {
    counter!("proxy_cache_lookups_total", "result" => result).increment(1);
}

pub fn record_cache_store(result: &'static str) {
    counter!("proxy_cache_stores_total", "result" => result).increment(1);
}

pub fn record_cache_eviction() {
    counter!("proxy_cache_evictions_total").increment(1);
}

pub fn record_cache_usage(entries: usize, bytes: usize) {
    gauge!("proxy_cache_entries").set(entries as f64);
    gauge!("proxy_cache_bytes").set(bytes as f64);
}
