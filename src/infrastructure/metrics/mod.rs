//! Prometheus Metrics Module
//!
//! Provides application-wide metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - HTTP request counts and latency by method and route
//! - Gateway connections by state
//! - Gateway events dispatched and rejected
//! - Voice participants and signaling broker peers

use once_cell::sync::Lazy;
use prometheus::{
    Encoder, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};

const NAMESPACE: &str = "huddle";

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// HTTP request counter - tracks total requests by method, path, and status code
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("http_requests_total", "Total number of HTTP requests").namespace(NAMESPACE),
        &["method", "path", "status"],
    )
    .expect("Failed to create HTTP_REQUESTS_TOTAL metric")
});

/// HTTP request latency histogram - tracks request duration in seconds
pub static HTTP_REQUEST_DURATION_SECONDS: Lazy<HistogramVec> = Lazy::new(|| {
    let buckets = vec![0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0];
    HistogramVec::new(
        HistogramOpts::new(
            "http_request_duration_seconds",
            "HTTP request latency in seconds",
        )
        .namespace(NAMESPACE)
        .buckets(buckets),
        &["method", "path"],
    )
    .expect("Failed to create HTTP_REQUEST_DURATION_SECONDS metric")
});

/// Live gateway connections
pub static GATEWAY_CONNECTIONS_ACTIVE: Lazy<GaugeVec> = Lazy::new(|| {
    GaugeVec::new(
        Opts::new(
            "gateway_connections_active",
            "Number of live gateway connections",
        )
        .namespace(NAMESPACE),
        &["state"], // "connected", "authenticated"
    )
    .expect("Failed to create GATEWAY_CONNECTIONS_ACTIVE metric")
});

/// Client events dispatched, by event name
pub static GATEWAY_EVENTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gateway_events_total", "Client events dispatched").namespace(NAMESPACE),
        &["event"],
    )
    .expect("Failed to create GATEWAY_EVENTS_TOTAL metric")
});

/// Rejected client events, by error code
pub static GATEWAY_REJECTIONS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("gateway_rejections_total", "Client events rejected").namespace(NAMESPACE),
        &["code"],
    )
    .expect("Failed to create GATEWAY_REJECTIONS_TOTAL metric")
});

/// Participants across all voice rooms
pub static VOICE_PARTICIPANTS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("voice_participants_active", "Participants in voice rooms").namespace(NAMESPACE),
    )
    .expect("Failed to create VOICE_PARTICIPANTS_ACTIVE metric")
});

/// Peers connected to the media-signaling broker
pub static SIGNALING_PEERS_ACTIVE: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::with_opts(
        Opts::new("signaling_peers_active", "Peers connected to the signaling broker")
            .namespace(NAMESPACE),
    )
    .expect("Failed to create SIGNALING_PEERS_ACTIVE metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    let collectors: [Box<dyn prometheus::core::Collector>; 7] = [
        Box::new(HTTP_REQUESTS_TOTAL.clone()),
        Box::new(HTTP_REQUEST_DURATION_SECONDS.clone()),
        Box::new(GATEWAY_CONNECTIONS_ACTIVE.clone()),
        Box::new(GATEWAY_EVENTS_TOTAL.clone()),
        Box::new(GATEWAY_REJECTIONS_TOTAL.clone()),
        Box::new(VOICE_PARTICIPANTS_ACTIVE.clone()),
        Box::new(SIGNALING_PEERS_ACTIVE.clone()),
    ];
    for collector in collectors {
        if let Err(e) = registry.register(collector) {
            tracing::error!(error = %e, "Failed to register metric");
        }
    }
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!(error = %e, "Failed to encode metrics");
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Helper to record HTTP request metrics
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let status = status.to_string();
    HTTP_REQUESTS_TOTAL
        .with_label_values(&[method, path, status.as_str()])
        .inc();
    HTTP_REQUEST_DURATION_SECONDS
        .with_label_values(&[method, path])
        .observe(duration_secs);
}

/// Helper to update gateway connection counts
pub fn set_gateway_connections(connected: usize, authenticated: usize) {
    GATEWAY_CONNECTIONS_ACTIVE
        .with_label_values(&["connected"])
        .set(connected as f64);
    GATEWAY_CONNECTIONS_ACTIVE
        .with_label_values(&["authenticated"])
        .set(authenticated as f64);
}

pub fn record_gateway_event(event: &str) {
    GATEWAY_EVENTS_TOTAL.with_label_values(&[event]).inc();
}

pub fn record_gateway_rejection(code: &str) {
    GATEWAY_REJECTIONS_TOTAL.with_label_values(&[code]).inc();
}

pub fn set_voice_participants(count: usize) {
    VOICE_PARTICIPANTS_ACTIVE.set(count as i64);
}

pub fn set_signaling_peers(count: usize) {
    SIGNALING_PEERS_ACTIVE.set(count as i64);
}
