//! Prometheus Metrics Module
//!
//! Provides relay metrics collection using Prometheus.
//!
//! # Metrics Collected
//! - Live WebSocket connections by handshake state
//! - Handshake outcomes
//! - Frames delivered by event type
//! - Connections evicted after a failed write

use once_cell::sync::Lazy;
use prometheus::{Encoder, IntCounter, IntCounterVec, IntGaugeVec, Opts, Registry, TextEncoder};

/// Global metrics registry
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

/// Live WebSocket connections
pub static WEBSOCKET_CONNECTIONS_ACTIVE: Lazy<IntGaugeVec> = Lazy::new(|| {
    IntGaugeVec::new(
        Opts::new(
            "websocket_connections_active",
            "Number of live WebSocket connections",
        )
        .namespace("wayzer_relay"),
        &["state"], // "awaiting_auth", "authenticated"
    )
    .expect("Failed to create WEBSOCKET_CONNECTIONS_ACTIVE metric")
});

/// Handshake outcomes
pub static HANDSHAKES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("handshakes_total", "WebSocket auth handshakes by result")
            .namespace("wayzer_relay"),
        &["result"], // "accepted", "invalid_token", "auth_timeout", "malformed_auth"
    )
    .expect("Failed to create HANDSHAKES_TOTAL metric")
});

/// Frames written to live connections
pub static FRAMES_DELIVERED_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("frames_delivered_total", "Frames queued to live connections")
            .namespace("wayzer_relay"),
        &["event"],
    )
    .expect("Failed to create FRAMES_DELIVERED_TOTAL metric")
});

/// Connections dropped because their writer had already gone away
pub static DEAD_CONNECTIONS_EVICTED_TOTAL: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::with_opts(
        Opts::new(
            "dead_connections_evicted_total",
            "Connections unregistered after a failed write",
        )
        .namespace("wayzer_relay"),
    )
    .expect("Failed to create DEAD_CONNECTIONS_EVICTED_TOTAL metric")
});

/// Register all metrics with the registry
fn register_metrics(registry: &Registry) {
    registry
        .register(Box::new(WEBSOCKET_CONNECTIONS_ACTIVE.clone()))
        .expect("Failed to register WEBSOCKET_CONNECTIONS_ACTIVE");
    registry
        .register(Box::new(HANDSHAKES_TOTAL.clone()))
        .expect("Failed to register HANDSHAKES_TOTAL");
    registry
        .register(Box::new(FRAMES_DELIVERED_TOTAL.clone()))
        .expect("Failed to register FRAMES_DELIVERED_TOTAL");
    registry
        .register(Box::new(DEAD_CONNECTIONS_EVICTED_TOTAL.clone()))
        .expect("Failed to register DEAD_CONNECTIONS_EVICTED_TOTAL");
}

/// Collect and encode all metrics as Prometheus text format
pub fn gather_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        tracing::error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8(buffer).unwrap_or_default()
}

/// Track a connection entering a handshake state.
pub fn connection_opened(state: &str) {
    WEBSOCKET_CONNECTIONS_ACTIVE.with_label_values(&[state]).inc();
}

/// Track a connection leaving a handshake state.
pub fn connection_closed(state: &str) {
    WEBSOCKET_CONNECTIONS_ACTIVE.with_label_values(&[state]).dec();
}

pub fn record_handshake(result: &str) {
    HANDSHAKES_TOTAL.with_label_values(&[result]).inc();
}

pub fn record_delivery(event: &str, frames: usize) {
    FRAMES_DELIVERED_TOTAL
        .with_label_values(&[event])
        .inc_by(frames as u64);
}

pub fn record_eviction() {
    DEAD_CONNECTIONS_EVICTED_TOTAL.inc();
}
