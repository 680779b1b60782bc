//! Prometheus metrics for the reelgate proxy.
//!
//! Counters cover request outcomes, access denials by reason, and bytes
//! handed to response bodies. Paths and query strings are never used as
//! label values.
//!
//! The `/metrics` route is only mounted when `server.metrics_enabled` is set
//! and should be reachable from the scraper network only.

use crate::policy::AccessReason;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use prometheus::{self, Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::{LazyLock, Once};

/// Global Prometheus registry for all metrics.
pub static REGISTRY: LazyLock<Registry> = LazyLock::new(Registry::new);

pub static REQUESTS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelgate_requests_total",
            "Proxy requests by outcome",
        ),
        &["outcome"],
    )
    .expect("metric creation failed")
});

pub static ACCESS_DENIALS: LazyLock<IntCounterVec> = LazyLock::new(|| {
    IntCounterVec::new(
        Opts::new(
            "reelgate_access_denials_total",
            "Requests rejected by the access pipeline, by reason",
        ),
        &["reason"],
    )
    .expect("metric creation failed")
});

pub static BYTES_SERVED: LazyLock<IntCounter> = LazyLock::new(|| {
    IntCounter::new(
        "reelgate_bytes_served_total",
        "Object bytes scheduled for streaming to clients",
    )
    .expect("metric creation failed")
});

static REGISTER: Once = Once::new();

/// Register all metrics with the global registry. Safe to call repeatedly.
pub fn register_metrics() {
    REGISTER.call_once(|| {
        REGISTRY
            .register(Box::new(REQUESTS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(ACCESS_DENIALS.clone()))
            .expect("metric registration failed");
        REGISTRY
            .register(Box::new(BYTES_SERVED.clone()))
            .expect("metric registration failed");
    });
}

/// Outcome label for a response status.
pub fn outcome_label(status: StatusCode) -> &'static str {
    match status {
        StatusCode::OK => "ok",
        StatusCode::PARTIAL_CONTENT => "partial",
        StatusCode::NO_CONTENT => "preflight",
        StatusCode::BAD_REQUEST => "bad_request",
        StatusCode::FORBIDDEN => "denied",
        StatusCode::NOT_FOUND => "not_found",
        StatusCode::METHOD_NOT_ALLOWED => "method_not_allowed",
        StatusCode::RANGE_NOT_SATISFIABLE => "range_not_satisfiable",
        s if s.is_server_error() => "error",
        _ => "other",
    }
}

pub fn record_outcome(status: StatusCode) {
    REQUESTS.with_label_values(&[outcome_label(status)]).inc();
}

pub fn record_denial(reason: AccessReason) {
    ACCESS_DENIALS.with_label_values(&[reason.as_str()]).inc();
}

/// GET /metrics - Prometheus metrics endpoint.
pub async fn metrics_handler() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();

    let mut buffer = Vec::new();
    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [("content-type", "text/plain; version=0.0.4; charset=utf-8")],
            buffer,
        ),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            [("content-type", "text/plain; charset=utf-8")],
            format!("Failed to encode metrics: {e}").into_bytes(),
        ),
    }
}
