//! Prometheus metrics for the emulator.
//!
//! All metric types use atomics internally (no locks on the hot path). The
//! `Metrics` struct is `Clone`-cheap (Arc-based registry + Arc-based
//! collectors), following the same shape the teacher's metrics module used.

use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use prometheus::{
    Encoder, Gauge, GaugeVec, HistogramOpts, HistogramVec, IntCounterVec, Opts, Registry,
    TextEncoder, TEXT_FORMAT,
};
use std::time::Instant;

use crate::api::state::AppState;

#[derive(Clone)]
pub struct Metrics {
    pub registry: Registry,

    pub process_start_time_seconds: Gauge,
    pub build_info: GaugeVec,

    pub http_requests_total: IntCounterVec,
    pub http_request_duration_seconds: HistogramVec,
    pub http_request_size_bytes: HistogramVec,
    pub http_response_size_bytes: HistogramVec,

    pub active_multipart_uploads: Gauge,
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

impl Metrics {
    pub fn new() -> Self {
        let registry = Registry::new();

        let process_start_time_seconds =
            Gauge::new("process_start_time_seconds", "Start time of the process").unwrap();
        registry
            .register(Box::new(process_start_time_seconds.clone()))
            .unwrap();

        let build_info = GaugeVec::new(
            Opts::new("s3emu_build_info", "Build information"),
            &["version"],
        )
        .unwrap();
        registry.register(Box::new(build_info.clone())).unwrap();

        #[cfg(target_os = "linux")]
        {
            let pc = prometheus::process_collector::ProcessCollector::for_self();
            let _ = registry.register(Box::new(pc));
        }

        let http_requests_total = IntCounterVec::new(
            Opts::new(
                "s3emu_http_requests_total",
                "Total HTTP requests by method, status, and operation",
            ),
            &["method", "status", "operation"],
        )
        .unwrap();
        registry
            .register(Box::new(http_requests_total.clone()))
            .unwrap();

        let body_size_buckets = prometheus::exponential_buckets(1024.0, 10.0, 6).unwrap();

        let http_request_duration_seconds = HistogramVec::new(
            HistogramOpts::new(
                "s3emu_http_request_duration_seconds",
                "HTTP request duration in seconds",
            ),
            &["method", "operation"],
        )
        .unwrap();
        registry
            .register(Box::new(http_request_duration_seconds.clone()))
            .unwrap();

        let http_request_size_bytes = HistogramVec::new(
            HistogramOpts::new(
                "s3emu_http_request_size_bytes",
                "HTTP request body size in bytes",
            )
            .buckets(body_size_buckets.clone()),
            &["method"],
        )
        .unwrap();
        registry
            .register(Box::new(http_request_size_bytes.clone()))
            .unwrap();

        let http_response_size_bytes = HistogramVec::new(
            HistogramOpts::new(
                "s3emu_http_response_size_bytes",
                "HTTP response body size in bytes",
            )
            .buckets(body_size_buckets),
            &["method"],
        )
        .unwrap();
        registry
            .register(Box::new(http_response_size_bytes.clone()))
            .unwrap();

        let active_multipart_uploads = Gauge::new(
            "s3emu_active_multipart_uploads",
            "In-progress multipart uploads across all buckets",
        )
        .unwrap();
        registry
            .register(Box::new(active_multipart_uploads.clone()))
            .unwrap();

        Metrics {
            registry,
            process_start_time_seconds,
            build_info,
            http_requests_total,
            http_request_duration_seconds,
            http_request_size_bytes,
            http_response_size_bytes,
            active_multipart_uploads,
        }
    }
}

/// Classify an S3 request into a bounded operation label, coarse enough not
/// to blow up cardinality on arbitrary object keys.
pub fn classify_s3_operation(method: &str, path: &str) -> &'static str {
    match path {
        "/health" => return "health",
        "/metrics" => return "metrics",
        _ => {}
    }

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();

    match (method, segments.len()) {
        ("GET", 0) => "list_buckets",
        ("HEAD", 0) => "head_root",
        ("GET", 1) => "bucket_get",
        ("PUT", 1) => "bucket_put",
        ("DELETE", 1) => "delete_bucket",
        ("HEAD", 1) => "head_bucket",
        ("POST", 1) => "bucket_post",
        ("GET", _) => "object_get",
        ("PUT", _) => "object_put",
        ("DELETE", _) => "object_delete",
        ("HEAD", _) => "head_object",
        ("POST", _) => "object_post",
        _ => "unknown",
    }
}

/// Axum middleware that records HTTP request metrics.
pub async fn http_metrics_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let operation = classify_s3_operation(&method, &path);

    if let Some(cl) = request
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
    {
        state
            .metrics()
            .http_request_size_bytes
            .with_label_values(&[&method])
            .observe(cl);
    }

    let start = Instant::now();
    let response = next.run(request).await;
    let duration = start.elapsed().as_secs_f64();

    let status = response.status().as_u16().to_string();

    state
        .metrics()
        .http_requests_total
        .with_label_values(&[&method, &status, operation])
        .inc();
    state
        .metrics()
        .http_request_duration_seconds
        .with_label_values(&[&method, operation])
        .observe(duration);

    if let Some(cl) = response
        .headers()
        .get("content-length")
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.parse::<f64>().ok())
    {
        state
            .metrics()
            .http_response_size_bytes
            .with_label_values(&[&method])
            .observe(cl);
    }

    response
}

/// Handler for `GET /metrics` — returns Prometheus text format.
pub async fn metrics_handler(State(state): State<AppState>) -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = state.metrics().registry.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        return (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("failed to encode metrics: {e}"),
        )
            .into_response();
    }
    (StatusCode::OK, [("content-type", TEXT_FORMAT)], buffer).into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_bucket_and_object_operations() {
        assert_eq!(classify_s3_operation("GET", "/health"), "health");
        assert_eq!(classify_s3_operation("GET", "/"), "list_buckets");
        assert_eq!(classify_s3_operation("PUT", "/mybucket"), "bucket_put");
        assert_eq!(classify_s3_operation("GET", "/mybucket/a/b/c"), "object_get");
        assert_eq!(classify_s3_operation("DELETE", "/mybucket/k"), "object_delete");
    }
}
