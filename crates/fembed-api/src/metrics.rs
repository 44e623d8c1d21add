//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::Request;
use axum::middleware::Next;
use axum::response::Response;
use metrics::{counter, histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::time::Instant;

/// Initialize the Prometheus metrics recorder.
/// Returns a handle that can be used to render metrics.
pub fn init_metrics() -> PrometheusHandle {
    PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder")
}

/// Metric names as constants for consistency.
pub mod names {
    pub const HTTP_REQUESTS_TOTAL: &str = "fembed_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "fembed_http_request_duration_seconds";
    pub const EMBEDDING_REQUESTS_TOTAL: &str = "fembed_embedding_requests_total";
    pub const BATCH_REQUESTS_TOTAL: &str = "fembed_batch_requests_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", path.to_string()),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Record an embedding request outcome ("detected", "no_detection").
pub fn record_embedding_request(outcome: &'static str) {
    counter!(names::EMBEDDING_REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Record a batch request.
pub fn record_batch_request(total: usize, successful: usize) {
    counter!(names::BATCH_REQUESTS_TOTAL, "outcome" => "items").increment(total as u64);
    counter!(names::BATCH_REQUESTS_TOTAL, "outcome" => "successful").increment(successful as u64);
}

/// Middleware recording request counts and latencies.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    let response = next.run(request).await;

    record_http_request(
        &method,
        &path,
        response.status().as_u16(),
        start.elapsed().as_secs_f64(),
    );

    response
}
