//! Prometheus metrics for the API server.

use axum::body::Body;
use axum::http::{Request, Response};
use axum::middleware::Next;
use metrics::{counter, gauge, histogram};
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
    // HTTP metrics
    pub const HTTP_REQUESTS_TOTAL: &str = "scenecraft_http_requests_total";
    pub const HTTP_REQUEST_DURATION_SECONDS: &str = "scenecraft_http_request_duration_seconds";
    pub const HTTP_REQUESTS_IN_FLIGHT: &str = "scenecraft_http_requests_in_flight";

    // Queue metrics
    pub const QUEUE_LENGTH: &str = "scenecraft_queue_length";
    pub const QUEUE_DLQ_LENGTH: &str = "scenecraft_queue_dlq_length";
    pub const JOBS_ENQUEUED_TOTAL: &str = "scenecraft_jobs_enqueued_total";
    pub const JOBS_CANCELLED_TOTAL: &str = "scenecraft_jobs_cancelled_total";

    // Rate limiting metrics
    pub const RATE_LIMIT_HITS_TOTAL: &str = "scenecraft_rate_limit_hits_total";
}

/// Record an HTTP request.
pub fn record_http_request(method: &str, path: &str, status: u16, duration_secs: f64) {
    let labels = [
        ("method", method.to_string()),
        ("path", sanitize_path(path)),
        ("status", status.to_string()),
    ];

    counter!(names::HTTP_REQUESTS_TOTAL, &labels).increment(1);
    histogram!(names::HTTP_REQUEST_DURATION_SECONDS, &labels).record(duration_secs);
}

/// Update queue length gauge.
pub fn set_queue_length(length: i64) {
    gauge!(names::QUEUE_LENGTH).set(length as f64);
}

/// Update dead-letter queue length gauge.
pub fn set_dlq_length(length: i64) {
    gauge!(names::QUEUE_DLQ_LENGTH).set(length as f64);
}

/// Record job submitted for generation.
pub fn record_job_enqueued() {
    counter!(names::JOBS_ENQUEUED_TOTAL).increment(1);
}

/// Record job cancellation request.
pub fn record_job_cancelled() {
    counter!(names::JOBS_CANCELLED_TOTAL).increment(1);
}

/// Record rate limit hit.
pub fn record_rate_limit_hit(endpoint: &str) {
    let labels = [("endpoint", endpoint.to_string())];
    counter!(names::RATE_LIMIT_HITS_TOTAL, &labels).increment(1);
}

/// Sanitize path for metrics labels (remove job IDs, etc.).
fn sanitize_path(path: &str) -> String {
    let path = regex_lite::Regex::new(r"[0-9a-f]{8}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{4}-[0-9a-f]{12}")
        .unwrap()
        .replace_all(path, ":job_id");
    path.to_string()
}

/// Metrics middleware for HTTP requests.
pub async fn metrics_middleware(request: Request<Body>, next: Next) -> Response<Body> {
    let method = request.method().to_string();
    let path = request.uri().path().to_string();
    let start = Instant::now();

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).increment(1.0);

    let response = next.run(request).await;

    gauge!(names::HTTP_REQUESTS_IN_FLIGHT).decrement(1.0);

    let status = response.status().as_u16();
    let duration = start.elapsed().as_secs_f64();

    record_http_request(&method, &path, status, duration);

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_path() {
        assert_eq!(
            sanitize_path("/videos/jobs/550e8400-e29b-41d4-a716-446655440000/status"),
            "/videos/jobs/:job_id/status"
        );
    }
}
