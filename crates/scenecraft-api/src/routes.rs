//! API routes.

use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use metrics_exporter_prometheus::PrometheusHandle;

use crate::handlers::admin::queue_status;
use crate::handlers::health::{health, ready};
use crate::handlers::videos::{cancel, generate, status, video_url};
use crate::metrics::metrics_middleware;
use crate::middleware::{cors_layer, rate_limit_middleware, request_id, request_logging, security_headers, RateLimiterCache};
use crate::state::AppState;

/// Create the API router.
pub fn create_router(state: AppState, metrics_handle: Option<PrometheusHandle>) -> Router {
    let video_routes = Router::new()
        .route("/videos/generate", post(generate))
        .route("/videos/jobs/:job_id/status", get(status))
        .route("/videos/jobs/:job_id/video-url", get(video_url))
        .route("/videos/jobs/:job_id/cancel", post(cancel));

    let admin_routes = Router::new().route("/admin/queue/status", get(queue_status));

    let rate_limiter = std::sync::Arc::new(RateLimiterCache::new(state.config.rate_limit_rps));

    let api_routes = Router::new()
        .merge(video_routes)
        .merge(admin_routes)
        .layer(middleware::from_fn_with_state(rate_limiter.clone(), rate_limit_middleware));

    let health_routes = Router::new().route("/health", get(health)).route("/healthz", get(health)).route("/ready", get(ready));

    let metrics_routes = if let Some(handle) = metrics_handle {
        Router::new().route("/metrics", get(move || async move { handle.render() }))
    } else {
        Router::new()
    };

    Router::new()
        .merge(api_routes)
        .merge(health_routes)
        .merge(metrics_routes)
        .layer(middleware::from_fn(metrics_middleware))
        .layer(middleware::from_fn(security_headers))
        .layer(middleware::from_fn(request_id))
        .layer(middleware::from_fn(request_logging))
        .layer(cors_layer(&state.config.cors_origins))
        .with_state(state)
}
