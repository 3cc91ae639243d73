//! Operational visibility for on-call and operators: queue depth, dead-letter
//! backlog, and per-dependency circuit breaker state.

use axum::extract::State;
use axum::Json;
use serde::Serialize;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct CircuitBreakerStatus {
    pub dependency: String,
    pub state: &'static str,
    pub failure_count: u32,
    pub success_rate: f64,
}

#[derive(Debug, Serialize)]
pub struct QueueStatusResponse {
    pub queue_depth: i64,
    pub dead_letter_count: i64,
    pub circuit_breakers: Vec<CircuitBreakerStatus>,
}

/// `GET /admin/queue/status`
pub async fn queue_status(State(state): State<AppState>, user: AuthUser) -> ApiResult<Json<QueueStatusResponse>> {
    if !user.is_admin() {
        return Err(ApiError::permission("admin access required"));
    }

    let queue_depth = state.queue.depth().await?;
    let dead_letter_count = state.queue.dead_letter_count().await?;
    let circuit_breakers = state
        .circuit_breakers
        .snapshots()
        .into_iter()
        .map(|(dependency, snapshot)| CircuitBreakerStatus {
            dependency,
            state: match snapshot.kind {
                scenecraft_resilience::CircuitStateKind::Closed => "closed",
                scenecraft_resilience::CircuitStateKind::Open => "open",
                scenecraft_resilience::CircuitStateKind::HalfOpen => "half_open",
            },
            failure_count: snapshot.failure_count,
            success_rate: snapshot.success_rate,
        })
        .collect();

    Ok(Json(QueueStatusResponse { queue_depth, dead_letter_count, circuit_breakers }))
}
