//! Axum HTTP API server: job submission, status polling, artifact URLs,
//! cancellation, and operational visibility into the queue and its
//! dependencies.

pub mod auth;
pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
