//! API error types: maps the shared `ErrorKind` taxonomy onto the wire
//! shape in spec §6.1/§7 — `{error:{code, message, details?, correlation_id}, retry_after?}`.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use scenecraft_models::ErrorKind;
use serde::Serialize;
use thiserror::Error;
use uuid::Uuid;

pub type ApiResult<T> = Result<T, ApiError>;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("{message}")]
    Kind { kind: ErrorKind, message: String, details: Option<serde_json::Value>, retry_after_secs: Option<u64> },

    #[error("database error: {0}")]
    Db(#[from] scenecraft_db::DbError),

    #[error("storage error: {0}")]
    Storage(#[from] scenecraft_storage::StorageError),

    #[error("queue error: {0}")]
    Queue(#[from] scenecraft_queue::QueueError),
}

impl ApiError {
    pub fn validation(msg: impl Into<String>) -> Self {
        Self::kind(ErrorKind::Validation, msg)
    }

    pub fn permission(msg: impl Into<String>) -> Self {
        Self::kind(ErrorKind::Permission, msg)
    }

    pub fn not_found(msg: impl Into<String>) -> Self {
        Self::kind(ErrorKind::NotFound, msg)
    }

    pub fn conflict(msg: impl Into<String>) -> Self {
        Self::kind(ErrorKind::Conflict, msg)
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::kind(ErrorKind::Internal, msg)
    }

    fn kind(kind: ErrorKind, message: impl Into<String>) -> Self {
        Self::Kind { kind, message: message.into(), details: None, retry_after_secs: None }
    }

    fn wire_kind(&self) -> ErrorKind {
        match self {
            ApiError::Kind { kind, .. } => *kind,
            ApiError::Db(e) => e.kind(),
            ApiError::Storage(e) => e.kind(),
            ApiError::Queue(e) => e.kind(),
        }
    }
}

#[derive(Serialize)]
struct ErrorBody {
    error: ErrorDetail,
    #[serde(skip_serializing_if = "Option::is_none")]
    retry_after: Option<u64>,
}

#[derive(Serialize)]
struct ErrorDetail {
    code: &'static str,
    message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<serde_json::Value>,
    correlation_id: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let kind = self.wire_kind();
        let status = StatusCode::from_u16(kind.http_status()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let correlation_id = Uuid::new_v4().to_string();

        let dependency_display = self.to_string();
        let (message, details, retry_after) = match self {
            ApiError::Kind { message, details, retry_after_secs, .. } => (message, details, retry_after_secs),
            ApiError::Db(_) | ApiError::Storage(_) | ApiError::Queue(_) => {
                tracing::error!(correlation_id, error = %dependency_display, "unhandled dependency error");
                let message = if kind == ErrorKind::Internal { "an internal error occurred".to_string() } else { dependency_display };
                (message, None, None)
            }
        };

        let body = ErrorBody { error: ErrorDetail { code: kind.as_str(), message, details, correlation_id }, retry_after };
        (status, Json(body)).into_response()
    }
}
