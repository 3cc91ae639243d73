//! The closed error taxonomy shared across every component.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::stage::Stage;

/// Closed set of error kinds. Transport mapping lives at the API boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    Validation,
    NotFound,
    Permission,
    Conflict,
    RateLimited,
    Timeout,
    DependencyUnavailable,
    DependencyError,
    Internal,
    Cancelled,
}

impl ErrorKind {
    /// Default retryability for this kind, absent any override. Call sites
    /// that construct an `ErrorRecord` may still set `retryable` explicitly
    /// (e.g. an `internal` error explicitly flagged retryable).
    pub fn default_retryable(self) -> bool {
        matches!(
            self,
            ErrorKind::RateLimited
                | ErrorKind::Timeout
                | ErrorKind::DependencyUnavailable
                | ErrorKind::DependencyError
        )
    }

    /// Default bound on retry attempts for this kind, per spec §6.3
    /// `RETRY_MAX_ATTEMPTS`.
    pub fn default_max_attempts(self) -> u32 {
        match self {
            ErrorKind::Timeout => 3,
            ErrorKind::DependencyUnavailable => 5,
            ErrorKind::DependencyError => 3,
            ErrorKind::RateLimited => 5,
            _ => 0,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            ErrorKind::Validation => "validation",
            ErrorKind::NotFound => "not_found",
            ErrorKind::Permission => "permission",
            ErrorKind::Conflict => "conflict",
            ErrorKind::RateLimited => "rate_limited",
            ErrorKind::Timeout => "timeout",
            ErrorKind::DependencyUnavailable => "dependency_unavailable",
            ErrorKind::DependencyError => "dependency_error",
            ErrorKind::Internal => "internal",
            ErrorKind::Cancelled => "cancelled",
        }
    }

    /// HTTP status code this kind maps to at the transport boundary.
    pub fn http_status(self) -> u16 {
        match self {
            ErrorKind::Validation => 400,
            ErrorKind::Permission => 403,
            ErrorKind::NotFound => 404,
            ErrorKind::Conflict => 409,
            ErrorKind::RateLimited => 429,
            ErrorKind::Timeout => 504,
            ErrorKind::DependencyUnavailable => 503,
            ErrorKind::DependencyError => 502,
            ErrorKind::Cancelled => 499,
            ErrorKind::Internal => 500,
        }
    }
}

/// A fully contextualized error as it is persisted on a `Job` or emitted
/// over the wire.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ErrorRecord {
    pub kind: ErrorKind,
    pub message: String,
    pub stage: Option<Stage>,
    pub retryable: bool,
    pub correlation_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
    pub ts: DateTime<Utc>,
}

impl ErrorRecord {
    pub fn new(
        kind: ErrorKind,
        message: impl Into<String>,
        stage: Option<Stage>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self {
            retryable: kind.default_retryable(),
            kind,
            message: message.into(),
            stage,
            correlation_id: correlation_id.into(),
            details: None,
            ts: Utc::now(),
        }
    }

    pub fn retryable(mut self, retryable: bool) -> Self {
        self.retryable = retryable;
        self
    }

    pub fn with_details(mut self, details: serde_json::Value) -> Self {
        self.details = Some(details);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_and_validation_are_never_retryable_by_default() {
        assert!(!ErrorKind::Cancelled.default_retryable());
        assert!(!ErrorKind::Validation.default_retryable());
    }

    #[test]
    fn http_status_mapping_matches_taxonomy() {
        assert_eq!(ErrorKind::RateLimited.http_status(), 429);
        assert_eq!(ErrorKind::DependencyUnavailable.http_status(), 503);
        assert_eq!(ErrorKind::Cancelled.http_status(), 499);
    }
}
