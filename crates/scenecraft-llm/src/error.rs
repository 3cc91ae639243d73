//! LLM transport error types.

use scenecraft_models::ErrorKind;
use thiserror::Error;

pub type LlmResult<T> = Result<T, LlmError>;

#[derive(Debug, Error)]
pub enum LlmError {
    #[error("request failed: {0}")]
    RequestFailed(String),

    #[error("rate limited{}", .retry_after_secs.map(|s| format!(", retry after {s}s")).unwrap_or_default())]
    RateLimited { retry_after_secs: Option<u64> },

    #[error("provider returned non-conforming response: {0}")]
    InvalidResponse(String),

    #[error("request timed out")]
    Timeout,
}

impl LlmError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            LlmError::RequestFailed(_) => ErrorKind::DependencyError,
            LlmError::RateLimited { .. } => ErrorKind::RateLimited,
            LlmError::InvalidResponse(_) => ErrorKind::Validation,
            LlmError::Timeout => ErrorKind::Timeout,
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind().default_retryable()
    }
}
