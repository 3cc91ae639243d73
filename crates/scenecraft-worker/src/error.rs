//! Worker error types.

use std::time::Duration;

use scenecraft_db::DbError;
use scenecraft_llm::LlmError;
use scenecraft_models::{ErrorKind, ErrorRecord, Stage};
use scenecraft_queue::QueueError;
use scenecraft_storage::StorageError;
use thiserror::Error;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("stage {stage:?} validation failed: {message}")]
    Validation { stage: Stage, message: String },

    #[error("stage {stage:?} timed out")]
    StageTimeout { stage: Stage },

    #[error("cancelled")]
    Cancelled,

    #[error("subprocess failed: {0}")]
    SubprocessFailed(String),

    #[error("circuit open for {dependency}, retry after {retry_after:?}")]
    CircuitOpen { dependency: String, retry_after: Duration },

    #[error("dependency {dependency} timed out after {timeout:?}")]
    DependencyTimeout { dependency: String, timeout: Duration },

    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    #[error("database error: {0}")]
    Db(#[from] DbError),

    #[error("queue error: {0}")]
    Queue(#[from] QueueError),

    #[error("llm error: {0}")]
    Llm(#[from] LlmError),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn validation(stage: Stage, message: impl Into<String>) -> Self {
        Self::Validation { stage, message: message.into() }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            WorkerError::Validation { .. } => ErrorKind::Validation,
            WorkerError::StageTimeout { .. } | WorkerError::DependencyTimeout { .. } => ErrorKind::Timeout,
            WorkerError::Cancelled => ErrorKind::Cancelled,
            WorkerError::SubprocessFailed(_) => ErrorKind::DependencyError,
            WorkerError::CircuitOpen { .. } => ErrorKind::DependencyUnavailable,
            WorkerError::Storage(e) => e.kind(),
            WorkerError::Db(e) => e.kind(),
            WorkerError::Queue(e) => e.kind(),
            WorkerError::Llm(e) => e.kind(),
            WorkerError::Io(_) => ErrorKind::Internal,
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind().default_retryable()
    }

    /// The provider-supplied backoff hint a `CircuitOpen`/rate-limited
    /// error carries, if any, for `RetryPolicy::next_delay`'s `server_hint`.
    pub fn server_hint(&self) -> Option<Duration> {
        match self {
            WorkerError::CircuitOpen { retry_after, .. } => Some(*retry_after),
            WorkerError::Llm(LlmError::RateLimited { retry_after_secs: Some(secs) }) => Some(Duration::from_secs(*secs)),
            _ => None,
        }
    }

    /// Converts to the persisted form attached to a `Job`, tagging the
    /// stage the failure occurred in.
    pub fn to_error_record(&self, stage: Stage, correlation_id: impl Into<String>) -> ErrorRecord {
        ErrorRecord::new(self.kind(), self.to_string(), Some(stage), correlation_id).retryable(self.retryable())
    }
}
