//! MetadataStore error type.

use scenecraft_models::ErrorKind;

pub type DbResult<T> = Result<T, DbError>;

#[derive(Debug, thiserror::Error)]
pub enum DbError {
    #[error("connection failed: {0}")]
    ConnectionFailed(String),

    #[error("{0} not found")]
    NotFound(String),

    #[error("conflict: {0}")]
    Conflict(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error(transparent)]
    Sqlx(#[from] sqlx::Error),
}

impl DbError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            DbError::ConnectionFailed(_) => ErrorKind::DependencyUnavailable,
            DbError::NotFound(_) => ErrorKind::NotFound,
            DbError::Conflict(_) => ErrorKind::Conflict,
            DbError::Serialization(_) => ErrorKind::Internal,
            DbError::Sqlx(sqlx::Error::PoolTimedOut) => ErrorKind::DependencyUnavailable,
            DbError::Sqlx(_) => ErrorKind::DependencyError,
        }
    }

    pub fn retryable(&self) -> bool {
        self.kind().default_retryable()
    }
}
