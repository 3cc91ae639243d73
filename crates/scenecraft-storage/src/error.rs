//! Storage error types.

use scenecraft_models::ErrorKind;
use thiserror::Error;

/// Result type for storage operations.
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors that can occur during storage operations.
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("failed to configure storage client: {0}")]
    ConfigError(String),

    #[error("object not found: {0}")]
    NotFound(String),

    #[error("upload failed: {0}")]
    UploadFailed(String),

    #[error("download failed: {0}")]
    DownloadFailed(String),

    #[error("delete failed: {0}")]
    DeleteFailed(String),

    #[error("list failed: {0}")]
    ListFailed(String),

    #[error("presign failed: {0}")]
    PresignFailed(String),

    #[error("invalid key: {0}")]
    InvalidKey(String),

    #[error("presign ttl out of bounds: {0}")]
    InvalidTtl(String),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("aws sdk error: {0}")]
    AwsSdk(String),
}

impl StorageError {
    pub fn config_error(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    pub fn not_found(key: impl Into<String>) -> Self {
        Self::NotFound(key.into())
    }

    pub fn upload_failed(msg: impl Into<String>) -> Self {
        Self::UploadFailed(msg.into())
    }

    pub fn delete_failed(msg: impl Into<String>) -> Self {
        Self::DeleteFailed(msg.into())
    }

    /// Maps to the closed `ErrorKind` taxonomy at stage boundaries
    /// (spec §4.5 failure semantics: transient upload errors become
    /// `dependency_error` once retries are exhausted).
    pub fn kind(&self) -> ErrorKind {
        match self {
            StorageError::NotFound(_) => ErrorKind::NotFound,
            StorageError::InvalidKey(_) | StorageError::InvalidTtl(_) | StorageError::ConfigError(_) => ErrorKind::Validation,
            StorageError::UploadFailed(_)
            | StorageError::DownloadFailed(_)
            | StorageError::DeleteFailed(_)
            | StorageError::ListFailed(_)
            | StorageError::AwsSdk(_) => ErrorKind::DependencyError,
            StorageError::PresignFailed(_) | StorageError::Io(_) | StorageError::Json(_) => ErrorKind::Internal,
        }
    }
}
