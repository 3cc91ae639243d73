//! Queue error types.

use scenecraft_db::DbError;
use scenecraft_models::ErrorKind;
use thiserror::Error;

pub type QueueResult<T> = Result<T, QueueError>;

#[derive(Debug, Error)]
pub enum QueueError {
    #[error("dead-lettered: {0}")]
    DeadLettered(String),

    #[error(transparent)]
    Db(#[from] DbError),
}

impl QueueError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::DeadLettered(_) => ErrorKind::Conflict,
            QueueError::Db(e) => e.kind(),
        }
    }
}
