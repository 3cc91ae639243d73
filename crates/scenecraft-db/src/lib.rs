//! Relational MetadataStore: the system of record for `User`, `Job`,
//! `FileMetadata`, the `JobQueue`, and `ProgressEvent`s. All writes are
//! transactional at the query level; `dequeue` uses `FOR UPDATE SKIP
//! LOCKED` as the serialization point for job assignment.

pub mod client;
pub mod config;
pub mod error;
pub mod files;
pub mod jobs;
pub mod progress;
pub mod queue;
pub mod submissions;
pub mod users;

pub use client::DbClient;
pub use config::DbConfig;
pub use error::{DbError, DbResult};
pub use files::FileRepo;
pub use jobs::JobRepo;
pub use progress::ProgressRepo;
pub use queue::QueueRepo;
pub use submissions::SubmissionRepo;
pub use users::UserRepo;
