//! Shared data models for the scenecraft backend.
//!
//! This crate provides the Serde/JsonSchema-serializable types shared by
//! every other crate in the workspace: jobs and their configuration, the
//! closed error taxonomy, stored-artifact metadata, queue entries, and
//! progress events. Nothing here talks to a database, the filesystem, or
//! the network.

pub mod configuration;
pub mod error;
pub mod file_metadata;
pub mod ids;
pub mod job;
pub mod progress;
pub mod queue_entry;
pub mod stage;
pub mod user;

pub use configuration::{Configuration, ConfigurationError, OutputFormat, Quality};
pub use error::{ErrorKind, ErrorRecord};
pub use file_metadata::{FileKind, FileMetadata};
pub use ids::{Clock, FileId, JobId, SystemClock, UserId};
pub use job::{Job, JobStatus, Priority};
pub use progress::{ProgressEvent, Severity};
pub use queue_entry::QueueEntry;
pub use stage::Stage;
pub use user::{Role, User};
