//! Durable job queue and progress reporting, backed by the relational
//! MetadataStore: lease/ack/nack dispatch semantics plus coalesced,
//! dual-delivery (persisted + in-process broadcast) progress events.

pub mod error;
pub mod progress;
pub mod queue;

pub use error::{QueueError, QueueResult};
pub use progress::ProgressReporter;
pub use queue::{JobQueue, QueueConfig};
