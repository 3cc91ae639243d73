//! Durable prioritized FIFO job queue, backed by the relational
//! MetadataStore (spec §4.6/§4.7): lease/ack/nack semantics with
//! dead-letter handling once `max_dispatch_attempts` is exceeded.

use std::time::Duration;

use chrono::{DateTime, Utc};
use scenecraft_db::QueueRepo;
use scenecraft_models::{JobId, Priority, QueueEntry};
use tracing::{info, warn};

use crate::error::QueueResult;

/// Queue configuration.
#[derive(Debug, Clone)]
pub struct QueueConfig {
    /// Default lease duration granted on `dequeue`.
    pub lease_ttl: Duration,
    /// Dispatch attempts (nacks) allowed before an entry is dead-lettered.
    pub max_dispatch_attempts: u32,
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self { lease_ttl: Duration::from_secs(60), max_dispatch_attempts: 5 }
    }
}

impl QueueConfig {
    pub fn from_env() -> Self {
        let default = Self::default();
        Self {
            lease_ttl: std::env::var("QUEUE_LEASE_TTL_SECONDS").ok().and_then(|v| v.parse().ok()).map(Duration::from_secs).unwrap_or(default.lease_ttl),
            max_dispatch_attempts: std::env::var("QUEUE_MAX_DISPATCH_ATTEMPTS").ok().and_then(|v| v.parse().ok()).unwrap_or(default.max_dispatch_attempts),
        }
    }
}

/// Prioritized FIFO-within-priority-class queue with lease semantics.
#[derive(Clone)]
pub struct JobQueue {
    repo: QueueRepo,
    config: QueueConfig,
}

impl JobQueue {
    pub fn new(repo: QueueRepo, config: QueueConfig) -> Self {
        Self { repo, config }
    }

    pub fn lease_ttl(&self) -> Duration {
        self.config.lease_ttl
    }

    pub async fn enqueue(&self, job_id: JobId, priority: Priority, now: DateTime<Utc>) -> QueueResult<()> {
        self.repo.enqueue(job_id, priority, now).await?;
        info!(job_id = %job_id, ?priority, "job enqueued");
        Ok(())
    }

    /// Acquires a lease on the highest-priority dispatchable entry. This
    /// is the single serialization point for job assignment; see
    /// `QueueRepo::dequeue` for the `FOR UPDATE SKIP LOCKED` statement.
    pub async fn dequeue(&self, worker_id: &str, now: DateTime<Utc>) -> QueueResult<Option<JobId>> {
        let job_id = self.repo.dequeue(worker_id, now, self.config.lease_ttl).await?;
        if let Some(id) = job_id {
            info!(job_id = %id, worker_id, "job leased");
        }
        Ok(job_id)
    }

    /// Workers must call this every `lease_ttl / 3`; a missed renewal
    /// means another worker may re-dispatch the job once the lease expires.
    pub async fn renew_lease(&self, job_id: JobId, worker_id: &str, now: DateTime<Utc>) -> QueueResult<bool> {
        Ok(self.repo.renew_lease(job_id, worker_id, now, self.config.lease_ttl).await?)
    }

    pub async fn ack(&self, job_id: JobId) -> QueueResult<()> {
        self.repo.ack(job_id).await?;
        info!(job_id = %job_id, "job acked");
        Ok(())
    }

    /// Releases the lease and schedules redispatch after `retry_after`.
    /// Returns `true` if this nack dead-lettered the entry.
    pub async fn nack(&self, job_id: JobId, retry_after: Duration, now: DateTime<Utc>) -> QueueResult<bool> {
        let dead_lettered = self.repo.nack(job_id, retry_after, now, self.config.max_dispatch_attempts).await?;
        if dead_lettered {
            warn!(job_id = %job_id, "job dead-lettered after exhausting dispatch attempts");
        }
        Ok(dead_lettered)
    }

    pub async fn depth(&self) -> QueueResult<i64> {
        Ok(self.repo.depth().await?)
    }

    pub async fn dead_letter_count(&self) -> QueueResult<i64> {
        Ok(self.repo.dead_letter_count().await?)
    }

    pub async fn entry(&self, job_id: JobId) -> QueueResult<Option<QueueEntry>> {
        Ok(self.repo.get_entry(job_id).await?)
    }
}
