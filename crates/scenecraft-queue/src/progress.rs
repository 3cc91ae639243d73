//! `ProgressReporter`: persists stage transitions and percentage, and
//! publishes them to in-process subscribers (spec §4.8).
//!
//! At most one persisted event per `(job_id, stage)` per 250 ms is
//! written to the MetadataStore; the final event for a stage is always
//! persisted regardless of the coalescing window, since callers mark it
//! with `force = true`. The in-process fan-out is unconditional: every
//! `emit` call reaches active subscribers, coalescing only throttles
//! durable writes.

use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{Duration, Instant};

use scenecraft_db::{JobRepo, ProgressRepo};
use scenecraft_models::{Clock, JobId, JobStatus, ProgressEvent, Severity, Stage};
use tokio::sync::broadcast;
use tracing::debug;

use crate::error::QueueResult;

const COALESCE_WINDOW: Duration = Duration::from_millis(250);
const SUBSCRIBER_CHANNEL_CAPACITY: usize = 256;

/// Tracks the last persisted-event instant per `(job_id, stage)`, isolated
/// from the repositories so the coalescing rule can be unit tested without
/// a database.
#[derive(Default)]
struct CoalesceTracker {
    last_persisted: Mutex<HashMap<(JobId, Stage), Instant>>,
}

impl CoalesceTracker {
    fn should_persist(&self, job_id: JobId, stage: Stage) -> bool {
        let mut last = self.last_persisted.lock().unwrap();
        let key = (job_id, stage);
        let now = Instant::now();
        match last.get(&key) {
            Some(previous) if now.duration_since(*previous) < COALESCE_WINDOW => false,
            _ => {
                last.insert(key, now);
                true
            }
        }
    }

    fn forget(&self, job_id: JobId) {
        self.last_persisted.lock().unwrap().retain(|(id, _), _| *id != job_id);
    }
}

pub struct ProgressReporter {
    progress_repo: ProgressRepo,
    job_repo: JobRepo,
    coalesce: CoalesceTracker,
    channels: Mutex<HashMap<JobId, broadcast::Sender<ProgressEvent>>>,
}

impl ProgressReporter {
    pub fn new(progress_repo: ProgressRepo, job_repo: JobRepo) -> Self {
        Self { progress_repo, job_repo, coalesce: CoalesceTracker::default(), channels: Mutex::new(HashMap::new()) }
    }

    /// Subscribes to live progress events for `job_id`; the returned
    /// receiver only sees events emitted after this call.
    pub fn subscribe(&self, job_id: JobId) -> broadcast::Receiver<ProgressEvent> {
        let mut channels = self.channels.lock().unwrap();
        channels.entry(job_id).or_insert_with(|| broadcast::channel(SUBSCRIBER_CHANNEL_CAPACITY).0).subscribe()
    }

    /// Drops the broadcast channel for a job once it reaches a terminal
    /// state, so memory doesn't grow unbounded across job lifetimes.
    pub fn forget(&self, job_id: JobId) {
        self.channels.lock().unwrap().remove(&job_id);
        self.coalesce.forget(job_id);
    }

    #[allow(clippy::too_many_arguments)]
    pub async fn emit(
        &self,
        clock: &dyn Clock,
        job_id: JobId,
        stage: Stage,
        percentage: f64,
        message: impl Into<String>,
        severity: Severity,
        force: bool,
    ) -> QueueResult<()> {
        let now = clock.now();
        let event = ProgressEvent::new(job_id, stage, percentage, message, severity, now);

        self.publish_in_process(&event);

        if force || self.coalesce.should_persist(job_id, stage) {
            self.progress_repo.append_progress(&event).await?;
            let current_stage = if stage == Stage::Completed { None } else { Some(stage) };
            self.job_repo.update_job_status(job_id, JobStatus::Processing, current_stage, Some(percentage), None, None, now).await?;
        } else {
            debug!(job_id = %job_id, ?stage, "progress event coalesced, not persisted");
        }

        Ok(())
    }

    fn publish_in_process(&self, event: &ProgressEvent) {
        let channels = self.channels.lock().unwrap();
        if let Some(sender) = channels.get(&event.job_id) {
            let _ = sender.send(event.clone());
        }
    }

}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_event_within_window_is_coalesced() {
        let tracker = CoalesceTracker::default();
        let job_id = JobId::new();
        assert!(tracker.should_persist(job_id, Stage::Planning));
        assert!(!tracker.should_persist(job_id, Stage::Planning));
    }

    #[test]
    fn distinct_stages_do_not_share_a_coalescing_window() {
        let tracker = CoalesceTracker::default();
        let job_id = JobId::new();
        assert!(tracker.should_persist(job_id, Stage::Planning));
        assert!(tracker.should_persist(job_id, Stage::ScenarioCreation));
    }

    #[test]
    fn forget_clears_tracked_state_for_the_job() {
        let tracker = CoalesceTracker::default();
        let job_id = JobId::new();
        assert!(tracker.should_persist(job_id, Stage::Planning));
        tracker.forget(job_id);
        assert!(tracker.should_persist(job_id, Stage::Planning));
    }
}
