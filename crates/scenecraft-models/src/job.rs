//! The `Job` aggregate: a text-to-video generation request moving through
//! the pipeline.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::configuration::Configuration;
use crate::error::ErrorRecord;
use crate::ids::{JobId, UserId};
use crate::stage::Stage;

/// Dispatch priority class. Ordering is `Urgent > High > Normal > Low`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low = 0,
    Normal = 1,
    High = 2,
    Urgent = 3,
}

impl Priority {
    pub fn as_i32(self) -> i32 {
        self as i32
    }
}

/// Top-level job status. `stages_completed`/`current_stage` describe the
/// substate while `status == Processing`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum JobStatus {
    Queued,
    Processing,
    Completed,
    Failed,
    Cancelled,
}

impl JobStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// A job record as persisted by the MetadataStore.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct Job {
    pub id: JobId,
    pub user_id: UserId,
    pub priority: Priority,
    pub status: JobStatus,
    pub configuration: Configuration,

    /// Percentage 0.0-100.0, monotonically non-decreasing until terminal.
    pub progress: f64,

    pub current_stage: Option<Stage>,

    /// Ordered, always a prefix of `Stage::ORDER`.
    pub stages_completed: Vec<Stage>,

    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,

    pub error: Option<ErrorRecord>,

    /// Per-stage retry attempt counter.
    #[serde(default)]
    pub attempts: HashMap<String, u32>,

    pub batch_id: Option<String>,

    /// Present only when the client supplied one at submission.
    pub idempotency_key: Option<String>,
}

impl Job {
    pub fn new(user_id: UserId, configuration: Configuration, priority: Priority, now: DateTime<Utc>) -> Self {
        Self {
            id: JobId::new(),
            user_id,
            priority,
            status: JobStatus::Queued,
            configuration,
            progress: 0.0,
            current_stage: None,
            stages_completed: Vec::new(),
            created_at: now,
            updated_at: now,
            started_at: None,
            completed_at: None,
            error: None,
            attempts: HashMap::new(),
            batch_id: None,
            idempotency_key: None,
        }
    }

    /// Apply a strictly-greater progress update; no-op otherwise (spec
    /// §4.8 monotonicity).
    pub fn apply_progress(&mut self, percentage: f64, stage: Stage, now: DateTime<Utc>) {
        if percentage > self.progress {
            self.progress = percentage;
        }
        if !self.status.is_terminal() {
            self.current_stage = Some(stage);
        }
        self.updated_at = now;
    }

    pub fn mark_stage_completed(&mut self, stage: Stage) {
        if self.stages_completed.last().copied() != Some(stage) {
            self.stages_completed.push(stage);
        }
    }

    pub fn transition_to_processing(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Processing;
        self.started_at.get_or_insert(now);
        self.updated_at = now;
    }

    pub fn transition_to_completed(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Completed;
        self.progress = 100.0;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn transition_to_failed(&mut self, error: ErrorRecord, now: DateTime<Utc>) {
        self.status = JobStatus::Failed;
        self.error = Some(error);
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn transition_to_cancelled(&mut self, now: DateTime<Utc>) {
        self.status = JobStatus::Cancelled;
        self.completed_at = Some(now);
        self.updated_at = now;
    }

    pub fn is_cancellable(&self) -> bool {
        matches!(self.status, JobStatus::Queued | JobStatus::Processing)
    }

    pub fn attempts_for(&self, stage: Stage) -> u32 {
        *self.attempts.get(stage.as_str()).unwrap_or(&0)
    }

    pub fn increment_attempts(&mut self, stage: Stage) {
        *self.attempts.entry(stage.as_str().to_string()).or_insert(0) += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::configuration::{OutputFormat, Quality};

    fn config() -> Configuration {
        Configuration {
            topic: "Quadratic formula".into(),
            context: String::new(),
            quality: Quality::Medium,
            use_rag: false,
            use_context_learning: false,
            enable_subtitles: false,
            enable_thumbnails: true,
            output_format: OutputFormat::Mp4,
            model_planner: None,
            model_scene: None,
            model_helper: None,
            max_scene_concurrency: 3,
        }
    }

    #[test]
    fn new_job_starts_queued_at_zero_progress() {
        let job = Job::new(UserId::from("u1"), config(), Priority::Normal, Utc::now());
        assert_eq!(job.status, JobStatus::Queued);
        assert_eq!(job.progress, 0.0);
        assert!(job.current_stage.is_none());
    }

    #[test]
    fn progress_never_decreases() {
        let mut job = Job::new(UserId::from("u1"), config(), Priority::Normal, Utc::now());
        job.apply_progress(30.0, Stage::ScenarioCreation, Utc::now());
        job.apply_progress(15.0, Stage::Planning, Utc::now());
        assert_eq!(job.progress, 30.0);
    }

    #[test]
    fn stages_completed_stays_a_prefix() {
        let mut job = Job::new(UserId::from("u1"), config(), Priority::Normal, Utc::now());
        job.mark_stage_completed(Stage::Initializing);
        job.mark_stage_completed(Stage::Planning);
        assert!(Stage::is_valid_prefix(&job.stages_completed));
    }

    #[test]
    fn priority_ordering_is_urgent_high_normal_low() {
        let mut order = vec![Priority::Normal, Priority::Low, Priority::Urgent, Priority::High];
        order.sort_by(|a, b| b.cmp(a));
        assert_eq!(order, vec![Priority::Urgent, Priority::High, Priority::Normal, Priority::Low]);
    }

    #[test]
    fn only_queued_or_processing_jobs_are_cancellable() {
        let mut job = Job::new(UserId::from("u1"), config(), Priority::Normal, Utc::now());
        assert!(job.is_cancellable());
        job.transition_to_completed(Utc::now());
        assert!(!job.is_cancellable());
    }
}
