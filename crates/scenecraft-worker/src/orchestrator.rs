//! `PipelineOrchestrator`: the per-job state machine (spec §4.10).
//!
//! Walks the data-driven stage list in order, persisting a checkpoint at
//! each stage boundary — never mid-stage. A retryable failure nacks the
//! job back onto the queue with a computed backoff; a non-retryable one
//! fails the job immediately. Cancellation is cooperative: the active
//! stage gets `grace_period` to unwind before its subprocess is killed.

use scenecraft_models::{Job, JobId, Severity, Stage};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::stages::types::{CombinedVideo, GeneratedProgram, ImplementationPlan, PipelineArtifacts, RenderedScene, SceneDescriptor};
use crate::stages::{pipeline, StageExecutor};
use crate::subprocess;

/// Outcome of running a job to the point where the orchestrator hands
/// control back to the `WorkerPool`'s dispatch loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    Cancelled,
    /// Failed permanently (non-retryable, or retries exhausted).
    Failed,
    /// Nacked back onto the queue; another worker (or this one) will
    /// pick it up after `retry_after`.
    Requeued,
}

pub struct PipelineOrchestrator {
    ctx: std::sync::Arc<WorkerContext>,
    stages: Vec<Box<dyn StageExecutor>>,
}

impl PipelineOrchestrator {
    pub fn new(ctx: std::sync::Arc<WorkerContext>) -> Self {
        Self { ctx, stages: pipeline() }
    }

    /// Runs `job` from its current checkpoint to completion, a retryable
    /// nack, cancellation, or permanent failure.
    pub async fn run(&self, job: &mut Job, mut cancel: watch::Receiver<bool>) -> WorkerResult<JobOutcome> {
        let ctx = &self.ctx;
        let logger = JobLogger::new(&job.id, "orchestrator");
        let now = ctx.clock.now();

        if job.status != scenecraft_models::JobStatus::Processing {
            job.transition_to_processing(now);
        }
        if job.stages_completed.is_empty() {
            job.mark_stage_completed(Stage::Initializing);
            ctx.progress.emit(ctx.clock.as_ref(), job.id, Stage::Initializing, Stage::Initializing.entry_percentage(), "job started", Severity::Info, true).await?;
        }

        let mut artifacts = load_artifacts_from_disk(job.id, ctx).await;

        for executor in &self.stages {
            let stage = executor.stage();

            if job.stages_completed.contains(&stage) {
                continue;
            }

            if *cancel.borrow() {
                return Ok(self.cancel_job(job).await?);
            }

            ctx.progress.emit(ctx.clock.as_ref(), job.id, stage, stage.entry_percentage(), format!("{} started", stage.as_str()), Severity::Info, true).await?;

            let timeout = executor.timeout(ctx, &artifacts);
            let outcome = tokio::time::timeout(timeout, executor.run(job, ctx, &mut artifacts, &mut cancel)).await;

            let result = match outcome {
                Ok(result) => result,
                Err(_) => Err(WorkerError::StageTimeout { stage }),
            };

            match result {
                Ok(()) => {
                    job.mark_stage_completed(stage);
                    let next_stage = stage.next().unwrap_or(Stage::Completed);
                    let next_percentage = next_stage.entry_percentage();
                    job.apply_progress(next_percentage, next_stage, ctx.clock.now());
                    ctx.job_repo
                        .update_job_status(job.id, job.status, job.current_stage, Some(job.progress), Some(&job.stages_completed), None, ctx.clock.now())
                        .await?;
                    ctx.progress.emit(ctx.clock.as_ref(), job.id, stage, next_percentage, format!("{} completed", stage.as_str()), Severity::Info, true).await?;
                }
                Err(WorkerError::Cancelled) => {
                    return Ok(self.cancel_job(job).await?);
                }
                Err(e) => {
                    logger.log_error(&format!("{} failed: {e}", stage.as_str()));
                    return Ok(self.handle_failure(job, stage, e).await?);
                }
            }
        }

        job.transition_to_completed(ctx.clock.now());
        ctx.job_repo.update_job_status(job.id, job.status, None, Some(100.0), Some(&job.stages_completed), None, ctx.clock.now()).await?;
        ctx.progress.emit(ctx.clock.as_ref(), job.id, Stage::Completed, 100.0, "job completed", Severity::Info, true).await?;
        ctx.queue.ack(job.id).await?;
        ctx.progress.forget(job.id);
        info!(job_id = %job.id, "job completed");
        Ok(JobOutcome::Completed)
    }

    async fn handle_failure(&self, job: &mut Job, stage: Stage, error: WorkerError) -> WorkerResult<JobOutcome> {
        let ctx = &self.ctx;
        let now = ctx.clock.now();
        let attempts = job.attempts_for(stage);
        let delay = ctx.retry_policy.next_delay(error.kind(), error.retryable(), attempts, error.server_hint());

        let record = error.to_error_record(stage, job.id.to_string());

        match delay {
            Some(retry_after) => {
                job.increment_attempts(stage);
                ctx.job_repo.update_job_status(job.id, job.status, Some(stage), None, None, Some(&record), now).await?;
                ctx.queue.nack(job.id, retry_after, now).await?;
                warn!(job_id = %job.id, stage = stage.as_str(), ?retry_after, "job nacked for retry");
                Ok(JobOutcome::Requeued)
            }
            None => {
                job.transition_to_failed(record.clone(), now);
                ctx.job_repo.update_job_status(job.id, job.status, Some(stage), None, None, Some(&record), now).await?;
                ctx.progress.emit(ctx.clock.as_ref(), job.id, stage, job.progress, format!("job failed: {}", record.message), Severity::Error, true).await?;
                ctx.queue.ack(job.id).await?;
                ctx.progress.forget(job.id);
                Ok(JobOutcome::Failed)
            }
        }
    }

    async fn cancel_job(&self, job: &mut Job) -> WorkerResult<JobOutcome> {
        let ctx = &self.ctx;
        let now = ctx.clock.now();
        job.transition_to_cancelled(now);
        ctx.job_repo.update_job_status(job.id, job.status, job.current_stage, None, None, None, now).await?;
        ctx.progress.emit(ctx.clock.as_ref(), job.id, job.current_stage.unwrap_or(Stage::Initializing), job.progress, "job cancelled", Severity::Warning, true).await?;
        ctx.queue.ack(job.id).await?;
        ctx.progress.forget(job.id);
        warn!(job_id = %job.id, "job cancelled");
        Ok(JobOutcome::Cancelled)
    }
}

/// Reconstructs in-memory artifacts a resumed job needs from the files
/// its earlier stages already wrote to the local working directory. A
/// fresh job has no `job_dir` yet, so every lookup here is a harmless
/// miss.
async fn load_artifacts_from_disk(job_id: JobId, ctx: &WorkerContext) -> PipelineArtifacts {
    let job_dir = ctx.config.work_dir.join(job_id.to_string());
    let mut artifacts = PipelineArtifacts::default();

    if let Ok(bytes) = tokio::fs::read(job_dir.join("outline.json")).await {
        if let Ok(outline) = serde_json::from_slice::<Vec<SceneDescriptor>>(&bytes) {
            artifacts.outline = outline;
        }
    }

    if let Ok(bytes) = tokio::fs::read(job_dir.join("scenarios.json")).await {
        if let Ok(scenarios) = serde_json::from_slice::<Vec<ImplementationPlan>>(&bytes) {
            artifacts.scenarios = scenarios;
        }
    }

    artifacts.programs = scan_indexed_files(&job_dir, "scene_", ".py")
        .await
        .into_iter()
        .map(|(scene_index, path)| GeneratedProgram { scene_index, program_path: path })
        .collect();

    let mut rendered = Vec::new();
    for (scene_index, path) in scan_indexed_files(&job_dir, "scene_", ".mp4").await {
        let duration_secs = subprocess::probe_duration_secs(&path).await.unwrap_or(0.0);
        rendered.push(RenderedScene { scene_index, video_path: path, duration_secs });
    }
    artifacts.rendered = rendered;

    let combined_path = job_dir.join("combined.mp4");
    if tokio::fs::metadata(&combined_path).await.is_ok() {
        let duration_secs = subprocess::probe_duration_secs(&combined_path).await.unwrap_or(0.0);
        artifacts.combined = Some(CombinedVideo { video_path: combined_path, duration_secs });
    }

    artifacts
}

/// Scans `dir` for files named `{prefix}{NNN}{suffix}` and returns each
/// as `(scene_index, path)`, ordered by index.
async fn scan_indexed_files(dir: &std::path::Path, prefix: &str, suffix: &str) -> Vec<(u32, std::path::PathBuf)> {
    let mut found = Vec::new();
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return found;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name();
        let name = name.to_string_lossy();
        if let Some(index_part) = name.strip_prefix(prefix).and_then(|s| s.strip_suffix(suffix)) {
            if let Ok(scene_index) = index_part.parse::<u32>() {
                found.push((scene_index, entry.path()));
            }
        }
    }
    found.sort_by_key(|(index, _)| *index);
    found
}
