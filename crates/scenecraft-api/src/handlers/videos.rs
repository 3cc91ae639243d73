//! Job submission, status, cancellation, and artifact retrieval handlers.

use axum::extract::{Path, State};
use axum::Json;
use chrono::{DateTime, Utc};
use scenecraft_models::{Configuration, FileKind, Job, JobId, JobStatus, Priority, Stage};
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::auth::AuthUser;
use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct GenerateRequest {
    pub configuration: Configuration,
    #[serde(default)]
    pub priority: Option<PriorityWire>,
    #[serde(default)]
    pub idempotency_key: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PriorityWire {
    Low,
    Normal,
    High,
    Urgent,
}

impl From<PriorityWire> for Priority {
    fn from(p: PriorityWire) -> Self {
        match p {
            PriorityWire::Low => Priority::Low,
            PriorityWire::Normal => Priority::Normal,
            PriorityWire::High => Priority::High,
            PriorityWire::Urgent => Priority::Urgent,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProgressWire {
    pub percentage: f64,
    pub current_stage: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stages_completed: Option<Vec<&'static str>>,
}

#[derive(Debug, Serialize)]
pub struct GenerateResponse {
    pub job_id: String,
    pub status: &'static str,
    pub progress: ProgressWire,
    pub created_at: DateTime<Utc>,
}

/// `POST /videos/generate`
pub async fn generate(
    State(state): State<AppState>,
    user: AuthUser,
    Json(req): Json<GenerateRequest>,
) -> ApiResult<(axum::http::StatusCode, Json<GenerateResponse>)> {
    req.configuration.validate().map_err(|e| ApiError::validation(e.to_string()))?;

    let priority = req.priority.map(Priority::from).unwrap_or(Priority::Normal);
    let now = Utc::now();
    let candidate = Job::new(user.user_id().clone(), req.configuration, priority, now);

    let job = if let Some(key) = &req.idempotency_key {
        match state.submission_repo.record_if_absent(key, candidate.id, user.user_id(), now).await? {
            Some(existing_job_id) => state
                .job_repo
                .get_job(existing_job_id)
                .await?
                .ok_or_else(|| ApiError::internal("idempotent submission references a missing job"))?,
            None => {
                state.job_repo.insert_job(&candidate).await?;
                state.queue.enqueue(candidate.id, candidate.priority, now).await?;
                candidate
            }
        }
    } else {
        state.job_repo.insert_job(&candidate).await?;
        state.queue.enqueue(candidate.id, candidate.priority, now).await?;
        candidate
    };

    crate::metrics::record_job_enqueued();
    info!(job_id = %job.id, user_id = %user.user_id(), "job submitted");

    Ok((
        axum::http::StatusCode::CREATED,
        Json(GenerateResponse {
            job_id: job.id.to_string(),
            status: status_str(job.status),
            progress: ProgressWire { percentage: job.progress, current_stage: job.current_stage.map(Stage::as_str), stages_completed: None },
            created_at: job.created_at,
        }),
    ))
}

#[derive(Debug, Serialize)]
pub struct ErrorWire {
    pub kind: &'static str,
    pub message: String,
    pub stage: Option<&'static str>,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub job_id: String,
    pub status: &'static str,
    pub progress: ProgressWire,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorWire>,
}

/// `GET /videos/jobs/{job_id}/status`
pub async fn status(State(state): State<AppState>, user: AuthUser, Path(job_id): Path<String>) -> ApiResult<Json<StatusResponse>> {
    let job = load_owned_job(&state, &user, &job_id).await?;

    Ok(Json(StatusResponse {
        job_id: job.id.to_string(),
        status: status_str(job.status),
        progress: ProgressWire {
            percentage: job.progress,
            current_stage: job.current_stage.map(Stage::as_str),
            stages_completed: Some(job.stages_completed.iter().map(|s| s.as_str()).collect()),
        },
        created_at: job.created_at,
        updated_at: job.updated_at,
        completed_at: job.completed_at,
        error: job.error.map(|e| ErrorWire { kind: e.kind.as_str(), message: e.message, stage: e.stage.map(Stage::as_str) }),
    }))
}

#[derive(Debug, Serialize)]
pub struct ArtifactMetadata {
    pub duration: f64,
    pub quality: &'static str,
    pub format: &'static str,
    pub file_size: u64,
}

#[derive(Debug, Serialize)]
pub struct VideoUrlResponse {
    pub video_url: String,
    pub download_url: String,
    pub thumbnail_url: Option<String>,
    pub metadata: ArtifactMetadata,
}

/// `GET /videos/jobs/{job_id}/video-url`
pub async fn video_url(State(state): State<AppState>, user: AuthUser, Path(job_id): Path<String>) -> ApiResult<Json<VideoUrlResponse>> {
    let job = load_owned_job(&state, &user, &job_id).await?;

    if job.status != JobStatus::Completed {
        return Err(ApiError::conflict("job has not completed; artifacts are not yet available"));
    }

    let files = state.file_repo.list_files(job.id).await?;
    let combined = files
        .iter()
        .find(|f| f.kind == FileKind::CombinedVideo)
        .ok_or_else(|| ApiError::internal("job completed without a combined video artifact"))?;
    let thumbnail = files.iter().find(|f| f.kind == FileKind::Thumbnail);

    let ttl = state.config.presign_ttl;
    let video_url = state.storage.presign(combined, ttl).await?;
    let thumbnail_url = match thumbnail {
        Some(t) => Some(state.storage.presign(t, ttl).await?),
        None => None,
    };

    Ok(Json(VideoUrlResponse {
        video_url: video_url.clone(),
        download_url: video_url,
        thumbnail_url,
        metadata: ArtifactMetadata {
            // The renderer/combiner stages compute a duration but `FileMetadata`
            // has no column to carry it; see DESIGN.md for the tracked gap.
            duration: 0.0,
            quality: quality_str(job.configuration.quality),
            format: "mp4",
            file_size: combined.size_bytes,
        },
    }))
}

#[derive(Debug, Serialize)]
pub struct CancelResponse {
    pub job_id: String,
    pub status: &'static str,
}

/// `POST /videos/jobs/{job_id}/cancel`
pub async fn cancel(State(state): State<AppState>, user: AuthUser, Path(job_id): Path<String>) -> ApiResult<Json<CancelResponse>> {
    let mut job = load_owned_job(&state, &user, &job_id).await?;

    if !job.is_cancellable() {
        return Err(ApiError::conflict("job is already in a terminal state"));
    }

    let was_queued = job.status == JobStatus::Queued;
    let now = Utc::now();
    job.transition_to_cancelled(now);

    state
        .job_repo
        .update_job_status(job.id, job.status, job.current_stage, Some(job.progress), None, None, now)
        .await?;

    if was_queued {
        // Not yet leased by a worker: drop the queue entry outright so it
        // is never dispatched. A job already being processed is instead
        // noticed by the worker's lease-renewal status poll.
        state.queue.ack(job.id).await?;
    }

    crate::metrics::record_job_cancelled();
    info!(job_id = %job.id, user_id = %user.user_id(), "job cancelled");

    Ok(Json(CancelResponse { job_id: job.id.to_string(), status: status_str(job.status) }))
}

async fn load_owned_job(state: &AppState, user: &AuthUser, job_id: &str) -> ApiResult<Job> {
    let job_id = JobId::parse(job_id).map_err(|_| ApiError::validation("invalid job id"))?;
    let job = state.job_repo.get_job(job_id).await?.ok_or_else(|| ApiError::not_found("job not found"))?;
    if !user.may_act_on(&job.user_id) {
        return Err(ApiError::permission("not authorized to access this job"));
    }
    Ok(job)
}

fn status_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn quality_str(quality: scenecraft_models::Quality) -> &'static str {
    use scenecraft_models::Quality;
    match quality {
        Quality::Low => "low",
        Quality::Medium => "medium",
        Quality::High => "high",
        Quality::Ultra => "ultra",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn status_str_covers_every_variant() {
        for s in [JobStatus::Queued, JobStatus::Processing, JobStatus::Completed, JobStatus::Failed, JobStatus::Cancelled] {
            assert!(!status_str(s).is_empty());
        }
    }
}
