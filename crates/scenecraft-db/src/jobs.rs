//! Job repository: the `jobs` table is the system of record for
//! `Job.status`/`progress`/`stages_completed`.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use scenecraft_models::{Configuration, ErrorRecord, Job, JobId, JobStatus, Priority, Stage, UserId};
use sqlx::PgPool;
use sqlx::Row;

use crate::error::{DbError, DbResult};

#[derive(Clone)]
pub struct JobRepo {
    pool: PgPool,
}

impl JobRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn insert_job(&self, job: &Job) -> DbResult<()> {
        sqlx::query(
            r#"
            INSERT INTO jobs
                (job_id, user_id, status, priority, configuration, progress, current_stage,
                 stages_completed, created_at, updated_at, started_at, completed_at, error,
                 attempts, batch_id)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
            "#,
        )
        .bind(job.id.0)
        .bind(job.user_id.as_str())
        .bind(status_to_str(job.status))
        .bind(job.priority.as_i32())
        .bind(serde_json::to_value(&job.configuration)?)
        .bind(job.progress)
        .bind(job.current_stage.map(|s| s.as_str()))
        .bind(serde_json::to_value(&job.stages_completed)?)
        .bind(job.created_at)
        .bind(job.updated_at)
        .bind(job.started_at)
        .bind(job.completed_at)
        .bind(job.error.as_ref().map(serde_json::to_value).transpose()?)
        .bind(serde_json::to_value(&job.attempts)?)
        .bind(&job.batch_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn get_job(&self, job_id: JobId) -> DbResult<Option<Job>> {
        let row = sqlx::query(
            r#"SELECT job_id, user_id, status, priority, configuration, progress, current_stage,
                      stages_completed, created_at, updated_at, started_at, completed_at, error,
                      attempts, batch_id
               FROM jobs WHERE job_id = $1"#,
        )
        .bind(job_id.0)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_job).transpose()
    }

    pub async fn list_jobs_by_user(&self, user_id: &UserId, limit: i64) -> DbResult<Vec<Job>> {
        let rows = sqlx::query(
            r#"SELECT job_id, user_id, status, priority, configuration, progress, current_stage,
                      stages_completed, created_at, updated_at, started_at, completed_at, error,
                      attempts, batch_id
               FROM jobs WHERE user_id = $1 ORDER BY created_at DESC LIMIT $2"#,
        )
        .bind(user_id.as_str())
        .bind(limit)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_job).collect()
    }

    /// Conditional update: applies only if the new progress (when given)
    /// is not less than the stored value, preserving the monotonicity
    /// invariant even under a racing update from a stale worker.
    #[allow(clippy::too_many_arguments)]
    pub async fn update_job_status(
        &self,
        job_id: JobId,
        status: JobStatus,
        current_stage: Option<Stage>,
        progress: Option<f64>,
        stages_completed: Option<&[Stage]>,
        error: Option<&ErrorRecord>,
        now: DateTime<Utc>,
    ) -> DbResult<bool> {
        let stages_json = stages_completed.map(serde_json::to_value).transpose()?;
        let error_json = error.map(serde_json::to_value).transpose()?;
        let is_terminal = status.is_terminal();
        let is_processing = matches!(status, JobStatus::Processing);

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = $1,
                current_stage = COALESCE($2, current_stage),
                progress = GREATEST(progress, COALESCE($3, progress)),
                stages_completed = COALESCE($4, stages_completed),
                error = COALESCE($5, error),
                updated_at = $6,
                started_at = CASE WHEN $7 AND started_at IS NULL THEN $6 ELSE started_at END,
                completed_at = CASE WHEN $8 THEN $6 ELSE completed_at END
            WHERE job_id = $9
              AND ($3::double precision IS NULL OR $3::double precision >= progress)
            "#,
        )
        .bind(status_to_str(status))
        .bind(current_stage.map(|s| s.as_str()))
        .bind(progress)
        .bind(stages_json)
        .bind(error_json)
        .bind(now)
        .bind(is_processing)
        .bind(is_terminal)
        .bind(job_id.0)
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }
}

fn status_to_str(status: JobStatus) -> &'static str {
    match status {
        JobStatus::Queued => "queued",
        JobStatus::Processing => "processing",
        JobStatus::Completed => "completed",
        JobStatus::Failed => "failed",
        JobStatus::Cancelled => "cancelled",
    }
}

fn str_to_status(s: &str) -> DbResult<JobStatus> {
    Ok(match s {
        "queued" => JobStatus::Queued,
        "processing" => JobStatus::Processing,
        "completed" => JobStatus::Completed,
        "failed" => JobStatus::Failed,
        "cancelled" => JobStatus::Cancelled,
        other => return Err(DbError::Conflict(format!("unknown job status {other}"))),
    })
}

fn str_to_priority(p: i32) -> Priority {
    match p {
        3 => Priority::Urgent,
        2 => Priority::High,
        1 => Priority::Normal,
        _ => Priority::Low,
    }
}

fn row_to_job(row: sqlx::postgres::PgRow) -> DbResult<Job> {
    let configuration: Configuration = serde_json::from_value(row.get("configuration"))?;
    let stages_completed: Vec<Stage> = serde_json::from_value(row.get("stages_completed"))?;
    let attempts: HashMap<String, u32> = serde_json::from_value(row.get("attempts"))?;
    let error: Option<ErrorRecord> = row
        .get::<Option<serde_json::Value>, _>("error")
        .map(serde_json::from_value)
        .transpose()?;
    let current_stage: Option<String> = row.get("current_stage");

    Ok(Job {
        id: JobId(row.get("job_id")),
        user_id: UserId::from(row.get::<String, _>("user_id")),
        priority: str_to_priority(row.get("priority")),
        status: str_to_status(row.get("status"))?,
        configuration,
        progress: row.get("progress"),
        current_stage: current_stage.and_then(|s| stage_from_str(&s)),
        stages_completed,
        created_at: row.get("created_at"),
        updated_at: row.get("updated_at"),
        started_at: row.get("started_at"),
        completed_at: row.get("completed_at"),
        error,
        attempts,
        batch_id: row.get("batch_id"),
        idempotency_key: None,
    })
}

fn stage_from_str(s: &str) -> Option<Stage> {
    Stage::ORDER.into_iter().find(|stage| stage.as_str() == s)
}
