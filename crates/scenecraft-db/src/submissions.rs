//! Idempotency-key dedup, surviving process restarts (spec §4.12, §8).

use chrono::{DateTime, Utc};
use scenecraft_models::{JobId, UserId};
use sqlx::PgPool;
use sqlx::Row;

use crate::error::DbResult;

#[derive(Clone)]
pub struct SubmissionRepo {
    pool: PgPool,
}

impl SubmissionRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Returns the existing `job_id` if `idempotency_key` was already used
    /// within the dedup window; otherwise records this submission and
    /// returns `None`. The caller must insert the new job in the same
    /// transaction as the submitter's Job insert to avoid a dangling
    /// reference; here we just persist the mapping once the job exists.
    pub async fn record_if_absent(&self, idempotency_key: &str, job_id: JobId, user_id: &UserId, now: DateTime<Utc>) -> DbResult<Option<JobId>> {
        let window_start = now - chrono::Duration::hours(24);
        let existing = sqlx::query("SELECT job_id FROM submissions WHERE idempotency_key = $1 AND created_at >= $2")
            .bind(idempotency_key)
            .bind(window_start)
            .fetch_optional(&self.pool)
            .await?;

        if let Some(row) = existing {
            return Ok(Some(JobId(row.get("job_id"))));
        }

        sqlx::query(
            "INSERT INTO submissions (idempotency_key, job_id, user_id, created_at) VALUES ($1, $2, $3, $4) \
             ON CONFLICT (idempotency_key) DO UPDATE SET job_id = EXCLUDED.job_id, user_id = EXCLUDED.user_id, created_at = EXCLUDED.created_at",
        )
            .bind(idempotency_key)
            .bind(job_id.0)
            .bind(user_id.as_str())
            .bind(now)
            .execute(&self.pool)
            .await?;

        Ok(None)
    }
}
