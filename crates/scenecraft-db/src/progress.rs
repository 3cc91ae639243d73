//! Progress event repository: append-only, partitioned by job.

use scenecraft_models::{JobId, ProgressEvent, Severity, Stage};
use sqlx::PgPool;
use sqlx::Row;

use crate::error::DbResult;

#[derive(Clone)]
pub struct ProgressRepo {
    pool: PgPool,
}

impl ProgressRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn append_progress(&self, event: &ProgressEvent) -> DbResult<()> {
        sqlx::query(
            "INSERT INTO progress_events (job_id, ts, stage, percentage, message, severity) VALUES ($1, $2, $3, $4, $5, $6)",
        )
        .bind(event.job_id.0)
        .bind(event.ts)
        .bind(event.stage.as_str())
        .bind(event.percentage)
        .bind(&event.message)
        .bind(severity_to_str(event.severity))
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    pub async fn list_for_job(&self, job_id: JobId) -> DbResult<Vec<ProgressEvent>> {
        let rows = sqlx::query(
            "SELECT job_id, ts, stage, percentage, message, severity FROM progress_events WHERE job_id = $1 ORDER BY ts ASC",
        )
        .bind(job_id.0)
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .filter_map(|r| {
                let stage_str: String = r.get("stage");
                let severity_str: String = r.get("severity");
                Some(ProgressEvent {
                    job_id: JobId(r.get("job_id")),
                    ts: r.get("ts"),
                    stage: stage_from_str(&stage_str)?,
                    percentage: r.get("percentage"),
                    message: r.get("message"),
                    severity: severity_from_str(&severity_str),
                })
            })
            .collect())
    }
}

fn severity_to_str(severity: Severity) -> &'static str {
    match severity {
        Severity::Info => "info",
        Severity::Warning => "warning",
        Severity::Error => "error",
    }
}

fn severity_from_str(s: &str) -> Severity {
    match s {
        "warning" => Severity::Warning,
        "error" => Severity::Error,
        _ => Severity::Info,
    }
}

fn stage_from_str(s: &str) -> Option<Stage> {
    Stage::ORDER.into_iter().find(|stage| stage.as_str() == s)
}
