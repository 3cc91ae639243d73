//! `ProgressEvent`: an append-only per-stage progress/log record.

use chrono::{DateTime, Utc};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::ids::JobId;
use crate::stage::Stage;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Error,
}

#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ProgressEvent {
    pub job_id: JobId,
    pub ts: DateTime<Utc>,
    pub stage: Stage,
    pub percentage: f64,
    pub message: String,
    pub severity: Severity,
}

impl ProgressEvent {
    pub fn new(job_id: JobId, stage: Stage, percentage: f64, message: impl Into<String>, severity: Severity, now: DateTime<Utc>) -> Self {
        Self {
            job_id,
            ts: now,
            stage,
            percentage,
            message: message.into(),
            severity,
        }
    }
}
