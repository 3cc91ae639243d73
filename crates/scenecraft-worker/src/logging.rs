//! Structured job logging utilities.
//!
//! Provides consistent, structured logging for job processing with
//! tracing spans and contextual information.

use tracing::{error, info, warn, Span};

use scenecraft_models::JobId;

/// Job logger for structured logging with consistent formatting.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: String,
    stage: String,
}

impl JobLogger {
    /// Create a new job logger for a specific job and stage.
    pub fn new(job_id: &JobId, stage: &str) -> Self {
        Self { job_id: job_id.to_string(), stage: stage.to_string() }
    }

    pub fn log_start(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "stage started: {}", message);
    }

    pub fn log_progress(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "stage progress: {}", message);
    }

    pub fn log_warning(&self, message: &str) {
        warn!(job_id = %self.job_id, stage = %self.stage, "stage warning: {}", message);
    }

    pub fn log_error(&self, message: &str) {
        error!(job_id = %self.job_id, stage = %self.stage, "stage error: {}", message);
    }

    pub fn log_completion(&self, message: &str) {
        info!(job_id = %self.job_id, stage = %self.stage, "stage completed: {}", message);
    }

    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    pub fn stage(&self) -> &str {
        &self.stage
    }

    /// Creates a tracing span for this job/stage, for attaching to the
    /// whole duration of a stage's execution.
    pub fn create_span(&self) -> Span {
        tracing::info_span!("stage", job_id = %self.job_id, stage = %self.stage)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn job_logger_exposes_its_identifiers() {
        let job_id = JobId::new();
        let logger = JobLogger::new(&job_id, "planning");

        assert_eq!(logger.job_id(), job_id.to_string());
        assert_eq!(logger.stage(), "planning");
    }
}
