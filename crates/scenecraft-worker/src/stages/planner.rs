//! Planner stage (spec §4.9): breaks a topic into an ordered scene outline.

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_llm::ModelFamily;
use scenecraft_models::{Job, Stage};
use scenecraft_resilience::{CircuitBreaker, CircuitBreakerConfig};
use tokio::sync::watch;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

use super::types::{PipelineArtifacts, SceneOutline};
use super::{from_circuit_error, StageExecutor};

pub struct PlannerStage;

#[async_trait]
impl StageExecutor for PlannerStage {
    fn stage(&self) -> Stage {
        Stage::Planning
    }

    fn timeout(&self, ctx: &WorkerContext, _artifacts: &PipelineArtifacts) -> Duration {
        ctx.config.stage_timeout_planning
    }

    async fn run(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        artifacts: &mut PipelineArtifacts,
        _cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.id, self.stage().as_str());
        logger.log_start(&job.configuration.topic);

        let breaker = ctx.circuit_breakers.get_or_create(
            "llm_planner",
            CircuitBreakerConfig { call_timeout: Duration::from_secs(120), ..Default::default() },
        );

        let outline = match self.generate_outline(job, ctx, &breaker, None).await {
            Ok(outline) => outline,
            Err(WorkerError::Validation { message, .. }) => {
                logger.log_warning(&format!("outline failed validation ({message}); attempting one repair round"));
                self.generate_outline(
                    job,
                    ctx,
                    &breaker,
                    Some("The previous response was not valid JSON matching the required scene outline schema. Return only a JSON array, nothing else."),
                )
                .await?
            }
            Err(e) => return Err(e),
        };

        let job_dir = ctx.config.work_dir.join(job.id.to_string());
        tokio::fs::create_dir_all(&job_dir).await?;
        let outline_json = serde_json::to_vec_pretty(&outline)
            .map_err(|e| WorkerError::validation(self.stage(), format!("outline did not serialize: {e}")))?;
        tokio::fs::write(job_dir.join("outline.json"), outline_json).await?;

        logger.log_completion(&format!("{} scenes", outline.len()));
        artifacts.outline = outline;
        Ok(())
    }
}

impl PlannerStage {
    async fn generate_outline(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        breaker: &CircuitBreaker,
        repair_hint: Option<&str>,
    ) -> WorkerResult<SceneOutline> {
        let prompt = build_prompt(job, repair_hint);

        let _permit = ctx.llm_semaphore.acquire().await.map_err(|_| WorkerError::Cancelled)?;
        let model = job.configuration.model_planner.as_deref();
        let raw = match model {
            Some(model) => breaker.call(|| async { ctx.llm.generate_json(model, &prompt).await }).await,
            None => breaker.call(|| async { ctx.llm.generate_with_fallback(ModelFamily::Planner, &prompt).await }).await,
        }
        .map_err(from_circuit_error)?;

        let outline: SceneOutline = serde_json::from_str(&raw)
            .map_err(|e| WorkerError::validation(self.stage(), format!("planner response did not parse: {e}")))?;

        let max_scenes = ctx.config.max_scenes as usize;
        if outline.is_empty() || outline.len() > max_scenes {
            return Err(WorkerError::validation(self.stage(), format!("expected 1..={max_scenes} scenes, got {}", outline.len())));
        }

        Ok(outline)
    }
}

fn build_prompt(job: &Job, repair_hint: Option<&str>) -> String {
    let mut prompt = format!(
        "Break the following topic into an ordered list of short video scenes for an \
         educational animation. Respond with a JSON array of objects shaped exactly \
         as {{\"index\": number, \"title\": string, \"beats\": [string]}}, nothing else.\n\n\
         Topic: {}\nAdditional context: {}",
        job.configuration.topic, job.configuration.context,
    );
    if let Some(hint) = repair_hint {
        prompt.push_str("\n\n");
        prompt.push_str(hint);
    }
    prompt
}
