//! ScenarioBuilder stage (spec §4.9): expands each scene into a shot
//! list, asset list, and narration, in parallel up to
//! `configuration.max_scene_concurrency`.

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_llm::ModelFamily;
use scenecraft_models::{Job, Stage};
use scenecraft_resilience::CircuitBreakerConfig;
use tokio::sync::{watch, Semaphore};

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;

use super::types::{ImplementationPlan, PipelineArtifacts, SceneDescriptor};
use super::{from_circuit_error, StageExecutor};

pub struct ScenarioBuilderStage;

#[async_trait]
impl StageExecutor for ScenarioBuilderStage {
    fn stage(&self) -> Stage {
        Stage::ScenarioCreation
    }

    fn timeout(&self, ctx: &WorkerContext, _artifacts: &PipelineArtifacts) -> Duration {
        ctx.config.stage_timeout_scenario
    }

    async fn run(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        artifacts: &mut PipelineArtifacts,
        _cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.id, self.stage().as_str());
        let concurrency = job.configuration.max_scene_concurrency.max(1) as usize;
        let scene_semaphore = std::sync::Arc::new(Semaphore::new(concurrency));
        let breaker = ctx.circuit_breakers.get_or_create("llm_scene", CircuitBreakerConfig::default());

        let mut tasks = tokio::task::JoinSet::new();
        for scene in artifacts.outline.clone() {
            let scene_semaphore = scene_semaphore.clone();
            let breaker = breaker.clone();
            let llm = ctx.llm.clone();
            let llm_semaphore = ctx.llm_semaphore.clone();
            let model = job.configuration.model_scene.clone();
            let topic = job.configuration.topic.clone();
            let stage = self.stage();

            tasks.spawn(async move {
                let _scene_permit = scene_semaphore.acquire_owned().await.map_err(|_| WorkerError::Cancelled)?;
                let _llm_permit = llm_semaphore.acquire_owned().await.map_err(|_| WorkerError::Cancelled)?;

                let prompt = build_prompt(&topic, &scene);
                let raw = match &model {
                    Some(model) => breaker.call(|| async { llm.generate_json(model, &prompt).await }).await,
                    None => breaker.call(|| async { llm.generate_with_fallback(ModelFamily::Scene, &prompt).await }).await,
                }
                .map_err(from_circuit_error)?;

                parse_plan(stage, scene.index, &raw)
            });
        }

        let mut plans = Vec::with_capacity(artifacts.outline.len());
        while let Some(joined) = tasks.join_next().await {
            let plan = joined.map_err(|e| WorkerError::validation(self.stage(), format!("scenario task did not complete: {e}")))??;
            plans.push(plan);
        }
        plans.sort_by_key(|p| p.scene_index);

        let job_dir = ctx.config.work_dir.join(job.id.to_string());
        tokio::fs::create_dir_all(&job_dir).await?;
        let plans_json = serde_json::to_vec_pretty(&plans)
            .map_err(|e| WorkerError::validation(self.stage(), format!("scenarios did not serialize: {e}")))?;
        tokio::fs::write(job_dir.join("scenarios.json"), plans_json).await?;

        logger.log_completion(&format!("{} implementation plans", plans.len()));
        artifacts.scenarios = plans;
        Ok(())
    }
}

fn build_prompt(topic: &str, scene: &SceneDescriptor) -> String {
    format!(
        "Topic: {topic}\nScene {} — {}\nBeats: {}\n\n\
         Expand this scene into an implementation plan for an animation. Respond with \
         JSON shaped exactly as {{\"shot_list\": [string], \"assets\": [string], \"narration\": string}}, nothing else.",
        scene.index,
        scene.title,
        scene.beats.join("; "),
    )
}

fn parse_plan(stage: Stage, scene_index: u32, raw: &str) -> WorkerResult<ImplementationPlan> {
    #[derive(serde::Deserialize)]
    struct Raw {
        shot_list: Vec<String>,
        assets: Vec<String>,
        narration: String,
    }

    let parsed: Raw = serde_json::from_str(raw)
        .map_err(|e| WorkerError::validation(stage, format!("scenario response for scene {scene_index} did not parse: {e}")))?;

    Ok(ImplementationPlan { scene_index, shot_list: parsed.shot_list, assets: parsed.assets, narration: parsed.narration })
}
