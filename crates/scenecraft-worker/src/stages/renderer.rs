//! Renderer stage (spec §4.9): invokes the external animation renderer
//! as a subprocess per scene, bounded by the global `max_concurrent_renders`
//! semaphore and a per-dependency circuit breaker.

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_models::{Job, Stage};
use scenecraft_resilience::CircuitBreakerConfig;
use tokio::sync::watch;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::subprocess;

use super::types::{PipelineArtifacts, RenderedScene};
use super::{from_circuit_error, StageExecutor};

pub struct RendererStage;

#[async_trait]
impl StageExecutor for RendererStage {
    fn stage(&self) -> Stage {
        Stage::Rendering
    }

    fn timeout(&self, ctx: &WorkerContext, artifacts: &PipelineArtifacts) -> Duration {
        ctx.config.stage_timeout_rendering(artifacts.programs.len() as u32)
    }

    async fn run(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        artifacts: &mut PipelineArtifacts,
        cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.id, self.stage().as_str());
        let job_dir = ctx.config.work_dir.join(job.id.to_string());
        let breaker = ctx.circuit_breakers.get_or_create(
            "renderer",
            CircuitBreakerConfig { call_timeout: ctx.config.render_timeout_per_scene, ..Default::default() },
        );

        let mut rendered = Vec::with_capacity(artifacts.programs.len());
        for program in &artifacts.programs {
            if *cancel.borrow() {
                return Err(WorkerError::Cancelled);
            }

            let _permit = ctx.render_semaphore.acquire().await.map_err(|_| WorkerError::Cancelled)?;

            let output_path = job_dir.join(format!("scene_{:03}.mp4", program.scene_index));
            let args = vec![
                "--input".to_string(),
                program.program_path.to_string_lossy().to_string(),
                "--output".to_string(),
                output_path.to_string_lossy().to_string(),
                "--quality".to_string(),
                quality_profile(job),
            ];
            let binary = &ctx.config.renderer_binary;
            let timeout = ctx.config.render_timeout_per_scene;

            breaker
                .call(|| subprocess::run_with_timeout(binary, &args, &job_dir, timeout, cancel))
                .await
                .map_err(from_circuit_error)?;

            let duration_secs = subprocess::probe_duration_secs(&output_path).await.unwrap_or(0.0);
            rendered.push(RenderedScene { scene_index: program.scene_index, video_path: output_path, duration_secs });
        }

        logger.log_completion(&format!("{} scenes rendered", rendered.len()));
        artifacts.rendered = rendered;
        Ok(())
    }
}

fn quality_profile(job: &Job) -> String {
    use scenecraft_models::Quality;
    match job.configuration.quality {
        Quality::Low => "low",
        Quality::Medium => "medium",
        Quality::High => "high",
        Quality::Ultra => "ultra",
    }
    .to_string()
}
