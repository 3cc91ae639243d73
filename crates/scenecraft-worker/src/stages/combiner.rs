//! Combiner stage (spec §4.9): concatenates rendered scenes in order
//! into one video. Identical inputs produce identical output modulo
//! muxer timestamps, since scenes are always fed in ascending index
//! order through ffmpeg's concat demuxer.

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_models::{Job, Stage};
use scenecraft_resilience::CircuitBreakerConfig;
use tokio::sync::watch;

use crate::context::WorkerContext;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::JobLogger;
use crate::subprocess;

use super::types::{CombinedVideo, PipelineArtifacts};
use super::{from_circuit_error, StageExecutor};

pub struct CombinerStage;

#[async_trait]
impl StageExecutor for CombinerStage {
    fn stage(&self) -> Stage {
        Stage::Combining
    }

    fn timeout(&self, ctx: &WorkerContext, _artifacts: &PipelineArtifacts) -> Duration {
        ctx.config.stage_timeout_combining
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

        if artifacts.rendered.is_empty() {
            return Err(WorkerError::validation(self.stage(), "no rendered scenes to combine".to_string()));
        }

        let manifest_path = job_dir.join("concat_manifest.txt");
        let manifest = artifacts
            .rendered
            .iter()
            .map(|scene| format!("file '{}'", scene.video_path.display()))
            .collect::<Vec<_>>()
            .join("\n");
        tokio::fs::write(&manifest_path, manifest).await?;

        let output_path = job_dir.join("combined.mp4");
        let args = vec![
            "-y".to_string(),
            "-f".to_string(),
            "concat".to_string(),
            "-safe".to_string(),
            "0".to_string(),
            "-i".to_string(),
            manifest_path.to_string_lossy().to_string(),
            "-c".to_string(),
            "copy".to_string(),
            output_path.to_string_lossy().to_string(),
        ];

        let breaker = ctx.circuit_breakers.get_or_create(
            "combiner",
            CircuitBreakerConfig { call_timeout: ctx.config.stage_timeout_combining, ..Default::default() },
        );

        breaker
            .call(|| subprocess::run_with_timeout("ffmpeg", &args, &job_dir, ctx.config.stage_timeout_combining, cancel))
            .await
            .map_err(from_circuit_error)?;

        let duration_secs = subprocess::probe_duration_secs(&output_path).await.unwrap_or_else(|_| {
            artifacts.rendered.iter().map(|scene| scene.duration_secs).sum()
        });

        logger.log_completion(&format!("combined video {:.1}s", duration_secs));
        artifacts.combined = Some(CombinedVideo { video_path: output_path, duration_secs });
        Ok(())
    }
}
