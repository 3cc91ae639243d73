//! Uploader stage (spec §4.9, §4.5): persists scene code, scene videos,
//! the combined video, and (if requested) thumbnails to storage.
//! Already-uploaded artifacts are skipped on retry — the idempotent
//! `LogicalName` lookup means a partial failure only retries the
//! remainder.

use std::time::Duration;

use async_trait::async_trait;
use scenecraft_models::{FileKind, Job, Stage};
use scenecraft_storage::{layout, LogicalName, ThumbnailSize};
use tokio::sync::watch;

use crate::context::WorkerContext;
use crate::error::WorkerResult;
use crate::logging::JobLogger;
use crate::subprocess;

use super::types::PipelineArtifacts;
use super::StageExecutor;

pub struct UploaderStage;

#[async_trait]
impl StageExecutor for UploaderStage {
    fn stage(&self) -> Stage {
        Stage::Storage
    }

    fn timeout(&self, ctx: &WorkerContext, _artifacts: &PipelineArtifacts) -> Duration {
        ctx.config.stage_timeout_storage
    }

    async fn run(
        &self,
        job: &Job,
        ctx: &WorkerContext,
        artifacts: &mut PipelineArtifacts,
        _cancel: &mut watch::Receiver<bool>,
    ) -> WorkerResult<()> {
        let logger = JobLogger::new(&job.id, self.stage().as_str());
        let job_dir = ctx.config.work_dir.join(job.id.to_string());

        for program in &artifacts.programs {
            self.upload_if_missing(
                ctx,
                job,
                FileKind::SceneCode,
                format!("scene_{:03}.py", program.scene_index),
                &program.program_path,
                layout::scene_code_key(&job.user_id, job.id, program.scene_index),
                "text/x-python",
            )
            .await?;
        }

        for scene in &artifacts.rendered {
            self.upload_if_missing(
                ctx,
                job,
                FileKind::SceneVideo,
                format!("scene_{:03}/output.mp4", scene.scene_index),
                &scene.video_path,
                layout::scene_video_key(&job.user_id, job.id, scene.scene_index),
                "video/mp4",
            )
            .await?;
        }

        if let Some(combined) = &artifacts.combined {
            self.upload_if_missing(
                ctx,
                job,
                FileKind::CombinedVideo,
                "combined.mp4".to_string(),
                &combined.video_path,
                layout::combined_video_key(&job.user_id, job.id),
                "video/mp4",
            )
            .await?;

            if job.configuration.enable_thumbnails {
                for size in ThumbnailSize::ALL {
                    let offset_secs = combined.duration_secs * 0.1;
                    let thumbnail_path = job_dir.join(format!("thumbnail_{}.jpg", size.as_str()));
                    subprocess::extract_thumbnail(&combined.video_path, Duration::from_secs_f64(offset_secs), size.width(), &thumbnail_path).await?;

                    self.upload_if_missing(
                        ctx,
                        job,
                        FileKind::Thumbnail,
                        format!("{}.jpg", size.as_str()),
                        &thumbnail_path,
                        layout::thumbnail_key(&job.user_id, job.id, size),
                        "image/jpeg",
                    )
                    .await?;
                }
            }
        }

        logger.log_completion("artifacts uploaded");
        Ok(())
    }
}

impl UploaderStage {
    #[allow(clippy::too_many_arguments)]
    async fn upload_if_missing(
        &self,
        ctx: &WorkerContext,
        job: &Job,
        kind: FileKind,
        name: String,
        source_path: &std::path::Path,
        remote_key: String,
        content_type: &str,
    ) -> WorkerResult<()> {
        if ctx.file_repo.find_by_logical_name(job.id, kind, &name).await?.is_some() {
            return Ok(());
        }

        let logical = LogicalName::new(job.id, kind, None, name);
        let metadata = ctx.storage.put_file(ctx.clock.as_ref(), job.user_id.clone(), logical, source_path, &remote_key, content_type).await?;
        ctx.file_repo.insert_file(&metadata).await?;
        Ok(())
    }
}
