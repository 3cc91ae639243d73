//! Subprocess execution with timeout and cooperative cancellation, used
//! by the Renderer stage to invoke the external animation renderer and
//! by the Combiner stage to invoke the concatenation tool.

use std::path::Path;
use std::process::Stdio;
use std::time::Duration;

use serde::Deserialize;
use tokio::process::{Child, Command};
use tokio::sync::watch;
use tracing::{info, warn};

use crate::error::{WorkerError, WorkerResult};

/// Runs `binary` with `args`, enforcing `timeout` and honoring
/// `cancel`. On timeout or cancellation the child is killed and an
/// appropriate `WorkerError` is returned rather than left running.
pub async fn run_with_timeout(
    binary: &str,
    args: &[String],
    cwd: &Path,
    timeout: Duration,
    cancel: &mut watch::Receiver<bool>,
) -> WorkerResult<()> {
    which::which(binary).map_err(|_| WorkerError::SubprocessFailed(format!("{binary} not found on PATH")))?;

    let mut child = Command::new(binary)
        .args(args)
        .current_dir(cwd)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()?;

    let status = wait_for_completion(&mut child, timeout, cancel).await?;

    if status.success() {
        Ok(())
    } else {
        Err(WorkerError::SubprocessFailed(format!("{binary} exited with status {status}")))
    }
}

async fn wait_for_completion(
    child: &mut Child,
    timeout: Duration,
    cancel: &mut watch::Receiver<bool>,
) -> WorkerResult<std::process::ExitStatus> {
    if *cancel.borrow() {
        let _ = child.kill().await;
        return Err(WorkerError::Cancelled);
    }

    tokio::select! {
        result = child.wait() => Ok(result?),
        _ = tokio::time::sleep(timeout) => {
            warn!(?timeout, "subprocess timed out, killing");
            let _ = child.kill().await;
            Err(WorkerError::StageTimeout { stage: scenecraft_models::Stage::Rendering })
        }
        result = cancel.changed() => {
            if result.is_ok() && *cancel.borrow() {
                info!("subprocess cancelled, killing");
                let _ = child.kill().await;
                Err(WorkerError::Cancelled)
            } else {
                // Sender dropped or a spurious non-cancelling change; fall
                // back to waiting out the remaining timeout.
                Ok(child.wait().await?)
            }
        }
    }
}

#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    format: FfprobeFormat,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Probes a rendered scene's duration via `ffprobe`, used by the Renderer
/// stage to record `RenderedScene::duration_secs` and by the Combiner
/// stage to compute the combined video's total duration.
pub async fn probe_duration_secs(path: &Path) -> WorkerResult<f64> {
    which::which("ffprobe").map_err(|_| WorkerError::SubprocessFailed("ffprobe not found on PATH".to_string()))?;

    let output = Command::new("ffprobe")
        .args(["-v", "quiet", "-print_format", "json", "-show_format"])
        .arg(path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .await?;

    if !output.status.success() {
        return Err(WorkerError::SubprocessFailed(format!("ffprobe failed for {}", path.display())));
    }

    let probe: FfprobeOutput = serde_json::from_slice(&output.stdout)
        .map_err(|e| WorkerError::SubprocessFailed(format!("ffprobe output did not parse: {e}")))?;

    Ok(probe.format.duration.as_deref().and_then(|d| d.parse::<f64>().ok()).unwrap_or(0.0))
}

/// Extracts a single frame at `offset` into `output_path`, scaled to
/// `width` wide (height auto, preserving aspect ratio) — used by the
/// Uploader stage to build thumbnails.
pub async fn extract_thumbnail(input_path: &Path, offset: Duration, width: u32, output_path: &Path) -> WorkerResult<()> {
    which::which("ffmpeg").map_err(|_| WorkerError::SubprocessFailed("ffmpeg not found on PATH".to_string()))?;

    let status = Command::new("ffmpeg")
        .args([
            "-y",
            "-ss",
            &format!("{:.3}", offset.as_secs_f64()),
            "-i",
        ])
        .arg(input_path)
        .args(["-vframes", "1", "-vf", &format!("scale={width}:-1")])
        .arg(output_path)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .status()
        .await?;

    if status.success() {
        Ok(())
    } else {
        Err(WorkerError::SubprocessFailed(format!("ffmpeg thumbnail extraction failed for {}", input_path.display())))
    }
}
