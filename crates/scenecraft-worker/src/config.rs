//! Worker configuration (spec §4.11, §6.3).

use std::time::Duration;

/// Process-wide worker pool and resource-cap configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// N concurrent worker loops; default = min(CPU, 4).
    pub worker_count: usize,
    /// Global cap on renderer subprocesses across the process.
    pub max_concurrent_renders: usize,
    /// Global cap on concurrent LLM calls, per model family.
    pub llm_concurrency: usize,
    /// Lease TTL; the worker renews on a ticker at `lease_ttl / 3`.
    pub lease_ttl: Duration,
    /// Grace period before a cancelled stage is forcibly aborted.
    pub grace_period: Duration,
    /// Wall-clock bound on a single renderer subprocess invocation.
    pub render_timeout_per_scene: Duration,
    pub stage_timeout_planning: Duration,
    pub stage_timeout_scenario: Duration,
    pub stage_timeout_code_generation: Duration,
    pub stage_timeout_combining: Duration,
    pub stage_timeout_storage: Duration,
    /// Upper bound on scenes a single job may request.
    pub max_scenes: u32,
    /// Working directory root; each job gets `work_dir/{job_id}/`.
    pub work_dir: std::path::PathBuf,
    /// How long a cancelled job's local working directory is retained
    /// for diagnostics before garbage collection.
    pub partial_retention: Duration,
    /// Path to the external animation-renderer executable.
    pub renderer_binary: String,
    /// Bounded wait for a poll against an empty queue before retrying,
    /// as jittered backoff (min, max).
    pub poll_backoff_min: Duration,
    pub poll_backoff_max: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        let cpu = std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1);
        Self {
            worker_count: cpu.min(4),
            max_concurrent_renders: 2,
            llm_concurrency: 4,
            lease_ttl: Duration::from_secs(60),
            grace_period: Duration::from_secs(5),
            render_timeout_per_scene: Duration::from_secs(600),
            stage_timeout_planning: Duration::from_secs(180),
            stage_timeout_scenario: Duration::from_secs(300),
            stage_timeout_code_generation: Duration::from_secs(600),
            stage_timeout_combining: Duration::from_secs(300),
            stage_timeout_storage: Duration::from_secs(600),
            max_scenes: 20,
            work_dir: std::path::PathBuf::from("/tmp/scenecraft"),
            partial_retention: Duration::from_secs(24 * 3600),
            renderer_binary: "scene-renderer".to_string(),
            poll_backoff_min: Duration::from_millis(10),
            poll_backoff_max: Duration::from_millis(500),
        }
    }
}

impl WorkerConfig {
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            worker_count: env_parse("WORKER_COUNT", defaults.worker_count),
            max_concurrent_renders: env_parse("WORKER_MAX_CONCURRENT_RENDERS", defaults.max_concurrent_renders),
            llm_concurrency: env_parse("WORKER_LLM_CONCURRENCY", defaults.llm_concurrency),
            lease_ttl: Duration::from_secs(env_parse("WORKER_LEASE_TTL_SECONDS", defaults.lease_ttl.as_secs())),
            grace_period: Duration::from_secs(env_parse("WORKER_GRACE_PERIOD_SECONDS", defaults.grace_period.as_secs())),
            render_timeout_per_scene: Duration::from_secs(env_parse(
                "WORKER_RENDER_TIMEOUT_PER_SCENE_SECONDS",
                defaults.render_timeout_per_scene.as_secs(),
            )),
            stage_timeout_planning: Duration::from_secs(env_parse("WORKER_STAGE_TIMEOUT_PLANNING_SECONDS", defaults.stage_timeout_planning.as_secs())),
            stage_timeout_scenario: Duration::from_secs(env_parse("WORKER_STAGE_TIMEOUT_SCENARIO_SECONDS", defaults.stage_timeout_scenario.as_secs())),
            stage_timeout_code_generation: Duration::from_secs(env_parse(
                "WORKER_STAGE_TIMEOUT_CODE_GENERATION_SECONDS",
                defaults.stage_timeout_code_generation.as_secs(),
            )),
            stage_timeout_combining: Duration::from_secs(env_parse("WORKER_STAGE_TIMEOUT_COMBINING_SECONDS", defaults.stage_timeout_combining.as_secs())),
            stage_timeout_storage: Duration::from_secs(env_parse("WORKER_STAGE_TIMEOUT_STORAGE_SECONDS", defaults.stage_timeout_storage.as_secs())),
            max_scenes: env_parse("WORKER_MAX_SCENES", defaults.max_scenes),
            work_dir: std::env::var("WORKER_WORK_DIR").map(std::path::PathBuf::from).unwrap_or(defaults.work_dir),
            partial_retention: Duration::from_secs(env_parse("WORKER_PARTIAL_RETENTION_SECONDS", defaults.partial_retention.as_secs())),
            renderer_binary: std::env::var("WORKER_RENDERER_BINARY").unwrap_or(defaults.renderer_binary),
            poll_backoff_min: Duration::from_millis(env_parse("WORKER_POLL_BACKOFF_MIN_MS", defaults.poll_backoff_min.as_millis() as u64)),
            poll_backoff_max: Duration::from_millis(env_parse("WORKER_POLL_BACKOFF_MAX_MS", defaults.poll_backoff_max.as_millis() as u64)),
        }
    }

    /// Timeout for the rendering stage as a whole: `scene_count ×
    /// render_timeout_per_scene` (spec §4.10).
    pub fn stage_timeout_rendering(&self, scene_count: u32) -> Duration {
        self.render_timeout_per_scene * scene_count.max(1)
    }
}

fn env_parse<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key).ok().and_then(|v| v.parse().ok()).unwrap_or(default)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_worker_count_is_bounded_by_four() {
        assert!(WorkerConfig::default().worker_count <= 4);
        assert!(WorkerConfig::default().worker_count >= 1);
    }

    #[test]
    fn rendering_timeout_scales_with_scene_count() {
        let config = WorkerConfig::default();
        assert_eq!(config.stage_timeout_rendering(3), config.render_timeout_per_scene * 3);
        assert_eq!(config.stage_timeout_rendering(0), config.render_timeout_per_scene);
    }
}
