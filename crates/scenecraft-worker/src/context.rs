//! Shared, process-wide dependencies handed to every stage executor.

use std::sync::Arc;

use scenecraft_db::{FileRepo, JobRepo};
use scenecraft_llm::LlmClient;
use scenecraft_models::Clock;
use scenecraft_queue::{JobQueue, ProgressReporter};
use scenecraft_resilience::{CircuitBreakerRegistry, RetryPolicy};
use scenecraft_storage::StorageManager;
use tokio::sync::Semaphore;

use crate::config::WorkerConfig;
use crate::stages::types::{NullRagIndex, RagIndex};

/// Everything a `PipelineOrchestrator` needs to run a job, shared
/// read-only (behind `Arc`) across every concurrent worker loop.
pub struct WorkerContext {
    pub config: WorkerConfig,
    pub clock: Arc<dyn Clock>,
    pub job_repo: JobRepo,
    pub file_repo: FileRepo,
    pub queue: JobQueue,
    pub progress: Arc<ProgressReporter>,
    pub storage: Arc<StorageManager>,
    pub llm: Arc<LlmClient>,
    pub circuit_breakers: CircuitBreakerRegistry,
    pub retry_policy: RetryPolicy,
    /// Retrieval index the CodeGenerator stage augments its prompt with
    /// when `configuration.use_rag` is set; out of scope to implement
    /// (spec §4.9), so this defaults to a no-op index.
    pub rag: Arc<dyn RagIndex>,
    /// Global cap on renderer subprocesses across the whole process
    /// (spec §4.11); a scene's Renderer stage waits on this permit.
    pub render_semaphore: Arc<Semaphore>,
    /// Global cap on concurrent LLM calls (spec §4.11, per model family
    /// in principle; a single pool is sufficient at this scale).
    pub llm_semaphore: Arc<Semaphore>,
}

impl WorkerContext {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        config: WorkerConfig,
        clock: Arc<dyn Clock>,
        job_repo: JobRepo,
        file_repo: FileRepo,
        queue: JobQueue,
        progress: Arc<ProgressReporter>,
        storage: Arc<StorageManager>,
        llm: Arc<LlmClient>,
        circuit_breakers: CircuitBreakerRegistry,
        retry_policy: RetryPolicy,
    ) -> Self {
        let render_semaphore = Arc::new(Semaphore::new(config.max_concurrent_renders));
        let llm_semaphore = Arc::new(Semaphore::new(config.llm_concurrency));
        Self {
            config,
            clock,
            job_repo,
            file_repo,
            queue,
            progress,
            storage,
            llm,
            circuit_breakers,
            retry_policy,
            rag: Arc::new(NullRagIndex),
            render_semaphore,
            llm_semaphore,
        }
    }

    /// Overrides the default no-op retrieval index, for deployments that
    /// wire in a real one.
    pub fn with_rag(mut self, rag: Arc<dyn RagIndex>) -> Self {
        self.rag = rag;
        self
    }
}
