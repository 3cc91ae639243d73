//! Application state.

use std::sync::Arc;

use scenecraft_db::{DbClient, DbConfig, FileRepo, JobRepo, QueueRepo, SubmissionRepo, UserRepo};
use scenecraft_queue::{JobQueue, QueueConfig};
use scenecraft_resilience::CircuitBreakerRegistry;
use scenecraft_storage::{StorageConfig, StorageManager};

use crate::config::ApiConfig;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    pub config: ApiConfig,
    pub db: DbClient,
    pub job_repo: JobRepo,
    pub file_repo: FileRepo,
    pub submission_repo: SubmissionRepo,
    pub user_repo: UserRepo,
    pub queue: JobQueue,
    pub storage: Arc<StorageManager>,
    pub circuit_breakers: CircuitBreakerRegistry,
}

impl AppState {
    /// Create new application state.
    pub async fn new(config: ApiConfig) -> Result<Self, Box<dyn std::error::Error>> {
        let db = DbClient::connect(&DbConfig::from_env()).await?;
        db.migrate().await?;

        let storage = Arc::new(StorageManager::new(StorageConfig::from_env())?);

        let job_repo = JobRepo::new(db.pool().clone());
        let file_repo = FileRepo::new(db.pool().clone());
        let submission_repo = SubmissionRepo::new(db.pool().clone());
        let user_repo = UserRepo::new(db.pool().clone());
        let queue_repo = QueueRepo::new(db.pool().clone());
        let queue = JobQueue::new(queue_repo, QueueConfig::from_env());

        Ok(Self {
            config,
            db,
            job_repo,
            file_repo,
            submission_repo,
            user_repo,
            queue,
            storage,
            circuit_breakers: CircuitBreakerRegistry::new(),
        })
    }
}
