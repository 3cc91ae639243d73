//! Pipeline worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use scenecraft_db::{DbClient, DbConfig, FileRepo, JobRepo, ProgressRepo, QueueRepo};
use scenecraft_llm::{LlmClient, LlmConfig};
use scenecraft_models::SystemClock;
use scenecraft_queue::{JobQueue, ProgressReporter, QueueConfig};
use scenecraft_resilience::{CircuitBreakerRegistry, RetryPolicy, RetryPolicyConfig};
use scenecraft_storage::{StorageConfig, StorageManager};
use scenecraft_worker::{WorkerConfig, WorkerContext, WorkerPool};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider().install_default().expect("failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("scenecraft=info".parse().unwrap()))
        .init();

    let selfcheck = std::env::args().any(|arg| arg == "--selfcheck");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let db = match DbClient::connect(&DbConfig::from_env()).await {
        Ok(db) => db,
        Err(e) => {
            error!(error = %e, "failed to connect to metadata store");
            std::process::exit(1);
        }
    };

    let storage = match StorageManager::new(StorageConfig::from_env()) {
        Ok(storage) => Arc::new(storage),
        Err(e) => {
            error!(error = %e, "failed to initialize storage manager");
            std::process::exit(1);
        }
    };

    if selfcheck {
        run_selfcheck(&db, &storage, &config).await;
        return;
    }

    let llm_config = match LlmConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            error!(error = %e, "failed to load LLM client config");
            std::process::exit(1);
        }
    };
    let llm = match LlmClient::new(llm_config) {
        Ok(llm) => Arc::new(llm),
        Err(e) => {
            error!(error = %e, "failed to initialize LLM client");
            std::process::exit(1);
        }
    };

    let job_repo = JobRepo::new(db.pool().clone());
    let file_repo = FileRepo::new(db.pool().clone());
    let queue_repo = QueueRepo::new(db.pool().clone());
    let progress_repo = ProgressRepo::new(db.pool().clone());

    let queue = JobQueue::new(queue_repo, QueueConfig::from_env());
    let progress = Arc::new(ProgressReporter::new(progress_repo, job_repo.clone()));

    let ctx = Arc::new(WorkerContext::new(
        config,
        Arc::new(SystemClock),
        job_repo,
        file_repo,
        queue,
        progress,
        storage,
        llm,
        CircuitBreakerRegistry::new(),
        RetryPolicy::new(RetryPolicyConfig::default()),
    ));

    let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
    let shutdown_signal = tokio::spawn(async move {
        tokio::signal::ctrl_c().await.ok();
        info!("shutdown signal received, draining in-flight jobs");
        let _ = shutdown_tx.send(true);
    });

    let pool = WorkerPool::new(ctx);
    pool.run(shutdown_rx).await;

    shutdown_signal.abort();
    info!("worker shutdown complete");
}

/// Checks the renderer binary, database, and storage connectivity
/// without dequeuing any work, for use as a deployment health probe.
async fn run_selfcheck(db: &DbClient, storage: &StorageManager, config: &WorkerConfig) {
    let mut ok = true;

    match which::which(&config.renderer_binary) {
        Ok(path) => info!(path = %path.display(), "renderer binary found"),
        Err(_) => {
            error!(binary = %config.renderer_binary, "renderer binary not found on PATH");
            ok = false;
        }
    }

    match db.check_connectivity().await {
        Ok(()) => info!("database connectivity OK"),
        Err(e) => {
            error!(error = %e, "database connectivity check failed");
            ok = false;
        }
    }

    match storage.check_connectivity().await {
        Ok(()) => info!("storage connectivity OK"),
        Err(e) => {
            error!(error = %e, "storage connectivity check failed");
            ok = false;
        }
    }

    if !ok {
        std::process::exit(1);
    }
    info!("selfcheck passed");
}
