//! `WorkerPool`: N concurrent worker loops dequeuing and running jobs
//! through the `PipelineOrchestrator` (spec §4.11).

use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use scenecraft_models::JobId;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::context::WorkerContext;
use crate::orchestrator::PipelineOrchestrator;

pub struct WorkerPool {
    ctx: Arc<WorkerContext>,
}

impl WorkerPool {
    pub fn new(ctx: Arc<WorkerContext>) -> Self {
        Self { ctx }
    }

    /// Runs `worker_count` loops concurrently until `shutdown` fires, then
    /// waits for in-flight jobs to drain before returning.
    pub async fn run(&self, shutdown: watch::Receiver<bool>) {
        let worker_count = self.ctx.config.worker_count;
        info!(worker_count, "worker pool starting");

        let mut handles = Vec::with_capacity(worker_count);
        for index in 0..worker_count {
            let ctx = self.ctx.clone();
            let shutdown = shutdown.clone();
            let worker_id = format!("worker-{index}-{}", uuid::Uuid::new_v4());
            handles.push(tokio::spawn(worker_loop(worker_id, ctx, shutdown)));
        }

        for handle in handles {
            let _ = handle.await;
        }

        info!("worker pool stopped");
    }
}

async fn worker_loop(worker_id: String, ctx: Arc<WorkerContext>, mut shutdown: watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow() {
            break;
        }

        tokio::select! {
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    break;
                }
            }
            dequeued = ctx.queue.dequeue(&worker_id, ctx.clock.now()) => {
                match dequeued {
                    Ok(Some(job_id)) => process_job(&worker_id, &ctx, job_id, shutdown.clone()).await,
                    Ok(None) => tokio::time::sleep(jittered_backoff(ctx.config.poll_backoff_min, ctx.config.poll_backoff_max)).await,
                    Err(e) => {
                        warn!(worker_id, error = %e, "dequeue failed");
                        tokio::time::sleep(ctx.config.poll_backoff_max).await;
                    }
                }
            }
        }
    }
}

async fn process_job(worker_id: &str, ctx: &Arc<WorkerContext>, job_id: JobId, pool_shutdown: watch::Receiver<bool>) {
    let job = match ctx.job_repo.get_job(job_id).await {
        Ok(Some(job)) => job,
        Ok(None) => {
            warn!(%job_id, "leased job not found, acking to drop it from the queue");
            let _ = ctx.queue.ack(job_id).await;
            return;
        }
        Err(e) => {
            warn!(%job_id, error = %e, "failed to load leased job, lease will expire and it will be redispatched");
            return;
        }
    };
    let mut job = job;

    let (cancel_tx, cancel_rx) = watch::channel(false);

    let renewal_ctx = ctx.clone();
    let renewal_worker_id = worker_id.to_string();
    let lease_ttl = ctx.queue.lease_ttl();
    let mut renewal_cancel = cancel_rx.clone();
    let renewal_cancel_tx = cancel_tx.clone();
    let renewal_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(lease_ttl / 3);
        ticker.tick().await;
        loop {
            tokio::select! {
                _ = renewal_cancel.changed() => {
                    if *renewal_cancel.borrow() {
                        break;
                    }
                }
                _ = ticker.tick() => {
                    if let Err(e) = renewal_ctx.queue.renew_lease(job_id, &renewal_worker_id, renewal_ctx.clock.now()).await {
                        warn!(%job_id, error = %e, "lease renewal failed");
                        break;
                    }
                    // A user-initiated cancel lands as a DB status flip from a
                    // different process (the API); the lease renewal ticker is
                    // the only periodic checkpoint this worker has to notice it.
                    match renewal_ctx.job_repo.get_job(job_id).await {
                        Ok(Some(job)) if job.status == scenecraft_models::JobStatus::Cancelled => {
                            let _ = renewal_cancel_tx.send(true);
                            break;
                        }
                        Ok(_) => {}
                        Err(e) => warn!(%job_id, error = %e, "failed to poll job status for cancellation"),
                    }
                }
            }
        }
    });

    let shutdown_relay = tokio::spawn(async move {
        let mut pool_shutdown = pool_shutdown;
        let _ = pool_shutdown.changed().await;
        if *pool_shutdown.borrow() {
            let _ = cancel_tx.send(true);
        }
    });

    let orchestrator = PipelineOrchestrator::new(ctx.clone());
    if let Err(e) = orchestrator.run(&mut job, cancel_rx).await {
        warn!(%job_id, error = %e, "orchestrator run ended in an unhandled error; the lease will expire and the job will be redispatched");
    }

    renewal_task.abort();
    shutdown_relay.abort();
}

fn jittered_backoff(min: Duration, max: Duration) -> Duration {
    if max <= min {
        return min;
    }
    let millis = rand::thread_rng().gen_range(min.as_millis() as u64..=max.as_millis() as u64);
    Duration::from_millis(millis)
}
