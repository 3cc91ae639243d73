//! Integration tests for `QueueRepo` against a real Postgres instance.
//!
//! Requires `DATABASE_URL` to point at a scratch database; ignored by
//! default so `cargo test` stays hermetic without one available. Run with
//! `DATABASE_URL=postgres://... cargo test -p scenecraft-db -- --ignored`.

use std::time::Duration;

use chrono::Utc;
use scenecraft_db::{DbClient, DbConfig, JobRepo, QueueRepo, UserRepo};
use scenecraft_models::{Configuration, Job, OutputFormat, Priority, Quality, Role, UserId};

async fn test_client() -> DbClient {
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set for this test");
    let config = DbConfig { database_url, ..DbConfig::default() };
    let client = DbClient::connect(&config).await.expect("failed to connect to test database");
    client.migrate().await.expect("failed to run migrations");
    client
}

fn config() -> Configuration {
    Configuration {
        topic: "Pythagorean theorem".into(),
        context: String::new(),
        quality: Quality::Medium,
        use_rag: false,
        use_context_learning: false,
        enable_subtitles: false,
        enable_thumbnails: true,
        output_format: OutputFormat::Mp4,
        model_planner: None,
        model_scene: None,
        model_helper: None,
        max_scene_concurrency: 3,
    }
}

async fn seed_queued_job(user_repo: &UserRepo, job_repo: &JobRepo, queue_repo: &QueueRepo, priority: Priority) -> scenecraft_models::JobId {
    let now = Utc::now();
    let user_id = UserId::from(format!("u-{}", uuid::Uuid::new_v4()));
    user_repo.create_user_if_absent(&user_id, Role::User, now).await.unwrap();

    let job = Job::new(user_id, config(), priority, now);
    job_repo.insert_job(&job).await.unwrap();
    queue_repo.enqueue(job.id, priority, now).await.unwrap();
    job.id
}

#[tokio::test]
#[ignore]
async fn dequeue_never_leases_the_same_job_to_two_workers() {
    let client = test_client().await;
    let user_repo = UserRepo::new(client.pool().clone());
    let job_repo = JobRepo::new(client.pool().clone());
    let queue_repo = QueueRepo::new(client.pool().clone());

    let job_id = seed_queued_job(&user_repo, &job_repo, &queue_repo, Priority::Normal).await;

    let now = Utc::now();
    let lease_ttl = Duration::from_secs(60);

    let (first, second) = tokio::join!(
        queue_repo.dequeue("worker-a", now, lease_ttl),
        queue_repo.dequeue("worker-b", now, lease_ttl),
    );

    let leased: Vec<_> = [first.unwrap(), second.unwrap()].into_iter().flatten().collect();
    assert_eq!(leased, vec![job_id], "exactly one worker should have leased the job");
}

#[tokio::test]
#[ignore]
async fn dequeue_respects_priority_then_fifo_order() {
    let client = test_client().await;
    let user_repo = UserRepo::new(client.pool().clone());
    let job_repo = JobRepo::new(client.pool().clone());
    let queue_repo = QueueRepo::new(client.pool().clone());

    let low = seed_queued_job(&user_repo, &job_repo, &queue_repo, Priority::Low).await;
    let urgent = seed_queued_job(&user_repo, &job_repo, &queue_repo, Priority::Urgent).await;

    let now = Utc::now();
    let leased = queue_repo.dequeue("worker-a", now, Duration::from_secs(60)).await.unwrap();
    assert_eq!(leased, Some(urgent), "urgent job must dispatch ahead of a low-priority one");

    let leased = queue_repo.dequeue("worker-a", now, Duration::from_secs(60)).await.unwrap();
    assert_eq!(leased, Some(low));
}

#[tokio::test]
#[ignore]
async fn expired_lease_becomes_dispatchable_again() {
    let client = test_client().await;
    let user_repo = UserRepo::new(client.pool().clone());
    let job_repo = JobRepo::new(client.pool().clone());
    let queue_repo = QueueRepo::new(client.pool().clone());

    let job_id = seed_queued_job(&user_repo, &job_repo, &queue_repo, Priority::Normal).await;

    let now = Utc::now();
    let expired_ttl = Duration::from_secs(1);
    let leased = queue_repo.dequeue("worker-a", now, expired_ttl).await.unwrap();
    assert_eq!(leased, Some(job_id));

    let later = now + chrono::Duration::seconds(5);
    let leased_again = queue_repo.dequeue("worker-b", later, Duration::from_secs(60)).await.unwrap();
    assert_eq!(leased_again, Some(job_id), "lease expiry must let another worker claim the job");
}
