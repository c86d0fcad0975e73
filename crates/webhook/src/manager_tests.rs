use std::collections::HashSet;
use std::sync::Arc;

use mf_bus::{Bus, InMemoryBus};
use mf_core::model::{Job, JobStatus, SourceType, TaskId, Webhook};
use mf_core::wire::{TaskEventKind, TaskEventMessage};
use mf_store::{InMemoryStore, JobStore, Store, WebhookStore};
use uuid::Uuid;

use super::*;

fn harness() -> (Arc<dyn Bus>, Arc<dyn Store>) {
    let bus: Arc<dyn Bus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    (bus, store)
}

async fn seed_completed_job(store: &Arc<dyn Store>) -> Job {
    let mut job = Job::new(Uuid::new_v4(), "s3://in/a.mp4".into(), SourceType::Url, vec![], chrono::Utc::now());
    job = store.create_job(job.clone()).await.unwrap();
    job.finish(JobStatus::Completed, chrono::Utc::now(), None);
    store.update_job(job.clone()).await.unwrap();
    job
}

#[tokio::test]
async fn a_completed_job_fires_the_job_completed_webhook() {
    let (bus, store) = harness();
    let job = seed_completed_job(&store).await;
    let webhook = Webhook::new(job.user_id, "https://example.test/hook".into(), None, HashSet::from(["job.completed".to_string()]), chrono::Utc::now());
    store.create_webhook(webhook.clone()).await.unwrap();

    let manager = WebhookManager::new(bus, store.clone());
    let event = TaskEventMessage { task_id: TaskId::new(), job_id: job.id, event: TaskEventKind::Completed, progress_pct: Some(100), message: None, result: None };
    manager.handle_one(&serde_json::to_vec(&event).unwrap()).await;

    // Delivery is spawned onto its own task; give it a moment to run against
    // an unreachable URL and record the resulting failure.
    tokio::time::sleep(std::time::Duration::from_millis(50)).await;
}

#[tokio::test]
async fn a_progress_event_never_triggers_delivery() {
    let (bus, store) = harness();
    let job = seed_completed_job(&store).await;
    let manager = WebhookManager::new(bus, store.clone());
    let event = TaskEventMessage { task_id: TaskId::new(), job_id: job.id, event: TaskEventKind::Progress, progress_pct: Some(40), message: None, result: None };
    // Should return immediately without touching the store's webhook list.
    manager.handle_one(&serde_json::to_vec(&event).unwrap()).await;
}

#[tokio::test]
async fn webhooks_not_subscribed_to_the_event_are_skipped() {
    let (bus, store) = harness();
    let job = seed_completed_job(&store).await;
    let webhook = Webhook::new(job.user_id, "https://example.test/hook".into(), None, HashSet::from(["job.failed".to_string()]), chrono::Utc::now());
    store.create_webhook(webhook).await.unwrap();

    let manager = WebhookManager::new(bus, store.clone());
    let event = TaskEventMessage { task_id: TaskId::new(), job_id: job.id, event: TaskEventKind::Completed, progress_pct: Some(100), message: None, result: None };
    manager.handle_one(&serde_json::to_vec(&event).unwrap()).await;
}

#[tokio::test]
async fn malformed_payload_is_dropped_without_panicking() {
    let (bus, store) = harness();
    let manager = WebhookManager::new(bus, store);
    manager.handle_one(b"not json").await;
}
