// SPDX-License-Identifier: MIT

use super::*;
use crate::traits::{JobFilter, JobStore, Page, TaskStore, WorkerStore};
use chrono::Duration;
use mf_core::model::{Job, JobStatus, SourceType, Task, TaskType, NO_SEQUENCE};

fn make_job() -> Job {
    Job::new(Uuid::nil(), "https://example.test/a.mp4".into(), SourceType::Url, vec![], Utc::now())
}

#[tokio::test]
async fn create_and_get_job_round_trips() {
    let store = InMemoryStore::new();
    let job = make_job();
    store.create_job(job.clone()).await.unwrap();
    let fetched = store.get_job(job.id).await.unwrap();
    assert_eq!(fetched.id, job.id);
}

#[tokio::test]
async fn create_job_twice_conflicts() {
    let store = InMemoryStore::new();
    let job = make_job();
    store.create_job(job.clone()).await.unwrap();
    let err = store.create_job(job).await.unwrap_err();
    assert!(matches!(err, StoreError::Conflict(_)));
}

#[tokio::test]
async fn list_jobs_filters_by_status() {
    let store = InMemoryStore::new();
    let mut queued = make_job();
    let mut completed = make_job();
    completed.status = JobStatus::Completed;
    store.create_job(queued.clone()).await.unwrap();
    store.create_job(completed.clone()).await.unwrap();

    let filter = JobFilter { status: Some(JobStatus::Completed), ..Default::default() };
    let results = store.list_jobs(filter, Page::default()).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, completed.id);
    let _ = &mut queued;
}

#[tokio::test]
async fn orphaned_tasks_have_no_matching_job() {
    let store = InMemoryStore::new();
    let job = make_job();
    let orphan_job_id = mf_core::model::JobId::new();
    store.create_job(job.clone()).await.unwrap();

    let live_task = Task::new(job.id, TaskType::Probe, NO_SEQUENCE, serde_json::json!({}), Utc::now());
    let orphan_task = Task::new(orphan_job_id, TaskType::Probe, NO_SEQUENCE, serde_json::json!({}), Utc::now());
    store.create_tasks(vec![live_task.clone(), orphan_task.clone()]).await.unwrap();

    let orphans = store.list_orphaned_tasks().await.unwrap();
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].id, orphan_task.id);
}

#[tokio::test]
async fn workers_last_seen_before_cutoff_are_listed() {
    let store = InMemoryStore::new();
    let now = Utc::now();
    let stale = mf_core::model::Worker::register(
        mf_core::model::WorkerId::new("stale-host"),
        "stale-host".into(),
        "0.1.0".into(),
        vec![],
        serde_json::json!({}),
        now - Duration::minutes(10),
    );
    let fresh = mf_core::model::Worker::register(
        mf_core::model::WorkerId::new("fresh-host"),
        "fresh-host".into(),
        "0.1.0".into(),
        vec![],
        serde_json::json!({}),
        now,
    );
    store.upsert_worker(stale.clone()).await.unwrap();
    store.upsert_worker(fresh).await.unwrap();

    let cutoff = now - Duration::minutes(5);
    let results = store.list_workers_last_seen_before(cutoff).await.unwrap();
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].id, stale.id);
}
