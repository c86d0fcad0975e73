use mf_bus::{Bus, InMemoryBus};
use mf_core::model::SourceType;
use mf_orchestrator::Orchestrator;
use mf_store::{InMemoryStore, JobStore};
use uuid::Uuid;

use super::*;

fn harness() -> std::sync::Arc<Orchestrator> {
    let bus: std::sync::Arc<dyn Bus> = std::sync::Arc::new(InMemoryBus::new());
    let store: std::sync::Arc<dyn mf_store::Store> = std::sync::Arc::new(InMemoryStore::new());
    std::sync::Arc::new(Orchestrator::new(bus, store))
}

#[tokio::test]
async fn stream_ended_with_a_recording_submits_an_archive_job() {
    let orchestrator = harness();
    let message = LiveLifecycleMessage::StreamEnded { stream_id: "s1".into(), user_id: Uuid::new_v4(), recording_key: Some("s3://recordings/s1.mp4".into()) };
    handle_one(&orchestrator, &serde_json::to_vec(&message).unwrap()).await;

    let jobs = orchestrator.list_jobs(Default::default(), Default::default()).await.unwrap();
    assert_eq!(jobs.len(), 1);
    assert_eq!(jobs[0].source_type, SourceType::Restream);
    assert_eq!(jobs[0].source_url, "s3://recordings/s1.mp4");
}

#[tokio::test]
async fn stream_ended_without_a_recording_submits_nothing() {
    let orchestrator = harness();
    let message = LiveLifecycleMessage::StreamEnded { stream_id: "s1".into(), user_id: Uuid::new_v4(), recording_key: None };
    handle_one(&orchestrator, &serde_json::to_vec(&message).unwrap()).await;

    let jobs = orchestrator.list_jobs(Default::default(), Default::default()).await.unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn stream_started_is_a_no_op() {
    let orchestrator = harness();
    let message = LiveLifecycleMessage::StreamStarted { stream_id: "s1".into(), user_id: Uuid::new_v4(), source_url: "rtmp://in/s1".into() };
    handle_one(&orchestrator, &serde_json::to_vec(&message).unwrap()).await;

    let jobs = orchestrator.list_jobs(Default::default(), Default::default()).await.unwrap();
    assert!(jobs.is_empty());
}

#[tokio::test]
async fn malformed_payload_is_dropped() {
    let orchestrator = harness();
    handle_one(&orchestrator, b"not json").await;
    let jobs = orchestrator.list_jobs(Default::default(), Default::default()).await.unwrap();
    assert!(jobs.is_empty());
}
