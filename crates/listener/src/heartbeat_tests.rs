use mf_bus::{subjects, Bus, BusMessage, InMemoryBus};
use mf_core::model::{WorkerId, WorkerStatus};
use mf_core::wire::HeartbeatMessage;
use mf_store::{InMemoryStore, Store};

use super::*;

fn heartbeat_payload(worker_id: &str, status: &str) -> Vec<u8> {
    let message = HeartbeatMessage {
        worker_id: WorkerId::new(worker_id),
        hostname: "encoder-1".into(),
        version: "1.2.3".into(),
        status: status.into(),
        capabilities: vec!["probe".into(), "transcode".into()],
        capacity: serde_json::json!({ "slots": 4 }),
        timestamp: chrono::Utc::now(),
    };
    serde_json::to_vec(&message).unwrap()
}

#[tokio::test]
async fn registers_a_worker_seen_for_the_first_time() {
    let store = InMemoryStore::new();
    let message = BusMessage { subject: subjects::WORKERS_HEARTBEAT.into(), payload: heartbeat_payload("w1", "idle") };

    handle_one(&store, &message).await;

    let worker = store.get_worker(&WorkerId::new("w1")).await.unwrap();
    assert_eq!(worker.hostname, "encoder-1");
    assert_eq!(worker.status, WorkerStatus::Idle);
    assert_eq!(worker.capabilities, vec!["probe", "transcode"]);
}

#[tokio::test]
async fn updates_an_existing_worker_in_place() {
    let store = InMemoryStore::new();
    handle_one(&store, &BusMessage { subject: subjects::WORKERS_HEARTBEAT.into(), payload: heartbeat_payload("w1", "idle") }).await;
    handle_one(&store, &BusMessage { subject: subjects::WORKERS_HEARTBEAT.into(), payload: heartbeat_payload("w1", "busy") }).await;

    let worker = store.get_worker(&WorkerId::new("w1")).await.unwrap();
    assert_eq!(worker.status, WorkerStatus::Busy);
}

#[tokio::test]
async fn malformed_payload_is_dropped_without_panicking() {
    let store = InMemoryStore::new();
    let message = BusMessage { subject: subjects::WORKERS_HEARTBEAT.into(), payload: b"not json".to_vec() };
    handle_one(&store, &message).await;
    assert!(store.get_worker(&WorkerId::new("w1")).await.is_err());
}

#[tokio::test]
async fn run_processes_messages_published_after_it_starts() {
    let bus: std::sync::Arc<dyn Bus> = std::sync::Arc::new(InMemoryBus::new());
    let store: std::sync::Arc<dyn Store> = std::sync::Arc::new(InMemoryStore::new());

    let handle = tokio::spawn(run(bus.clone(), store.clone()));
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;
    bus.publish(subjects::WORKERS_HEARTBEAT, &heartbeat_payload("w1", "idle")).await.unwrap();
    tokio::time::sleep(std::time::Duration::from_millis(20)).await;

    let worker = store.get_worker(&WorkerId::new("w1")).await.unwrap();
    assert_eq!(worker.status, WorkerStatus::Idle);
    handle.abort();
}
