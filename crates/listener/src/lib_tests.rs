use std::sync::Arc;
use std::time::Duration;

use mf_bus::{subjects, Bus, InMemoryBus};
use mf_core::model::{WorkerId, WorkerStatus};
use mf_core::wire::HeartbeatMessage;
use mf_orchestrator::Orchestrator;
use mf_store::{InMemoryStore, Store, WorkerStore};
use tokio_util::sync::CancellationToken;

use super::*;

#[tokio::test]
async fn spawn_all_wires_up_the_heartbeat_subscriber() {
    let bus: Arc<dyn Bus> = Arc::new(InMemoryBus::new());
    let store: Arc<dyn Store> = Arc::new(InMemoryStore::new());
    let orchestrator = Arc::new(Orchestrator::new(bus.clone(), store.clone()));
    let token = CancellationToken::new();

    let handles = spawn_all(bus.clone(), store.clone(), orchestrator, token.clone());
    assert_eq!(handles.len(), 4);

    tokio::time::sleep(Duration::from_millis(20)).await;
    let message = HeartbeatMessage {
        worker_id: WorkerId::new("w1"),
        hostname: "h".into(),
        version: "1.0".into(),
        status: "idle".into(),
        capabilities: vec![],
        capacity: serde_json::json!({}),
        timestamp: chrono::Utc::now(),
    };
    bus.publish(subjects::WORKERS_HEARTBEAT, &serde_json::to_vec(&message).unwrap()).await.unwrap();
    tokio::time::sleep(Duration::from_millis(20)).await;

    let worker = store.get_worker(&WorkerId::new("w1")).await.unwrap();
    assert_eq!(worker.status, WorkerStatus::Idle);

    token.cancel();
    for handle in handles {
        let _ = tokio::time::timeout(Duration::from_secs(1), handle).await;
    }
}
