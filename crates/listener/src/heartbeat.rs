// SPDX-License-Identifier: MIT

//! `workers.heartbeat` (LIVE) subscriber: upserts the Worker record every
//! time a worker reports in. Spec.md §4.5: malformed payloads are dropped
//! with a warning rather than killing the subscriber loop.

use std::sync::Arc;

use mf_bus::{subjects, Bus};
use mf_core::model::{Worker, WorkerStatus};
use mf_core::wire::HeartbeatMessage;
use mf_store::Store;
use tracing::{debug, warn};

fn parse_worker_status(raw: &str) -> WorkerStatus {
    match raw {
        "busy" => WorkerStatus::Busy,
        "offline" => WorkerStatus::Offline,
        _ => WorkerStatus::Idle,
    }
}

async fn handle_one(store: &dyn Store, message: &mf_bus::BusMessage) {
    let heartbeat: HeartbeatMessage = match message.decode() {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "heartbeat: dropping malformed payload");
            return;
        }
    };

    let status = parse_worker_status(&heartbeat.status);
    let worker = match store.get_worker(&heartbeat.worker_id).await {
        Ok(mut existing) => {
            existing.hostname = heartbeat.hostname;
            existing.version = heartbeat.version;
            existing.capabilities = heartbeat.capabilities;
            existing.capacity = heartbeat.capacity;
            existing.heartbeat(status, heartbeat.timestamp);
            existing
        }
        Err(_) => {
            let mut worker = Worker::register(
                heartbeat.worker_id,
                heartbeat.hostname,
                heartbeat.version,
                heartbeat.capabilities,
                heartbeat.capacity,
                heartbeat.timestamp,
            );
            worker.heartbeat(status, heartbeat.timestamp);
            worker
        }
    };

    if let Err(e) = store.upsert_worker(worker).await {
        warn!(error = %e, "heartbeat: failed to upsert worker");
    } else {
        debug!("heartbeat: worker upserted");
    }
}

/// Run the heartbeat subscriber until its subscription ends (bus shutdown).
pub async fn run(bus: Arc<dyn Bus>, store: Arc<dyn Store>) {
    let mut subscription = match bus.subscribe(subjects::WORKERS_HEARTBEAT).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "heartbeat: failed to subscribe");
            return;
        }
    };

    while let Some(message) = subscription.next().await {
        handle_one(store.as_ref(), &message).await;
    }
}

#[cfg(test)]
#[path = "heartbeat_tests.rs"]
mod tests;
