// SPDX-License-Identifier: MIT

//! Publishes `{id, timestamp, capacity, status}` to `workers.heartbeat`
//! every `interval`, spec.md §4.4 step 2. Runs until `token` is cancelled.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use mf_bus::{subjects, Bus, BusExt};
use mf_core::wire::HeartbeatMessage;
use tokio_util::sync::CancellationToken;
use tracing::warn;

/// Shared with the dispatch loop so the heartbeat always reports the
/// worker's true current status, not a status fixed at spawn time.
pub struct WorkerStatusFlag(AtomicBool);

impl WorkerStatusFlag {
    pub fn new() -> Arc<Self> {
        Arc::new(Self(AtomicBool::new(false)))
    }

    pub fn set_busy(&self, busy: bool) {
        self.0.store(busy, Ordering::Relaxed);
    }

    fn is_busy(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

pub async fn run(
    bus: Arc<dyn Bus>,
    worker_id: mf_core::model::WorkerId,
    hostname: String,
    version: String,
    capabilities: Vec<String>,
    capacity: serde_json::Value,
    status: Arc<WorkerStatusFlag>,
    interval: Duration,
    token: CancellationToken,
) {
    let mut ticker = tokio::time::interval(interval);
    loop {
        tokio::select! {
            _ = ticker.tick() => {
                let message = HeartbeatMessage {
                    worker_id: worker_id.clone(),
                    hostname: hostname.clone(),
                    version: version.clone(),
                    status: if status.is_busy() { "busy".to_string() } else { "idle".to_string() },
                    capabilities: capabilities.clone(),
                    capacity: capacity.clone(),
                    timestamp: chrono::Utc::now(),
                };
                if let Err(e) = bus.publish_json(subjects::WORKERS_HEARTBEAT, &message).await {
                    warn!(error = %e, "heartbeat: publish failed");
                }
            }
            _ = token.cancelled() => {
                break;
            }
        }
    }
}
