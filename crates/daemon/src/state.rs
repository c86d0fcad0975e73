// SPDX-License-Identifier: MIT

use std::sync::Arc;

use mf_orchestrator::Orchestrator;
use mf_store::Store;
use tokio::sync::broadcast;

/// Shared state for the HTTP front-end. `events_tx` fans out the raw JSON
/// bodies published on `jobs.events` to every connected SSE client; a slow
/// or absent subscriber drops messages rather than applying backpressure
/// to the bus forwarder (spec.md §5).
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<Orchestrator>,
    pub store: Arc<dyn Store>,
    pub events_tx: broadcast::Sender<Arc<str>>,
}
