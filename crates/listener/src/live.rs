// SPDX-License-Identifier: MIT

//! `live.lifecycle.*` (LIVE) subscriber.
//!
//! Not part of the original job-orchestration surface: restream ingest
//! publishes stream start/end here so the archive/VOD job for a finished
//! stream gets submitted automatically rather than needing an operator to
//! notice the stream ended and submit one by hand. `live.telemetry.*` is
//! forwarded straight to SSE clients by the daemon and never reaches this
//! subscriber.

use std::sync::Arc;

use mf_bus::{subjects, Bus};
use mf_core::model::SourceType;
use mf_core::wire::LiveLifecycleMessage;
use mf_orchestrator::{Orchestrator, SubmitJobRequest};
use tracing::{info, warn};

async fn handle_one(orchestrator: &Orchestrator, payload: &[u8]) {
    let message: LiveLifecycleMessage = match serde_json::from_slice(payload) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, "live.lifecycle: dropping malformed payload");
            return;
        }
    };

    match message {
        LiveLifecycleMessage::StreamStarted { stream_id, .. } => {
            info!(stream_id, "live.lifecycle: stream started");
        }
        LiveLifecycleMessage::StreamEnded { stream_id, user_id, recording_key } => {
            let Some(recording_key) = recording_key else {
                warn!(stream_id, "live.lifecycle: stream ended with no recording, nothing to archive");
                return;
            };
            let request = SubmitJobRequest {
                user_id,
                source_url: recording_key,
                source_type: SourceType::Restream,
                profiles: vec![],
            };
            match orchestrator.submit_job(request).await {
                Ok(job) => info!(stream_id, job_id = %job.id, "live.lifecycle: archive job submitted"),
                Err(e) => warn!(error = %e, stream_id, "live.lifecycle: failed to submit archive job"),
            }
        }
    }
}

/// Run the `live.lifecycle.*` subscriber until the subscription ends.
pub async fn run(bus: Arc<dyn Bus>, orchestrator: Arc<Orchestrator>) {
    let pattern = format!("{}*", subjects::LIVE_LIFECYCLE_PREFIX);
    let mut subscription = match bus.subscribe(&pattern).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "live.lifecycle: failed to subscribe");
            return;
        }
    };

    while let Some(message) = subscription.next().await {
        handle_one(&orchestrator, &message.payload).await;
    }
}

#[cfg(test)]
#[path = "live_tests.rs"]
mod tests;
