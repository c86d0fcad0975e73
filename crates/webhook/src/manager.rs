// SPDX-License-Identifier: MIT

//! Subscribes to `jobs.events`, and for each task event that settles its
//! job into a terminal status, fans out the corresponding `job.*` webhook
//! event to every subscriber. Spec.md §4.7.

use std::sync::Arc;

use chrono::Utc;
use mf_bus::{subjects, Bus};
use mf_core::model::{JobStatus, Webhook};
use mf_core::wire::{TaskEventKind, TaskEventMessage};
use mf_store::Store;
use serde::Serialize;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::delivery::WebhookDelivery;

#[derive(Serialize)]
struct WebhookPayload<'a> {
    event: &'a str,
    timestamp: String,
    data: serde_json::Value,
}

fn event_name_for(status: JobStatus) -> Option<&'static str> {
    match status {
        JobStatus::Completed => Some("job.completed"),
        JobStatus::Failed => Some("job.failed"),
        JobStatus::Cancelled => Some("job.cancelled"),
        JobStatus::Queued | JobStatus::Processing | JobStatus::Stitching => None,
    }
}

pub struct WebhookManager {
    bus: Arc<dyn Bus>,
    store: Arc<dyn Store>,
    delivery: WebhookDelivery,
}

impl WebhookManager {
    pub fn new(bus: Arc<dyn Bus>, store: Arc<dyn Store>) -> Self {
        Self { bus, store, delivery: WebhookDelivery::new() }
    }

    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> tokio::task::JoinHandle<()> {
        tokio::spawn(async move {
            let mut subscription = match self.bus.subscribe(subjects::JOBS_EVENTS).await {
                Ok(s) => s,
                Err(e) => {
                    warn!(error = %e, "webhook manager: failed to subscribe to jobs.events");
                    return;
                }
            };

            loop {
                let message = tokio::select! {
                    message = subscription.next() => message,
                    _ = token.cancelled() => break,
                };
                let Some(message) = message else { break };
                self.handle_one(&message.payload).await;
            }
        })
    }

    async fn handle_one(&self, payload: &[u8]) {
        let event: TaskEventMessage = match serde_json::from_slice(payload) {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "webhook manager: dropping malformed task event");
                return;
            }
        };

        if !matches!(event.event, TaskEventKind::Completed | TaskEventKind::Failed) {
            return;
        }

        let job = match self.store.get_job(event.job_id).await {
            Ok(job) => job,
            Err(e) => {
                warn!(error = %e, job_id = %event.job_id, "webhook manager: failed to load job for event");
                return;
            }
        };

        let Some(event_name) = event_name_for(job.status) else { return };

        let webhooks = match self.store.list_active_webhooks_for_event(event_name).await {
            Ok(hooks) => hooks,
            Err(e) => {
                warn!(error = %e, event_name, "webhook manager: failed to list subscribed webhooks");
                return;
            }
        };
        if webhooks.is_empty() {
            return;
        }

        let payload = WebhookPayload { event: event_name, timestamp: Utc::now().to_rfc3339(), data: serde_json::to_value(&job).unwrap_or(serde_json::Value::Null) };
        let Ok(body) = serde_json::to_vec(&payload) else {
            warn!(event_name, "webhook manager: failed to serialize webhook payload");
            return;
        };

        for webhook in webhooks {
            let body = body.clone();
            let delivery = self.delivery.clone();
            let store = self.store.clone();
            tokio::spawn(async move {
                deliver_and_record(delivery, store, webhook, body).await;
            });
        }
    }
}

async fn deliver_and_record(delivery: WebhookDelivery, store: Arc<dyn Store>, mut webhook: Webhook, body: Vec<u8>) {
    let ok = delivery.deliver_with_retry(&webhook.url, &body, webhook.secret.as_deref()).await;
    let now = Utc::now();
    if ok {
        webhook.record_success(now);
        debug!(webhook_id = %webhook.id, "webhook delivered");
    } else {
        webhook.record_failure(now);
        warn!(webhook_id = %webhook.id, failure_count = webhook.failure_count, "webhook delivery failed");
    }
    if let Err(e) = store.update_webhook(webhook).await {
        warn!(error = %e, "webhook manager: failed to persist delivery outcome");
    }
}

#[cfg(test)]
#[path = "manager_tests.rs"]
mod tests;
