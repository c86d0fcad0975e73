// SPDX-License-Identifier: MIT

//! `jobs.events` and `events.error` (EVENTS) subscribers.
//!
//! `jobs.events` messages are handed verbatim to
//! [`mf_orchestrator::Orchestrator::handle_task_event`]; `events.error`
//! messages are persisted as [`ErrorEvent`]s for operator visibility. Both
//! subscriptions run independently so a burst on one subject never starves
//! the other.

use std::sync::Arc;

use mf_bus::{subjects, Bus, BusMessage};
use mf_core::model::ErrorEvent;
use mf_core::wire::{ErrorEventMessage, TaskEventMessage};
use mf_orchestrator::Orchestrator;
use mf_store::Store;
use tracing::warn;

async fn handle_task_event(orchestrator: &Orchestrator, message: &BusMessage) {
    let event: TaskEventMessage = match message.decode() {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "jobs.events: dropping malformed payload");
            return;
        }
    };
    if let Err(e) = orchestrator.handle_task_event(event).await {
        warn!(error = %e, "jobs.events: failed to handle task event");
    }
}

async fn handle_error_event(store: &dyn Store, message: &BusMessage) {
    let event: ErrorEventMessage = match message.decode() {
        Ok(e) => e,
        Err(e) => {
            warn!(error = %e, "events.error: dropping malformed payload");
            return;
        }
    };
    let entry = ErrorEvent {
        id: event.id,
        source_component: event.source_component,
        severity: event.severity,
        message: event.message,
        stack_trace: event.stack_trace,
        context_data: event.context_data,
        resolved: false,
        created_at: event.timestamp,
    };
    if let Err(e) = store.append_error_event(entry).await {
        warn!(error = %e, "events.error: failed to persist error event");
    }
}

/// Run the `jobs.events` subscriber until the subscription ends.
pub async fn run_task_events(bus: Arc<dyn Bus>, orchestrator: Arc<Orchestrator>) {
    let mut subscription = match bus.subscribe(subjects::JOBS_EVENTS).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "jobs.events: failed to subscribe");
            return;
        }
    };
    while let Some(message) = subscription.next().await {
        handle_task_event(&orchestrator, &message).await;
    }
}

/// Run the `events.error` subscriber until the subscription ends.
pub async fn run_error_events(bus: Arc<dyn Bus>, store: Arc<dyn Store>) {
    let mut subscription = match bus.subscribe(subjects::EVENTS_ERROR).await {
        Ok(s) => s,
        Err(e) => {
            warn!(error = %e, "events.error: failed to subscribe");
            return;
        }
    };
    while let Some(message) = subscription.next().await {
        handle_error_event(store.as_ref(), &message).await;
    }
}

#[cfg(test)]
#[path = "events_tests.rs"]
mod tests;
