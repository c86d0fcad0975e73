// SPDX-License-Identifier: MIT

//! Live `jobs.events` fan-out over Server-Sent Events. Spec.md §5: "SSE
//! subscriber table is guarded by a read/write lock; broadcast is
//! non-blocking (drop-on-full-buffer per subscriber)" — `broadcast::Sender`
//! gives us exactly that: a lagging receiver skips ahead rather than
//! blocking the publisher.

use std::convert::Infallible;
use std::sync::Arc;

use axum::extract::State;
use axum::response::sse::{Event, KeepAlive, Sse};
use futures::stream::Stream;
use mf_bus::{Bus, Subscription};
use tokio::sync::broadcast;

use crate::state::AppState;

/// Subject the daemon bridges from the bus onto the local broadcast channel.
pub const BRIDGED_SUBJECT: &str = mf_bus::subjects::JOBS_EVENTS;

/// Bound on the per-client SSE buffer; a client that falls this far behind
/// starts missing events instead of stalling the bridge task.
pub const CHANNEL_CAPACITY: usize = 256;

pub async fn handler(State(state): State<AppState>) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.events_tx.subscribe();
    Sse::new(into_stream(rx)).keep_alive(KeepAlive::default())
}

fn into_stream(rx: broadcast::Receiver<Arc<str>>) -> impl Stream<Item = Result<Event, Infallible>> {
    futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(body) => return Some((Ok(Event::default().event("jobs.events").data(body.as_ref())), rx)),
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    })
}

/// Subscribes to the bus's `jobs.events` subject and rebroadcasts every
/// payload as UTF-8 text to local SSE clients. Runs until the bus
/// subscription ends or `token` is cancelled.
pub async fn bridge(bus: Arc<dyn mf_bus::Bus>, events_tx: broadcast::Sender<Arc<str>>, token: tokio_util::sync::CancellationToken) {
    let mut subscription = match bus.subscribe(BRIDGED_SUBJECT).await {
        Ok(s) => s,
        Err(e) => {
            tracing::error!(error = %e, "sse bridge: failed to subscribe to jobs.events");
            return;
        }
    };

    loop {
        let message = tokio::select! {
            message = subscription.next() => message,
            _ = token.cancelled() => break,
        };
        let Some(message) = message else { break };
        if let Ok(text) = String::from_utf8(message.payload) {
            // No receivers is not an error: it just means no SSE client is
            // currently connected.
            let _ = events_tx.send(text.into());
        }
    }
}
