// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Bundles the three fan-out subscribers that keep the control plane's view
//! of the world current: worker heartbeats, task/error events, and
//! live-stream lifecycle hooks. Grouped into one crate the way the
//! teacher's daemon groups its own socket-listener submodules, since all
//! three are the same shape (subscribe, decode, act, repeat) and share no
//! state beyond the bus and store they're handed.

mod events;
mod heartbeat;
mod live;

use std::sync::Arc;

use mf_bus::Bus;
use mf_orchestrator::Orchestrator;
use mf_store::Store;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

/// Spawns all three subscriber loops and returns their join handles so the
/// daemon can await a clean shutdown. Each loop runs until its subscription
/// ends or `token` is cancelled and the bus is torn down out from under it;
/// none of the three depends on the others staying up.
pub fn spawn_all(bus: Arc<dyn Bus>, store: Arc<dyn Store>, orchestrator: Arc<Orchestrator>, token: CancellationToken) -> Vec<JoinHandle<()>> {
    vec![
        spawn_cancellable(token.clone(), heartbeat::run(bus.clone(), store.clone())),
        spawn_cancellable(token.clone(), events::run_task_events(bus.clone(), orchestrator.clone())),
        spawn_cancellable(token.clone(), events::run_error_events(bus.clone(), store)),
        spawn_cancellable(token, live::run(bus, orchestrator)),
    ]
}

fn spawn_cancellable<F>(token: CancellationToken, fut: F) -> JoinHandle<()>
where
    F: std::future::Future<Output = ()> + Send + 'static,
{
    tokio::spawn(async move {
        tokio::select! {
            _ = fut => {}
            _ = token.cancelled() => {}
        }
    })
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
