// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `mfd`: the control-plane process. Hosts the Orchestrator, the three
//! `mf-listener` subscribers, the webhook manager, the janitor, and a thin
//! HTTP/SSE front-end, all sharing one bus and one store. Spec.md §4, §5,
//! §6 in full.

mod config;
mod error;
mod http;
mod sse;
mod state;

use std::sync::Arc;

use anyhow::{Context, Result};
use mf_bus::{Bus, InMemoryBus, NatsBus};
use mf_core::clock::SystemClock;
use mf_janitor::{Janitor, JanitorConfig};
use mf_orchestrator::Orchestrator;
use mf_store::{InMemoryStore, Store};
use mf_webhook::WebhookManager;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::config::DaemonConfig;
use crate::state::AppState;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = DaemonConfig::from_env();

    let bus: Arc<dyn Bus> = match &config.nats_url {
        Some(url) => match NatsBus::connect(url).await {
            Ok(bus) => Arc::new(bus),
            Err(e) => {
                error!(error = %e, "failed to connect to NATS_URL, falling back to in-process bus");
                Arc::new(InMemoryBus::new())
            }
        },
        None => Arc::new(InMemoryBus::new()),
    };
    bus.init_streams().await.context("initializing bus streams")?;

    let store: Arc<dyn Store> = build_store(&config).await;

    let orchestrator = Arc::new(Orchestrator::new(bus.clone(), store.clone()));
    let token = CancellationToken::new();
    let mut handles = Vec::new();

    handles.extend(mf_listener::spawn_all(bus.clone(), store.clone(), orchestrator.clone(), token.clone()));

    let webhook_manager = Arc::new(WebhookManager::new(bus.clone(), store.clone()));
    handles.push(webhook_manager.spawn(token.clone()));

    let janitor = Arc::new(Janitor::new(store.clone(), SystemClock, JanitorConfig::default()));
    handles.push(janitor.spawn(token.clone()));

    let (events_tx, _rx) = broadcast::channel(sse::CHANNEL_CAPACITY);
    handles.push(tokio::spawn(sse::bridge(bus.clone(), events_tx.clone(), token.clone())));

    let app_state = AppState { orchestrator, store, events_tx };
    let router = http::router(app_state);

    let addr = std::net::SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = tokio::net::TcpListener::bind(addr).await.with_context(|| format!("binding HTTP listener on {addr}"))?;
    info!(%addr, "mfd listening");

    let shutdown_token = token.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        shutdown_token.cancel();
    });

    let serve_token = token.clone();
    let serve_result = axum::serve(listener, router).with_graceful_shutdown(async move { serve_token.cancelled().await }).await;

    token.cancel();
    for handle in handles {
        let _ = handle.await;
    }
    info!("mfd stopped");

    serve_result.context("HTTP server exited with an error")
}

async fn build_store(config: &DaemonConfig) -> Arc<dyn Store> {
    let Some(database_url) = &config.database_url else {
        info!("DATABASE_URL not set, using the in-memory store");
        return Arc::new(InMemoryStore::new());
    };

    match mf_store::PostgresStore::connect(database_url).await {
        Ok(store) => {
            if let Err(e) = store.migrate().await {
                error!(error = %e, "failed to run store migrations");
            }
            Arc::new(store)
        }
        Err(e) => {
            error!(error = %e, "failed to connect to DATABASE_URL, falling back to the in-memory store");
            Arc::new(InMemoryStore::new())
        }
    }
}

#[cfg(unix)]
async fn wait_for_shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};
    #[allow(clippy::expect_used)]
    let mut sigterm = signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
    tokio::select! {
        _ = sigterm.recv() => {}
        _ = tokio::signal::ctrl_c() => {}
    }
}

#[cfg(not(unix))]
async fn wait_for_shutdown_signal() {
    let _ = tokio::signal::ctrl_c().await;
}
