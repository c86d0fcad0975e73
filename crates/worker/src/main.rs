// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! `mfworker`: claims tasks off `jobs.dispatch`, executes them, and reports
//! back over the bus. Spec.md §4.4 in full.

mod config;
mod error;
mod handlers;
mod heartbeat;
mod plugin;
mod storage;

use std::sync::Arc;

use anyhow::{Context, Result};
use mf_bus::{subjects, Bus, BusExt, InMemoryBus, NatsBus};
use mf_core::model::{Severity, WorkerId};
use mf_core::wire::{ErrorEventMessage, TaskEnvelope, TaskEventKind, TaskEventMessage};
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use crate::config::WorkerConfig;
use crate::heartbeat::WorkerStatusFlag;
use crate::plugin::PluginRegistry;
use crate::storage::Storage;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt().with_env_filter(tracing_subscriber::EnvFilter::from_default_env()).init();

    let config = WorkerConfig::from_env();
    let worker_id = WorkerId::new(config.worker_id.clone());
    info!(worker_id = %worker_id, "mfworker starting");

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

    let storage = Arc::new(Storage::from_env().await);
    let plugins = Arc::new(PluginRegistry::scan(&config.plugin_dir));

    let mut capabilities = config.capabilities.clone();
    capabilities.extend(plugins.kinds());

    let status = WorkerStatusFlag::new();
    let token = CancellationToken::new();

    let heartbeat_handle = tokio::spawn(heartbeat::run(
        bus.clone(),
        worker_id.clone(),
        gethostname::gethostname().into_string().unwrap_or_else(|_| "unknown".to_string()),
        env!("CARGO_PKG_VERSION").to_string(),
        capabilities,
        serde_json::json!({ "concurrency": 1 }),
        status.clone(),
        config.heartbeat_interval,
        token.clone(),
    ));

    let shutdown_token = token.clone();
    tokio::spawn(async move {
        wait_for_shutdown_signal().await;
        info!("shutdown signal received");
        shutdown_token.cancel();
    });

    run_dispatch_loop(bus.clone(), storage, plugins, status, token.clone()).await;

    token.cancel();
    let _ = heartbeat_handle.await;
    info!("mfworker stopped");
    Ok(())
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

async fn run_dispatch_loop(bus: Arc<dyn Bus>, storage: Arc<Storage>, plugins: Arc<PluginRegistry>, status: Arc<WorkerStatusFlag>, token: CancellationToken) {
    let mut consumer = match bus.consume_work(subjects::JOBS_DISPATCH).await {
        Ok(c) => c,
        Err(e) => {
            error!(error = %e, "failed to join the work queue, worker cannot process tasks");
            return;
        }
    };

    loop {
        let message = tokio::select! {
            message = consumer.next() => message,
            _ = token.cancelled() => break,
        };
        let Some(message) = message else { break };

        let envelope: TaskEnvelope = match message.decode() {
            Ok(e) => e,
            Err(e) => {
                warn!(error = %e, "dropping malformed task envelope, terminating delivery");
                let _ = message.term().await;
                continue;
            }
        };

        status.set_busy(true);
        handle_task(&bus, envelope, message, &storage, &plugins).await;
        status.set_busy(false);
    }
}

async fn handle_task(bus: &Arc<dyn Bus>, envelope: TaskEnvelope, message: Box<dyn mf_bus::WorkMessage>, storage: &Arc<Storage>, plugins: &Arc<PluginRegistry>) {
    let (progress_tx, mut progress_rx) = tokio::sync::mpsc::unbounded_channel::<u8>();
    let progress_bus = bus.clone();
    let task_id = envelope.task_id;
    let job_id = envelope.job_id;
    let progress_forwarder = tokio::spawn(async move {
        while let Some(pct) = progress_rx.recv().await {
            let event = TaskEventMessage { task_id, job_id, event: TaskEventKind::Progress, progress_pct: Some(pct), message: None, result: None };
            if let Err(e) = progress_bus.publish_json(subjects::JOBS_EVENTS, &event).await {
                warn!(error = %e, "failed to publish progress event");
            }
        }
    });

    let kind = envelope.kind.clone();
    let params = envelope.params.clone();
    let storage = storage.clone();
    let plugins = plugins.clone();
    let outcome = tokio::spawn(async move { handlers::dispatch(&kind, params, &storage, &plugins, progress_tx).await }).await;
    drop(progress_forwarder.await);

    match outcome {
        Ok(Ok(outcome)) => {
            let event = TaskEventMessage { task_id, job_id, event: TaskEventKind::Completed, progress_pct: Some(100), message: None, result: Some(outcome.result) };
            publish_event(bus, &event).await;
            if let Err(e) = message.ack().await {
                warn!(error = %e, %task_id, "failed to ack completed task");
            }
        }
        Ok(Err(err)) => {
            warn!(error = %err, %task_id, "task failed");
            let event = TaskEventMessage { task_id, job_id, event: TaskEventKind::Failed, progress_pct: None, message: Some(err.to_string()), result: None };
            publish_event(bus, &event).await;
            if let Err(e) = message.nak().await {
                warn!(error = %e, %task_id, "failed to nak failed task");
            }
        }
        Err(join_err) => {
            error!(error = %join_err, %task_id, "task handler panicked");
            publish_panic(bus, task_id, &join_err).await;
            if let Err(e) = message.term().await {
                warn!(error = %e, %task_id, "failed to term panicked task");
            }
        }
    }
}

async fn publish_event(bus: &Arc<dyn Bus>, event: &TaskEventMessage) {
    if let Err(e) = bus.publish_json(subjects::JOBS_EVENTS, event).await {
        warn!(error = %e, "failed to publish task event");
    }
}

async fn publish_panic(bus: &Arc<dyn Bus>, task_id: mf_core::model::TaskId, join_err: &tokio::task::JoinError) {
    let event = ErrorEventMessage {
        id: mf_core::model::ErrorEventId::new(),
        source_component: "mf-worker".to_string(),
        severity: Severity::Critical,
        message: format!("task {task_id} handler panicked"),
        stack_trace: Some(join_err.to_string()),
        context_data: None,
        timestamp: chrono::Utc::now(),
    };
    if let Err(e) = bus.publish_json(subjects::EVENTS_ERROR, &event).await {
        warn!(error = %e, "failed to publish panic error event");
    }
}
