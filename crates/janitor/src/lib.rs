// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Periodic reconciliation: the janitor sweeps stale workers, finished
//! jobs, orphaned tasks and old audit log entries off the store. It owns
//! no state of its own and talks to nothing but the store, so a crash
//! mid-sweep just means the next tick picks up wherever the data is.
//!
//! Each step is independent: one step's store error is logged and the
//! sweep moves on to the next, per spec — a Postgres hiccup while deleting
//! audit logs must not stop stale workers from being reaped.

use std::sync::Arc;
use std::time::Duration as StdDuration;

use chrono::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use mf_core::clock::Clock;
use mf_core::model::{JobStatus, Notification, Worker, WorkerStatus};
use mf_store::Store;

/// Tunables for a sweep. Defaults match spec.md §4.8.
#[derive(Debug, Clone, Copy)]
pub struct JanitorConfig {
    /// How often the janitor ticks.
    pub cadence: StdDuration,
    /// A worker with no heartbeat older than this is marked unhealthy.
    pub worker_health_threshold: Duration,
    /// A worker unhealthy for longer than this is deleted outright.
    pub worker_grace_period: Duration,
    pub completed_job_retention: Duration,
    pub failed_job_retention: Duration,
    pub audit_log_retention: Duration,
}

impl Default for JanitorConfig {
    fn default() -> Self {
        Self {
            cadence: StdDuration::from_secs(30),
            worker_health_threshold: Duration::seconds(30),
            worker_grace_period: Duration::minutes(5),
            completed_job_retention: Duration::days(7),
            failed_job_retention: Duration::days(30),
            audit_log_retention: Duration::days(90),
        }
    }
}

/// Counts from one sweep, mostly useful for tests and startup logging.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub newly_unhealthy_workers: usize,
    pub completed_jobs_deleted: u64,
    pub failed_jobs_deleted: u64,
    pub orphaned_tasks_deleted: u64,
    pub audit_logs_deleted: u64,
    pub workers_deleted: u64,
}

pub struct Janitor<C: Clock> {
    store: Arc<dyn Store>,
    clock: C,
    config: JanitorConfig,
}

impl<C: Clock> Janitor<C> {
    pub fn new(store: Arc<dyn Store>, clock: C, config: JanitorConfig) -> Self {
        Self { store, clock, config }
    }

    /// Spawn the periodic sweep loop. Stops when `token` is cancelled.
    pub fn spawn(self: Arc<Self>, token: CancellationToken) -> tokio::task::JoinHandle<()>
    where
        C: 'static,
    {
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(self.config.cadence);
            loop {
                tokio::select! {
                    _ = interval.tick() => {
                        let report = self.run_once().await;
                        info!(?report, "janitor sweep complete");
                    }
                    _ = token.cancelled() => {
                        info!("janitor shutting down");
                        break;
                    }
                }
            }
        })
    }

    /// Run one sweep. Never returns an error: every step is best-effort
    /// and logs its own failure independently.
    pub async fn run_once(&self) -> SweepReport {
        let mut report = SweepReport::default();

        report.newly_unhealthy_workers = self.mark_unhealthy_workers().await;
        report.completed_jobs_deleted = self.delete_finished_jobs(JobStatus::Completed, self.config.completed_job_retention).await;
        report.failed_jobs_deleted = self.delete_finished_jobs(JobStatus::Failed, self.config.failed_job_retention).await;
        report.orphaned_tasks_deleted = self.delete_orphaned_tasks().await;
        report.audit_logs_deleted = self.delete_old_audit_logs().await;
        report.workers_deleted = self.delete_long_unhealthy_workers().await;

        report
    }

    async fn mark_unhealthy_workers(&self) -> usize {
        let cutoff = self.clock.utc_now() - self.config.worker_health_threshold;
        let stale = match self.store.list_workers_last_seen_before(cutoff).await {
            Ok(w) => w,
            Err(e) => {
                error!(error = %e, "janitor: failed to list stale workers");
                return 0;
            }
        };

        let mut newly_unhealthy = 0;
        for worker in stale {
            if worker.status == WorkerStatus::Offline {
                continue;
            }
            newly_unhealthy += 1;
            self.notify_worker_unhealthy(&worker).await;
            let mut worker = worker;
            worker.status = WorkerStatus::Offline;
            if let Err(e) = self.store.upsert_worker(worker).await {
                error!(error = %e, "janitor: failed to mark worker unhealthy");
            }
        }
        newly_unhealthy
    }

    async fn notify_worker_unhealthy(&self, worker: &Worker) {
        let notification = Notification::new(
            None,
            "worker_unhealthy",
            format!("worker {} has not sent a heartbeat since {}", worker.id, worker.last_seen_at),
            self.clock.utc_now(),
        );
        if let Err(e) = self.store.append_notification(notification).await {
            warn!(error = %e, worker_id = %worker.id, "janitor: failed to record worker-unhealthy notification");
        }
    }

    async fn delete_finished_jobs(&self, status: JobStatus, retention: Duration) -> u64 {
        let cutoff = self.clock.utc_now() - retention;
        match self.store.delete_jobs_in_status_finished_before(status, cutoff).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, %status, "janitor: failed to delete finished jobs");
                0
            }
        }
    }

    async fn delete_orphaned_tasks(&self) -> u64 {
        let orphans = match self.store.list_orphaned_tasks().await {
            Ok(tasks) => tasks,
            Err(e) => {
                error!(error = %e, "janitor: failed to list orphaned tasks");
                return 0;
            }
        };
        if orphans.is_empty() {
            return 0;
        }
        let ids: Vec<_> = orphans.iter().map(|t| t.id).collect();
        match self.store.delete_tasks(&ids).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "janitor: failed to delete orphaned tasks");
                0
            }
        }
    }

    async fn delete_old_audit_logs(&self) -> u64 {
        let cutoff = self.clock.utc_now() - self.config.audit_log_retention;
        match self.store.delete_audit_older_than(cutoff).await {
            Ok(n) => n,
            Err(e) => {
                error!(error = %e, "janitor: failed to delete old audit logs");
                0
            }
        }
    }

    async fn delete_long_unhealthy_workers(&self) -> u64 {
        let cutoff = self.clock.utc_now() - self.config.worker_grace_period;
        let stale = match self.store.list_workers_last_seen_before(cutoff).await {
            Ok(w) => w,
            Err(e) => {
                error!(error = %e, "janitor: failed to list long-unhealthy workers");
                return 0;
            }
        };
        let mut deleted = 0;
        for worker in stale {
            match self.store.delete_worker(&worker.id).await {
                Ok(()) => deleted += 1,
                Err(e) => error!(error = %e, worker_id = %worker.id, "janitor: failed to delete worker"),
            }
        }
        deleted
    }
}

#[cfg(test)]
#[path = "lib_tests.rs"]
mod tests;
