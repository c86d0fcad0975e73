// SPDX-License-Identifier: MIT

//! The `Store` capability: one async trait per aggregate rather than a
//! single monolithic trait, so a component only needs to depend on the
//! slice of persistence it actually uses (the orchestrator never touches
//! webhooks; the webhook dispatcher never touches tasks).

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use mf_core::model::{
    AuditLogEntry, ErrorEvent, Job, JobId, JobLog, JobStatus, Notification, Task, TaskId, Webhook, WebhookId,
    Worker, WorkerId,
};

use crate::error::StoreError;

/// Pagination cursor: offset-based, matching the HTTP surface's `?page=`/`?per_page=`.
#[derive(Debug, Clone, Copy)]
pub struct Page {
    pub offset: u32,
    pub limit: u32,
}

impl Default for Page {
    fn default() -> Self {
        Self { offset: 0, limit: 50 }
    }
}

#[derive(Debug, Clone, Default)]
pub struct JobFilter {
    pub user_id: Option<Uuid>,
    pub status: Option<JobStatus>,
}

#[async_trait]
pub trait JobStore: Send + Sync {
    async fn create_job(&self, job: Job) -> Result<Job, StoreError>;
    async fn get_job(&self, id: JobId) -> Result<Job, StoreError>;
    async fn list_jobs(&self, filter: JobFilter, page: Page) -> Result<Vec<Job>, StoreError>;
    async fn update_job(&self, job: Job) -> Result<Job, StoreError>;
    async fn delete_job(&self, id: JobId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait TaskStore: Send + Sync {
    async fn create_tasks(&self, tasks: Vec<Task>) -> Result<Vec<Task>, StoreError>;
    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError>;
    async fn list_tasks_for_job(&self, job_id: JobId) -> Result<Vec<Task>, StoreError>;
    async fn update_task(&self, task: Task) -> Result<Task, StoreError>;
    async fn delete_tasks_for_job(&self, job_id: JobId) -> Result<u64, StoreError>;
    /// Tasks whose `job_id` no longer resolves to a stored job (a crash
    /// between task creation and job creation, or a job deleted out from
    /// under its tasks).
    async fn list_orphaned_tasks(&self) -> Result<Vec<Task>, StoreError>;
    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<u64, StoreError>;
}

#[async_trait]
pub trait JobLogStore: Send + Sync {
    async fn append_job_log(&self, entry: JobLog) -> Result<JobLog, StoreError>;
    async fn list_job_logs_for_job(&self, job_id: JobId) -> Result<Vec<JobLog>, StoreError>;
}

#[async_trait]
pub trait WorkerStore: Send + Sync {
    /// Insert-or-update by `id`: a worker reconnecting after a restart
    /// reuses its row instead of minting a new one.
    async fn upsert_worker(&self, worker: Worker) -> Result<Worker, StoreError>;
    async fn get_worker(&self, id: &WorkerId) -> Result<Worker, StoreError>;
    async fn list_workers(&self) -> Result<Vec<Worker>, StoreError>;
    async fn list_workers_last_seen_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Worker>, StoreError>;
    async fn delete_worker(&self, id: &WorkerId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait WebhookStore: Send + Sync {
    async fn create_webhook(&self, webhook: Webhook) -> Result<Webhook, StoreError>;
    async fn get_webhook(&self, id: WebhookId) -> Result<Webhook, StoreError>;
    async fn list_webhooks_for_user(&self, user_id: Uuid) -> Result<Vec<Webhook>, StoreError>;
    /// Active webhooks subscribed to `event`, the set a delivery fan-out
    /// needs to notify.
    async fn list_active_webhooks_for_event(&self, event: &str) -> Result<Vec<Webhook>, StoreError>;
    async fn update_webhook(&self, webhook: Webhook) -> Result<Webhook, StoreError>;
    async fn delete_webhook(&self, id: WebhookId) -> Result<(), StoreError>;
}

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn append_notification(&self, entry: Notification) -> Result<Notification, StoreError>;
    async fn list_notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError>;
}

#[async_trait]
pub trait ErrorEventStore: Send + Sync {
    async fn append_error_event(&self, entry: ErrorEvent) -> Result<ErrorEvent, StoreError>;
    async fn list_error_events(&self) -> Result<Vec<ErrorEvent>, StoreError>;
}

#[async_trait]
pub trait AuditStore: Send + Sync {
    async fn append_audit(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, StoreError>;
    async fn list_audit_for_resource(&self, resource: &str) -> Result<Vec<AuditLogEntry>, StoreError>;
    async fn delete_audit_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// Garbage-collection queries the janitor runs on its periodic sweep.
/// Grouped separately from [`JobStore`]/[`TaskStore`]/[`WorkerStore`]
/// because they cut across aggregates and are used by exactly one caller.
#[async_trait]
pub trait GcStore: Send + Sync {
    async fn delete_jobs_in_status_finished_before(&self, status: JobStatus, cutoff: DateTime<Utc>) -> Result<u64, StoreError>;
}

/// The full persistence capability a daemon wires up. Implemented by both
/// [`crate::InMemoryStore`] (tests, local dev) and, behind the `postgres`
/// feature, `PostgresStore`.
pub trait Store:
    JobStore + TaskStore + JobLogStore + WorkerStore + WebhookStore + NotificationStore + ErrorEventStore + AuditStore + GcStore
{
}

impl<T> Store for T where
    T: JobStore + TaskStore + JobLogStore + WorkerStore + WebhookStore + NotificationStore + ErrorEventStore + AuditStore + GcStore
{
}
