// SPDX-License-Identifier: MIT

//! In-memory [`Store`](crate::traits::Store) backed by a `RwLock<HashMap>`
//! per aggregate, matching the shape the daemon's materialized state keeps
//! for each entity kind, minus the event log and snapshot/replay machinery:
//! nothing here needs to survive a process restart, so there's nothing to
//! replay.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use uuid::Uuid;

use mf_core::model::{
    AuditLogEntry, ErrorEvent, Job, JobId, JobLog, JobStatus, Notification, Task, TaskId, Webhook, WebhookId,
    Worker, WorkerId,
};

use crate::error::StoreError;
use crate::traits::{
    AuditStore, ErrorEventStore, GcStore, JobFilter, JobLogStore, JobStore, NotificationStore, Page, TaskStore,
    WebhookStore, WorkerStore,
};

#[derive(Default)]
struct Inner {
    jobs: HashMap<JobId, Job>,
    tasks: HashMap<TaskId, Task>,
    job_logs: Vec<JobLog>,
    workers: HashMap<WorkerId, Worker>,
    webhooks: HashMap<WebhookId, Webhook>,
    notifications: Vec<Notification>,
    error_events: Vec<ErrorEvent>,
    audit: Vec<AuditLogEntry>,
}

/// In-memory store for tests and single-node local runs.
#[derive(Clone, Default)]
pub struct InMemoryStore {
    inner: Arc<RwLock<Inner>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl JobStore for InMemoryStore {
    async fn create_job(&self, job: Job) -> Result<Job, StoreError> {
        let mut inner = self.inner.write();
        if inner.jobs.contains_key(&job.id) {
            return Err(StoreError::Conflict(format!("job {} already exists", job.id)));
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        self.inner.read().jobs.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_jobs(&self, filter: JobFilter, page: Page) -> Result<Vec<Job>, StoreError> {
        let inner = self.inner.read();
        let mut jobs: Vec<Job> = inner
            .jobs
            .values()
            .filter(|j| filter.user_id.map(|u| u == j.user_id).unwrap_or(true))
            .filter(|j| filter.status.map(|s| s == j.status).unwrap_or(true))
            .cloned()
            .collect();
        jobs.sort_by_key(|j| j.created_at);
        let start = page.offset as usize;
        Ok(jobs.into_iter().skip(start).take(page.limit as usize).collect())
    }

    async fn update_job(&self, job: Job) -> Result<Job, StoreError> {
        let mut inner = self.inner.write();
        if !inner.jobs.contains_key(&job.id) {
            return Err(StoreError::NotFound);
        }
        inner.jobs.insert(job.id, job.clone());
        Ok(job)
    }

    async fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        self.inner.write().jobs.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl TaskStore for InMemoryStore {
    async fn create_tasks(&self, tasks: Vec<Task>) -> Result<Vec<Task>, StoreError> {
        let mut inner = self.inner.write();
        for task in &tasks {
            inner.tasks.insert(task.id, task.clone());
        }
        Ok(tasks)
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError> {
        self.inner.read().tasks.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_tasks_for_job(&self, job_id: JobId) -> Result<Vec<Task>, StoreError> {
        let mut tasks: Vec<Task> = self.inner.read().tasks.values().filter(|t| t.job_id == job_id).cloned().collect();
        tasks.sort_by_key(|t| t.sequence_index);
        Ok(tasks)
    }

    async fn update_task(&self, task: Task) -> Result<Task, StoreError> {
        let mut inner = self.inner.write();
        if !inner.tasks.contains_key(&task.id) {
            return Err(StoreError::NotFound);
        }
        inner.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn delete_tasks_for_job(&self, job_id: JobId) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.tasks.len();
        inner.tasks.retain(|_, t| t.job_id != job_id);
        Ok((before - inner.tasks.len()) as u64)
    }

    async fn list_orphaned_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let inner = self.inner.read();
        Ok(inner.tasks.values().filter(|t| !inner.jobs.contains_key(&t.job_id)).cloned().collect())
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.tasks.len();
        inner.tasks.retain(|id, _| !ids.contains(id));
        Ok((before - inner.tasks.len()) as u64)
    }
}

#[async_trait]
impl JobLogStore for InMemoryStore {
    async fn append_job_log(&self, entry: JobLog) -> Result<JobLog, StoreError> {
        let mut inner = self.inner.write();
        inner.job_logs.push(entry.clone());
        Ok(entry)
    }

    async fn list_job_logs_for_job(&self, job_id: JobId) -> Result<Vec<JobLog>, StoreError> {
        let mut logs: Vec<JobLog> = self.inner.read().job_logs.iter().filter(|l| l.job_id == job_id).cloned().collect();
        logs.sort_by_key(|l| l.created_at);
        Ok(logs)
    }
}

#[async_trait]
impl WorkerStore for InMemoryStore {
    async fn upsert_worker(&self, worker: Worker) -> Result<Worker, StoreError> {
        let mut inner = self.inner.write();
        inner.workers.insert(worker.id.clone(), worker.clone());
        Ok(worker)
    }

    async fn get_worker(&self, id: &WorkerId) -> Result<Worker, StoreError> {
        self.inner.read().workers.get(id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_workers(&self) -> Result<Vec<Worker>, StoreError> {
        Ok(self.inner.read().workers.values().cloned().collect())
    }

    async fn list_workers_last_seen_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Worker>, StoreError> {
        Ok(self.inner.read().workers.values().filter(|w| w.last_seen_at < cutoff).cloned().collect())
    }

    async fn delete_worker(&self, id: &WorkerId) -> Result<(), StoreError> {
        self.inner.write().workers.remove(id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl WebhookStore for InMemoryStore {
    async fn create_webhook(&self, webhook: Webhook) -> Result<Webhook, StoreError> {
        let mut inner = self.inner.write();
        inner.webhooks.insert(webhook.id, webhook.clone());
        Ok(webhook)
    }

    async fn get_webhook(&self, id: WebhookId) -> Result<Webhook, StoreError> {
        self.inner.read().webhooks.get(&id).cloned().ok_or(StoreError::NotFound)
    }

    async fn list_webhooks_for_user(&self, user_id: Uuid) -> Result<Vec<Webhook>, StoreError> {
        Ok(self.inner.read().webhooks.values().filter(|w| w.user_id == user_id).cloned().collect())
    }

    async fn list_active_webhooks_for_event(&self, event: &str) -> Result<Vec<Webhook>, StoreError> {
        Ok(self.inner.read().webhooks.values().filter(|w| w.is_subscribed_to(event)).cloned().collect())
    }

    async fn update_webhook(&self, webhook: Webhook) -> Result<Webhook, StoreError> {
        let mut inner = self.inner.write();
        if !inner.webhooks.contains_key(&webhook.id) {
            return Err(StoreError::NotFound);
        }
        inner.webhooks.insert(webhook.id, webhook.clone());
        Ok(webhook)
    }

    async fn delete_webhook(&self, id: WebhookId) -> Result<(), StoreError> {
        self.inner.write().webhooks.remove(&id).map(|_| ()).ok_or(StoreError::NotFound)
    }
}

#[async_trait]
impl NotificationStore for InMemoryStore {
    async fn append_notification(&self, entry: Notification) -> Result<Notification, StoreError> {
        let mut inner = self.inner.write();
        inner.notifications.push(entry.clone());
        Ok(entry)
    }

    async fn list_notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        Ok(self
            .inner
            .read()
            .notifications
            .iter()
            .filter(|n| n.user_id == Some(user_id))
            .cloned()
            .collect())
    }
}

#[async_trait]
impl ErrorEventStore for InMemoryStore {
    async fn append_error_event(&self, entry: ErrorEvent) -> Result<ErrorEvent, StoreError> {
        let mut inner = self.inner.write();
        inner.error_events.push(entry.clone());
        Ok(entry)
    }

    async fn list_error_events(&self) -> Result<Vec<ErrorEvent>, StoreError> {
        Ok(self.inner.read().error_events.clone())
    }
}

#[async_trait]
impl AuditStore for InMemoryStore {
    async fn append_audit(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, StoreError> {
        let mut inner = self.inner.write();
        inner.audit.push(entry.clone());
        Ok(entry)
    }

    async fn list_audit_for_resource(&self, resource: &str) -> Result<Vec<AuditLogEntry>, StoreError> {
        Ok(self.inner.read().audit.iter().filter(|e| e.resource == resource).cloned().collect())
    }

    async fn delete_audit_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.audit.len();
        inner.audit.retain(|e| e.created_at >= cutoff);
        Ok((before - inner.audit.len()) as u64)
    }
}

#[async_trait]
impl GcStore for InMemoryStore {
    async fn delete_jobs_in_status_finished_before(&self, status: JobStatus, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let mut inner = self.inner.write();
        let before = inner.jobs.len();
        inner.jobs.retain(|_, j| !(j.status == status && j.finished_at.map(|f| f < cutoff).unwrap_or(false)));
        Ok((before - inner.jobs.len()) as u64)
    }
}

#[cfg(test)]
#[path = "in_memory_tests.rs"]
mod tests;
