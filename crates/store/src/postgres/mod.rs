// SPDX-License-Identifier: MIT

//! Postgres-backed [`crate::traits::Store`], behind the `postgres` feature.

mod rows;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
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
use rows::{AuditRow, ErrorEventRow, JobLogRow, JobRow, NotificationRow, TaskRow, WebhookRow, WorkerRow};

#[derive(Clone)]
pub struct PostgresStore {
    pool: PgPool,
}

impl PostgresStore {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        let pool = PgPool::connect(database_url).await?;
        Ok(Self { pool })
    }

    /// Run the embedded schema migrations. Safe to call on every startup.
    pub async fn migrate(&self) -> Result<(), StoreError> {
        sqlx::migrate!("./migrations")
            .run(&self.pool)
            .await
            .map_err(|e| StoreError::Backend(Box::new(e)))
    }
}

#[async_trait]
impl JobStore for PostgresStore {
    async fn create_job(&self, job: Job) -> Result<Job, StoreError> {
        let row = JobRow::from(&job);
        sqlx::query(
            "INSERT INTO jobs (id, user_id, source_url, source_type, profiles, status, progress_pct, \
             eta_seconds, error_message, assigned_worker_id, created_at, started_at, finished_at, updated_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.source_url)
        .bind(row.source_type)
        .bind(row.profiles)
        .bind(row.status)
        .bind(row.progress_pct)
        .bind(row.eta_seconds)
        .bind(row.error_message)
        .bind(row.assigned_worker_id)
        .bind(row.created_at)
        .bind(row.started_at)
        .bind(row.finished_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(job)
    }

    async fn get_job(&self, id: JobId) -> Result<Job, StoreError> {
        let row: JobRow = sqlx::query_as("SELECT * FROM jobs WHERE id = $1")
            .bind(id.as_uuid())
            .fetch_one(&self.pool)
            .await?;
        Job::try_from(row)
    }

    async fn list_jobs(&self, filter: JobFilter, page: Page) -> Result<Vec<Job>, StoreError> {
        let rows: Vec<JobRow> = sqlx::query_as(
            "SELECT * FROM jobs \
             WHERE ($1::uuid IS NULL OR user_id = $1) AND ($2::text IS NULL OR status = $2) \
             ORDER BY created_at ASC OFFSET $3 LIMIT $4",
        )
        .bind(filter.user_id)
        .bind(filter.status.map(|s| s.to_string()))
        .bind(page.offset as i64)
        .bind(page.limit as i64)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(Job::try_from).collect()
    }

    async fn update_job(&self, job: Job) -> Result<Job, StoreError> {
        let row = JobRow::from(&job);
        let result = sqlx::query(
            "UPDATE jobs SET user_id=$2, source_url=$3, source_type=$4, profiles=$5, status=$6, \
             progress_pct=$7, eta_seconds=$8, error_message=$9, assigned_worker_id=$10, \
             started_at=$11, finished_at=$12, updated_at=$13 WHERE id=$1",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.source_url)
        .bind(row.source_type)
        .bind(row.profiles)
        .bind(row.status)
        .bind(row.progress_pct)
        .bind(row.eta_seconds)
        .bind(row.error_message)
        .bind(row.assigned_worker_id)
        .bind(row.started_at)
        .bind(row.finished_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(job)
    }

    async fn delete_job(&self, id: JobId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl TaskStore for PostgresStore {
    async fn create_tasks(&self, tasks: Vec<Task>) -> Result<Vec<Task>, StoreError> {
        let mut tx = self.pool.begin().await?;
        for task in &tasks {
            let row = TaskRow::from(task);
            sqlx::query(
                "INSERT INTO tasks (id, job_id, kind, status, sequence_index, params, result, \
                 output_key, worker_id, attempt_count, progress_pct, start_time_sec, end_time_sec, created_at, updated_at) \
                 VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10,$11,$12,$13,$14,$15)",
            )
            .bind(row.id)
            .bind(row.job_id)
            .bind(row.kind)
            .bind(row.status)
            .bind(row.sequence_index)
            .bind(row.params)
            .bind(row.result)
            .bind(row.output_key)
            .bind(row.worker_id)
            .bind(row.attempt_count)
            .bind(row.progress_pct)
            .bind(row.start_time_sec)
            .bind(row.end_time_sec)
            .bind(row.created_at)
            .bind(row.updated_at)
            .execute(&mut *tx)
            .await?;
        }
        tx.commit().await?;
        Ok(tasks)
    }

    async fn get_task(&self, id: TaskId) -> Result<Task, StoreError> {
        let row: TaskRow = sqlx::query_as("SELECT * FROM tasks WHERE id = $1").bind(id.as_uuid()).fetch_one(&self.pool).await?;
        Task::try_from(row)
    }

    async fn list_tasks_for_job(&self, job_id: JobId) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> = sqlx::query_as("SELECT * FROM tasks WHERE job_id = $1 ORDER BY sequence_index ASC")
            .bind(job_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn update_task(&self, task: Task) -> Result<Task, StoreError> {
        let row = TaskRow::from(&task);
        let result = sqlx::query(
            "UPDATE tasks SET status=$2, result=$3, output_key=$4, worker_id=$5, attempt_count=$6, \
             progress_pct=$7, start_time_sec=$8, end_time_sec=$9, updated_at=$10 WHERE id=$1",
        )
        .bind(row.id)
        .bind(row.status)
        .bind(row.result)
        .bind(row.output_key)
        .bind(row.worker_id)
        .bind(row.attempt_count)
        .bind(row.progress_pct)
        .bind(row.start_time_sec)
        .bind(row.end_time_sec)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(task)
    }

    async fn delete_tasks_for_job(&self, job_id: JobId) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM tasks WHERE job_id = $1").bind(job_id.as_uuid()).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn list_orphaned_tasks(&self) -> Result<Vec<Task>, StoreError> {
        let rows: Vec<TaskRow> =
            sqlx::query_as("SELECT t.* FROM tasks t LEFT JOIN jobs j ON j.id = t.job_id WHERE j.id IS NULL")
                .fetch_all(&self.pool)
                .await?;
        rows.into_iter().map(Task::try_from).collect()
    }

    async fn delete_tasks(&self, ids: &[TaskId]) -> Result<u64, StoreError> {
        let uuids: Vec<Uuid> = ids.iter().map(|id| id.as_uuid()).collect();
        let result = sqlx::query("DELETE FROM tasks WHERE id = ANY($1)").bind(uuids).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl JobLogStore for PostgresStore {
    async fn append_job_log(&self, entry: JobLog) -> Result<JobLog, StoreError> {
        let row = JobLogRow::from(&entry);
        sqlx::query("INSERT INTO job_logs (id, job_id, level, message, created_at) VALUES ($1,$2,$3,$4,$5)")
            .bind(row.id)
            .bind(row.job_id)
            .bind(row.level)
            .bind(row.message)
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list_job_logs_for_job(&self, job_id: JobId) -> Result<Vec<JobLog>, StoreError> {
        let rows: Vec<JobLogRow> = sqlx::query_as("SELECT * FROM job_logs WHERE job_id = $1 ORDER BY created_at ASC")
            .bind(job_id.as_uuid())
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(JobLog::try_from).collect()
    }
}

#[async_trait]
impl WorkerStore for PostgresStore {
    async fn upsert_worker(&self, worker: Worker) -> Result<Worker, StoreError> {
        let row = WorkerRow::from(&worker);
        sqlx::query(
            "INSERT INTO workers (id, hostname, version, status, capabilities, capacity, last_seen_at, registered_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8) \
             ON CONFLICT (id) DO UPDATE SET hostname=$2, version=$3, status=$4, capabilities=$5, capacity=$6, last_seen_at=$7",
        )
        .bind(row.id)
        .bind(row.hostname)
        .bind(row.version)
        .bind(row.status)
        .bind(row.capabilities)
        .bind(row.capacity)
        .bind(row.last_seen_at)
        .bind(row.registered_at)
        .execute(&self.pool)
        .await?;
        Ok(worker)
    }

    async fn get_worker(&self, id: &WorkerId) -> Result<Worker, StoreError> {
        let row: WorkerRow = sqlx::query_as("SELECT * FROM workers WHERE id = $1").bind(id.as_str()).fetch_one(&self.pool).await?;
        Worker::try_from(row)
    }

    async fn list_workers(&self) -> Result<Vec<Worker>, StoreError> {
        let rows: Vec<WorkerRow> = sqlx::query_as("SELECT * FROM workers").fetch_all(&self.pool).await?;
        rows.into_iter().map(Worker::try_from).collect()
    }

    async fn list_workers_last_seen_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<Worker>, StoreError> {
        let rows: Vec<WorkerRow> = sqlx::query_as("SELECT * FROM workers WHERE last_seen_at < $1").bind(cutoff).fetch_all(&self.pool).await?;
        rows.into_iter().map(Worker::try_from).collect()
    }

    async fn delete_worker(&self, id: &WorkerId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM workers WHERE id = $1").bind(id.as_str()).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl WebhookStore for PostgresStore {
    async fn create_webhook(&self, webhook: Webhook) -> Result<Webhook, StoreError> {
        let row = WebhookRow::from(&webhook);
        sqlx::query(
            "INSERT INTO webhooks (id, user_id, url, secret, events, is_active, failure_count, \
             last_triggered_at, created_at, updated_at) VALUES ($1,$2,$3,$4,$5,$6,$7,$8,$9,$10)",
        )
        .bind(row.id)
        .bind(row.user_id)
        .bind(row.url)
        .bind(row.secret)
        .bind(row.events)
        .bind(row.is_active)
        .bind(row.failure_count)
        .bind(row.last_triggered_at)
        .bind(row.created_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        Ok(webhook)
    }

    async fn get_webhook(&self, id: WebhookId) -> Result<Webhook, StoreError> {
        let row: WebhookRow = sqlx::query_as("SELECT * FROM webhooks WHERE id = $1").bind(id.as_uuid()).fetch_one(&self.pool).await?;
        Webhook::try_from(row)
    }

    async fn list_webhooks_for_user(&self, user_id: Uuid) -> Result<Vec<Webhook>, StoreError> {
        let rows: Vec<WebhookRow> = sqlx::query_as("SELECT * FROM webhooks WHERE user_id = $1").bind(user_id).fetch_all(&self.pool).await?;
        rows.into_iter().map(Webhook::try_from).collect()
    }

    async fn list_active_webhooks_for_event(&self, event: &str) -> Result<Vec<Webhook>, StoreError> {
        let rows: Vec<WebhookRow> = sqlx::query_as("SELECT * FROM webhooks WHERE is_active AND events @> to_jsonb($1::text)")
            .bind(event)
            .fetch_all(&self.pool)
            .await?;
        rows.into_iter().map(Webhook::try_from).collect()
    }

    async fn update_webhook(&self, webhook: Webhook) -> Result<Webhook, StoreError> {
        let row = WebhookRow::from(&webhook);
        let result = sqlx::query(
            "UPDATE webhooks SET url=$2, secret=$3, events=$4, is_active=$5, failure_count=$6, \
             last_triggered_at=$7, updated_at=$8 WHERE id=$1",
        )
        .bind(row.id)
        .bind(row.url)
        .bind(row.secret)
        .bind(row.events)
        .bind(row.is_active)
        .bind(row.failure_count)
        .bind(row.last_triggered_at)
        .bind(row.updated_at)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(webhook)
    }

    async fn delete_webhook(&self, id: WebhookId) -> Result<(), StoreError> {
        let result = sqlx::query("DELETE FROM webhooks WHERE id = $1").bind(id.as_uuid()).execute(&self.pool).await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

#[async_trait]
impl NotificationStore for PostgresStore {
    async fn append_notification(&self, entry: Notification) -> Result<Notification, StoreError> {
        let row = NotificationRow::from(&entry);
        sqlx::query("INSERT INTO notifications (id, user_id, kind, message, created_at) VALUES ($1,$2,$3,$4,$5)")
            .bind(row.id)
            .bind(row.user_id)
            .bind(row.kind)
            .bind(row.message)
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list_notifications_for_user(&self, user_id: Uuid) -> Result<Vec<Notification>, StoreError> {
        let rows: Vec<NotificationRow> = sqlx::query_as("SELECT * FROM notifications WHERE user_id = $1 ORDER BY created_at ASC")
            .bind(user_id)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(Notification::from).collect())
    }
}

#[async_trait]
impl ErrorEventStore for PostgresStore {
    async fn append_error_event(&self, entry: ErrorEvent) -> Result<ErrorEvent, StoreError> {
        let row = ErrorEventRow::from(&entry);
        sqlx::query(
            "INSERT INTO error_events (id, source_component, severity, message, stack_trace, context_data, resolved, created_at) \
             VALUES ($1,$2,$3,$4,$5,$6,$7,$8)",
        )
        .bind(row.id)
        .bind(row.source_component)
        .bind(row.severity)
        .bind(row.message)
        .bind(row.stack_trace)
        .bind(row.context_data)
        .bind(row.resolved)
        .bind(row.created_at)
        .execute(&self.pool)
        .await?;
        Ok(entry)
    }

    async fn list_error_events(&self) -> Result<Vec<ErrorEvent>, StoreError> {
        let rows: Vec<ErrorEventRow> = sqlx::query_as("SELECT * FROM error_events ORDER BY created_at DESC").fetch_all(&self.pool).await?;
        rows.into_iter().map(ErrorEvent::try_from).collect()
    }
}

#[async_trait]
impl AuditStore for PostgresStore {
    async fn append_audit(&self, entry: AuditLogEntry) -> Result<AuditLogEntry, StoreError> {
        let row = AuditRow::from(&entry);
        sqlx::query("INSERT INTO audit_log (id, actor, action, resource, metadata, created_at) VALUES ($1,$2,$3,$4,$5,$6)")
            .bind(row.id)
            .bind(row.actor)
            .bind(row.action)
            .bind(row.resource)
            .bind(row.metadata)
            .bind(row.created_at)
            .execute(&self.pool)
            .await?;
        Ok(entry)
    }

    async fn list_audit_for_resource(&self, resource: &str) -> Result<Vec<AuditLogEntry>, StoreError> {
        let rows: Vec<AuditRow> = sqlx::query_as("SELECT * FROM audit_log WHERE resource = $1 ORDER BY created_at ASC")
            .bind(resource)
            .fetch_all(&self.pool)
            .await?;
        Ok(rows.into_iter().map(AuditLogEntry::from).collect())
    }

    async fn delete_audit_older_than(&self, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM audit_log WHERE created_at < $1").bind(cutoff).execute(&self.pool).await?;
        Ok(result.rows_affected())
    }
}

#[async_trait]
impl GcStore for PostgresStore {
    async fn delete_jobs_in_status_finished_before(&self, status: JobStatus, cutoff: DateTime<Utc>) -> Result<u64, StoreError> {
        let result = sqlx::query("DELETE FROM jobs WHERE status = $1 AND finished_at < $2")
            .bind(status.to_string())
            .bind(cutoff)
            .execute(&self.pool)
            .await?;
        Ok(result.rows_affected())
    }
}
