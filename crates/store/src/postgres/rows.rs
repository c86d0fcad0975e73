// SPDX-License-Identifier: MIT

//! `sqlx::FromRow` row types and their conversions to/from the domain model.
//! Kept separate from the model so `mf-core` never depends on `sqlx`.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use mf_core::model::{
    AuditLogEntry, ErrorEvent, ErrorEventId, Job, JobId, JobLog, JobLogId, JobStatus, LogLevel, Notification,
    NotificationId, Severity, SourceType, Task, TaskId, TaskStatus, TaskType, Webhook, WebhookId, Worker,
    WorkerId, WorkerStatus,
};

macro_rules! enum_sql_str {
    ($ty:ty { $( $variant:ident <=> $str:expr ),+ $(,)? }) => {
        impl $ty {
            pub(crate) fn as_sql(&self) -> &'static str {
                match self {
                    $( Self::$variant => $str, )+
                }
            }

            pub(crate) fn from_sql(s: &str) -> Option<Self> {
                match s {
                    $( $str => Some(Self::$variant), )+
                    _ => None,
                }
            }
        }
    };
}

enum_sql_str!(JobStatus {
    Queued <=> "queued",
    Processing <=> "processing",
    Stitching <=> "stitching",
    Completed <=> "completed",
    Failed <=> "failed",
    Cancelled <=> "cancelled",
});

enum_sql_str!(SourceType {
    Url <=> "url",
    Upload <=> "upload",
    Stream <=> "stream",
    Restream <=> "restream",
});

enum_sql_str!(TaskType {
    Probe <=> "probe",
    Transcode <=> "transcode",
    Stitch <=> "stitch",
    Restream <=> "restream",
    Manifest <=> "manifest",
});

enum_sql_str!(TaskStatus {
    Pending <=> "pending",
    Assigned <=> "assigned",
    Completed <=> "completed",
    Failed <=> "failed",
    Cancelled <=> "cancelled",
});

enum_sql_str!(LogLevel {
    Debug <=> "debug",
    Info <=> "info",
    Warn <=> "warn",
    Error <=> "error",
});

enum_sql_str!(Severity {
    Warning <=> "warning",
    Error <=> "error",
    Critical <=> "critical",
    Fatal <=> "fatal",
});

enum_sql_str!(WorkerStatus {
    Idle <=> "idle",
    Busy <=> "busy",
    Offline <=> "offline",
});

#[derive(Debug, sqlx::FromRow)]
pub struct JobRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub source_url: String,
    pub source_type: String,
    pub profiles: serde_json::Value,
    pub status: String,
    pub progress_pct: i16,
    pub eta_seconds: Option<i64>,
    pub error_message: Option<String>,
    pub assigned_worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<JobRow> for Job {
    type Error = crate::error::StoreError;

    fn try_from(row: JobRow) -> Result<Self, Self::Error> {
        Ok(Job {
            id: JobId::from_uuid(row.id),
            user_id: row.user_id,
            source_url: row.source_url,
            source_type: SourceType::from_sql(&row.source_type)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown source_type {:?}", row.source_type)))?,
            profiles: serde_json::from_value(row.profiles).unwrap_or_default(),
            status: JobStatus::from_sql(&row.status)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown job status {:?}", row.status)))?,
            progress_pct: row.progress_pct.clamp(0, 100) as u8,
            eta_seconds: row.eta_seconds,
            error_message: row.error_message,
            assigned_worker_id: row.assigned_worker_id,
            created_at: row.created_at,
            started_at: row.started_at,
            finished_at: row.finished_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Job> for JobRow {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id.as_uuid(),
            user_id: job.user_id,
            source_url: job.source_url.clone(),
            source_type: job.source_type.as_sql().to_string(),
            profiles: serde_json::to_value(&job.profiles).unwrap_or_default(),
            status: job.status.as_sql().to_string(),
            progress_pct: job.progress_pct as i16,
            eta_seconds: job.eta_seconds,
            error_message: job.error_message.clone(),
            assigned_worker_id: job.assigned_worker_id.clone(),
            created_at: job.created_at,
            started_at: job.started_at,
            finished_at: job.finished_at,
            updated_at: job.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct TaskRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub kind: String,
    pub status: String,
    pub sequence_index: i32,
    pub params: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub output_key: Option<String>,
    pub worker_id: Option<String>,
    pub attempt_count: i32,
    pub progress_pct: i16,
    pub start_time_sec: Option<f64>,
    pub end_time_sec: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = crate::error::StoreError;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        Ok(Task {
            id: TaskId::from_uuid(row.id),
            job_id: JobId::from_uuid(row.job_id),
            kind: TaskType::from_sql(&row.kind)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown task kind {:?}", row.kind)))?,
            status: TaskStatus::from_sql(&row.status)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown task status {:?}", row.status)))?,
            sequence_index: row.sequence_index,
            params: row.params,
            result: row.result,
            output_key: row.output_key,
            worker_id: row.worker_id,
            attempt_count: row.attempt_count.max(0) as u32,
            progress_pct: row.progress_pct.clamp(0, 100) as u8,
            start_time_sec: row.start_time_sec,
            end_time_sec: row.end_time_sec,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Task> for TaskRow {
    fn from(task: &Task) -> Self {
        Self {
            id: task.id.as_uuid(),
            job_id: task.job_id.as_uuid(),
            kind: task.kind.as_sql().to_string(),
            status: task.status.as_sql().to_string(),
            sequence_index: task.sequence_index,
            params: task.params.clone(),
            result: task.result.clone(),
            output_key: task.output_key.clone(),
            worker_id: task.worker_id.clone(),
            attempt_count: task.attempt_count as i32,
            progress_pct: task.progress_pct as i16,
            start_time_sec: task.start_time_sec,
            end_time_sec: task.end_time_sec,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct JobLogRow {
    pub id: Uuid,
    pub job_id: Uuid,
    pub level: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<JobLogRow> for JobLog {
    type Error = crate::error::StoreError;

    fn try_from(row: JobLogRow) -> Result<Self, Self::Error> {
        Ok(JobLog {
            id: JobLogId::from_uuid(row.id),
            job_id: JobId::from_uuid(row.job_id),
            level: LogLevel::from_sql(&row.level)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown log level {:?}", row.level)))?,
            message: row.message,
            created_at: row.created_at,
        })
    }
}

impl From<&JobLog> for JobLogRow {
    fn from(log: &JobLog) -> Self {
        Self {
            id: log.id.as_uuid(),
            job_id: log.job_id.as_uuid(),
            level: log.level.as_sql().to_string(),
            message: log.message.clone(),
            created_at: log.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct WorkerRow {
    pub id: String,
    pub hostname: String,
    pub version: String,
    pub status: String,
    pub capabilities: serde_json::Value,
    pub capacity: serde_json::Value,
    pub last_seen_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

impl TryFrom<WorkerRow> for Worker {
    type Error = crate::error::StoreError;

    fn try_from(row: WorkerRow) -> Result<Self, Self::Error> {
        Ok(Worker {
            id: WorkerId::new(row.id),
            hostname: row.hostname,
            version: row.version,
            status: WorkerStatus::from_sql(&row.status)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown worker status {:?}", row.status)))?,
            capabilities: serde_json::from_value(row.capabilities).unwrap_or_default(),
            capacity: row.capacity,
            last_seen_at: row.last_seen_at,
            registered_at: row.registered_at,
        })
    }
}

impl From<&Worker> for WorkerRow {
    fn from(worker: &Worker) -> Self {
        Self {
            id: worker.id.as_str().to_string(),
            hostname: worker.hostname.clone(),
            version: worker.version.clone(),
            status: worker.status.as_sql().to_string(),
            capabilities: serde_json::to_value(&worker.capabilities).unwrap_or_default(),
            capacity: worker.capacity.clone(),
            last_seen_at: worker.last_seen_at,
            registered_at: worker.registered_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct WebhookRow {
    pub id: Uuid,
    pub user_id: Uuid,
    pub url: String,
    pub secret: Option<String>,
    pub events: serde_json::Value,
    pub is_active: bool,
    pub failure_count: i32,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl TryFrom<WebhookRow> for Webhook {
    type Error = crate::error::StoreError;

    fn try_from(row: WebhookRow) -> Result<Self, Self::Error> {
        Ok(Webhook {
            id: WebhookId::from_uuid(row.id),
            user_id: row.user_id,
            url: row.url,
            secret: row.secret,
            events: serde_json::from_value(row.events).unwrap_or_default(),
            is_active: row.is_active,
            failure_count: row.failure_count.max(0) as u32,
            last_triggered_at: row.last_triggered_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

impl From<&Webhook> for WebhookRow {
    fn from(webhook: &Webhook) -> Self {
        Self {
            id: webhook.id.as_uuid(),
            user_id: webhook.user_id,
            url: webhook.url.clone(),
            secret: webhook.secret.clone(),
            events: serde_json::to_value(&webhook.events).unwrap_or_default(),
            is_active: webhook.is_active,
            failure_count: webhook.failure_count as i32,
            last_triggered_at: webhook.last_triggered_at,
            created_at: webhook.created_at,
            updated_at: webhook.updated_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct AuditRow {
    pub id: Uuid,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl From<AuditRow> for AuditLogEntry {
    fn from(row: AuditRow) -> Self {
        AuditLogEntry {
            id: mf_core::model::AuditLogId::from_uuid(row.id),
            actor: row.actor,
            action: row.action,
            resource: row.resource,
            metadata: row.metadata,
            created_at: row.created_at,
        }
    }
}

impl From<&AuditLogEntry> for AuditRow {
    fn from(entry: &AuditLogEntry) -> Self {
        Self {
            id: entry.id.as_uuid(),
            actor: entry.actor.clone(),
            action: entry.action.clone(),
            resource: entry.resource.clone(),
            metadata: entry.metadata.clone(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl From<NotificationRow> for Notification {
    fn from(row: NotificationRow) -> Self {
        Notification {
            id: NotificationId::from_uuid(row.id),
            user_id: row.user_id,
            kind: row.kind,
            message: row.message,
            created_at: row.created_at,
        }
    }
}

impl From<&Notification> for NotificationRow {
    fn from(entry: &Notification) -> Self {
        Self {
            id: entry.id.as_uuid(),
            user_id: entry.user_id,
            kind: entry.kind.clone(),
            message: entry.message.clone(),
            created_at: entry.created_at,
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
pub struct ErrorEventRow {
    pub id: Uuid,
    pub source_component: String,
    pub severity: String,
    pub message: String,
    pub stack_trace: Option<String>,
    pub context_data: Option<serde_json::Value>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl TryFrom<ErrorEventRow> for ErrorEvent {
    type Error = crate::error::StoreError;

    fn try_from(row: ErrorEventRow) -> Result<Self, Self::Error> {
        Ok(ErrorEvent {
            id: ErrorEventId::from_uuid(row.id),
            source_component: row.source_component,
            severity: Severity::from_sql(&row.severity)
                .ok_or_else(|| crate::error::StoreError::Conflict(format!("unknown severity {:?}", row.severity)))?,
            message: row.message,
            stack_trace: row.stack_trace,
            context_data: row.context_data,
            resolved: row.resolved,
            created_at: row.created_at,
        })
    }
}

impl From<&ErrorEvent> for ErrorEventRow {
    fn from(entry: &ErrorEvent) -> Self {
        Self {
            id: entry.id.as_uuid(),
            source_component: entry.source_component.clone(),
            severity: entry.severity.as_sql().to_string(),
            message: entry.message.clone(),
            stack_trace: entry.stack_trace.clone(),
            context_data: entry.context_data.clone(),
            resolved: entry.resolved,
            created_at: entry.created_at,
        }
    }
}
