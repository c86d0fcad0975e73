// SPDX-License-Identifier: MIT

//! Wire-level message shapes exchanged over the bus.
//!
//! These are distinct from the [`crate::model`] entities: a model type is
//! what gets persisted, a wire type is what gets published. The two overlap
//! in content but not in lifecycle — a [`TaskEventMessage`] is ephemeral and
//! never stored as-is, while a [`Task`][crate::model::Task] is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::{job::JobId, task::TaskId, worker::WorkerId, ErrorEventId, Severity};

/// Subject names used across the bus. Centralized so a typo doesn't
/// silently create an unsubscribed-to subject.
pub mod subjects {
    pub const JOBS_DISPATCH: &str = "jobs.dispatch";
    pub const JOBS_EVENTS: &str = "jobs.events";
    pub const EVENTS_ERROR: &str = "events.error";
    pub const WORKERS_HEARTBEAT: &str = "workers.heartbeat";
    pub const AUDIT_PREFIX: &str = "audit.";
    pub const LIVE_TELEMETRY_PREFIX: &str = "live.telemetry.";
    pub const LIVE_LIFECYCLE_PREFIX: &str = "live.lifecycle.";
}

/// Published to `jobs.dispatch` (WORK) when a task is ready for a worker to claim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEnvelope {
    pub task_id: TaskId,
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub kind: String,
    pub params: serde_json::Value,
    pub sequence_index: i32,
}

/// The kind of update a worker reports about a task it's executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskEventKind {
    Progress,
    Log,
    Completed,
    Failed,
}

crate::simple_display! {
    TaskEventKind {
        Progress => "progress",
        Log => "log",
        Completed => "completed",
        Failed => "failed",
    }
}

/// Published to `jobs.events` (EVENTS, fan-out) by a worker reporting on a
/// task it owns. `result` is present only for `completed`/`failed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskEventMessage {
    pub task_id: TaskId,
    pub job_id: JobId,
    pub event: TaskEventKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub progress_pct: Option<u8>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<serde_json::Value>,
}

/// Published to `workers.heartbeat` every heartbeat interval.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HeartbeatMessage {
    pub worker_id: WorkerId,
    pub hostname: String,
    pub version: String,
    pub status: String,
    pub capabilities: Vec<String>,
    pub capacity: serde_json::Value,
    pub timestamp: DateTime<Utc>,
}

/// Published to `events.error` by any component reporting an internal fault.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEventMessage {
    pub id: ErrorEventId,
    pub source_component: String,
    pub severity: Severity,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stack_trace: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub context_data: Option<serde_json::Value>,
    pub timestamp: DateTime<Utc>,
}

/// Published to `audit.<action>`; intentionally loose-shaped, matching the
/// free-form audit trail the store's audit log persists verbatim.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditMessage {
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Lifecycle event for an in-progress live stream, published to
/// `live.lifecycle.<stream_id>`.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LiveLifecycleMessage {
    StreamStarted { stream_id: String, user_id: uuid::Uuid, source_url: String },
    StreamEnded { stream_id: String, user_id: uuid::Uuid, recording_key: Option<String> },
}

/// Telemetry sample for an in-progress live stream, published to
/// `live.telemetry.<stream_id>`. The daemon does not act on these directly;
/// they exist for downstream dashboards/consumers (LIVE, ephemeral).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveTelemetryMessage {
    pub stream_id: String,
    pub bitrate_kbps: u32,
    pub viewer_count: u32,
    pub timestamp: DateTime<Utc>,
}

#[cfg(test)]
#[path = "wire_tests.rs"]
mod tests;
