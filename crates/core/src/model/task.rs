// SPDX-License-Identifier: MIT

//! Task identifier, type, status, and the typed parameter/result views that
//! travel inside a task's JSON `params`/`result` columns.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::job::JobId;

crate::define_uuid_id! {
    /// Unique identifier for a task instance.
    pub struct TaskId;
}

/// The unit of work a worker picks up off the work queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskType {
    Probe,
    Transcode,
    Stitch,
    Restream,
    Manifest,
}

crate::simple_display! {
    TaskType {
        Probe => "probe",
        Transcode => "transcode",
        Stitch => "stitch",
        Restream => "restream",
        Manifest => "manifest",
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    Pending,
    Assigned,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    TaskStatus {
        Pending => "pending",
        Assigned => "assigned",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl TaskStatus {
    pub fn is_terminal(self) -> bool {
        matches!(self, TaskStatus::Completed | TaskStatus::Failed | TaskStatus::Cancelled)
    }
}

/// A task belonging to a job. `sequence_index` is `-1` for tasks that are not
/// part of a segmented transcode (probe, stitch, restream, manifest); for
/// segment transcodes it is the segment's position in the source timeline.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: TaskId,
    pub job_id: JobId,
    #[serde(rename = "type")]
    pub kind: TaskType,
    pub status: TaskStatus,
    pub sequence_index: i32,
    pub params: serde_json::Value,
    pub result: Option<serde_json::Value>,
    pub output_key: Option<String>,
    pub worker_id: Option<String>,
    pub attempt_count: u32,
    pub progress_pct: u8,
    pub start_time_sec: Option<f64>,
    pub end_time_sec: Option<f64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Sentinel `sequence_index` for tasks that aren't a segment of a split transcode.
pub const NO_SEQUENCE: i32 = -1;

impl Task {
    pub fn new(job_id: JobId, kind: TaskType, sequence_index: i32, params: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id: TaskId::new(),
            job_id,
            kind,
            status: TaskStatus::Pending,
            sequence_index,
            params,
            result: None,
            output_key: None,
            worker_id: None,
            attempt_count: 0,
            progress_pct: 0,
            start_time_sec: None,
            end_time_sec: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_segment(&self) -> bool {
        self.sequence_index != NO_SEQUENCE
    }

    pub fn assign(&mut self, worker_id: String, now: DateTime<Utc>) {
        self.status = TaskStatus::Assigned;
        self.worker_id = Some(worker_id);
        self.attempt_count += 1;
        self.updated_at = now;
    }

    pub fn set_progress(&mut self, pct: u8, now: DateTime<Utc>) {
        self.progress_pct = pct.min(100);
        self.updated_at = now;
    }

    pub fn complete(&mut self, result: serde_json::Value, output_key: Option<String>, now: DateTime<Utc>) {
        self.status = TaskStatus::Completed;
        self.progress_pct = 100;
        self.result = Some(result);
        self.output_key = output_key;
        self.updated_at = now;
    }

    pub fn fail(&mut self, now: DateTime<Utc>) {
        self.status = TaskStatus::Failed;
        self.updated_at = now;
    }
}

/// Parameters for a `probe` task: inspect the source to learn duration/codecs.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeParams {
    pub source_key: String,
}

/// Result of a `probe` task, used by the orchestrator to plan segmentation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProbeResult {
    pub duration_sec: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub width: u32,
    pub height: u32,
    /// Keyframe (IDR) offsets in seconds, ascending; used to snap segment
    /// boundaries so each segment starts on a keyframe.
    pub keyframe_offsets_sec: Vec<f64>,
}

/// Parameters for a `transcode` task: encode `[start_time, start_time +
/// duration)` of `input_url` into `output_url` with the named profile's
/// settings already resolved into concrete encoder flags.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeParams {
    pub input_url: String,
    pub output_url: String,
    pub start_time: f64,
    pub duration: f64,
    pub video_codec: String,
    pub audio_codec: String,
    pub width: u32,
    pub height: u32,
    pub bitrate_kbps: u32,
    pub preset: String,
    pub container: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranscodeResult {
    pub output_key: String,
    pub duration_sec: f64,
    pub size_bytes: u64,
}

/// Parameters for a `stitch` task: concatenate completed segment outputs, in
/// `sequence_index` order, into one final asset at `output_url`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchParams {
    pub output_url: String,
    pub segment_output_keys: Vec<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StitchResult {
    pub output_key: String,
    pub duration_sec: f64,
    pub size_bytes: u64,
}

#[cfg(test)]
#[path = "task_tests.rs"]
mod tests;
