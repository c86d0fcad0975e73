// SPDX-License-Identifier: MIT

//! Job identifier and status machine.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::define_uuid_id! {
    /// Unique identifier for a job instance.
    pub struct JobId;
}

/// Where the source media comes from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceType {
    Url,
    Upload,
    Stream,
    Restream,
}

crate::simple_display! {
    SourceType {
        Url => "url",
        Upload => "upload",
        Stream => "stream",
        Restream => "restream",
    }
}

/// Status machine: `queued -> processing -> stitching -> completed`, with
/// `processing`/`stitching` able to transition to `failed`/`cancelled`.
/// `completed`/`failed`/`cancelled` are absorbing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Queued,
    Processing,
    Stitching,
    Completed,
    Failed,
    Cancelled,
}

crate::simple_display! {
    JobStatus {
        Queued => "queued",
        Processing => "processing",
        Stitching => "stitching",
        Completed => "completed",
        Failed => "failed",
        Cancelled => "cancelled",
    }
}

impl JobStatus {
    /// Terminal statuses are absorbing: once reached, no further state
    /// transition or progress update may be applied (property 1, spec §8).
    pub fn is_terminal(self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed | JobStatus::Cancelled)
    }
}

/// A single user submission: one source, one or more target encodings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub id: JobId,
    pub user_id: Uuid,
    pub source_url: String,
    pub source_type: SourceType,
    /// Ordered list of profile names; the first is used for the primary encode.
    pub profiles: Vec<String>,
    pub status: JobStatus,
    /// Clamped to `[0, 100]`; `100` iff `status == Completed`.
    pub progress_pct: u8,
    pub eta_seconds: Option<i64>,
    pub error_message: Option<String>,
    pub assigned_worker_id: Option<String>,
    pub created_at: DateTime<Utc>,
    pub started_at: Option<DateTime<Utc>>,
    pub finished_at: Option<DateTime<Utc>>,
    pub updated_at: DateTime<Utc>,
}

impl Job {
    /// Construct a freshly-submitted job: `status = queued`, `progress_pct = 0`.
    pub fn new(
        user_id: Uuid,
        source_url: String,
        source_type: SourceType,
        profiles: Vec<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: JobId::new(),
            user_id,
            source_url,
            source_type,
            profiles,
            status: JobStatus::Queued,
            progress_pct: 0,
            eta_seconds: None,
            error_message: None,
            assigned_worker_id: None,
            created_at: now,
            started_at: None,
            finished_at: None,
            updated_at: now,
        }
    }

    pub fn is_terminal(&self) -> bool {
        self.status.is_terminal()
    }

    /// Move to a non-terminal status, stamping `started_at` the first time
    /// the job leaves `queued`. No-op (besides `updated_at`) if already terminal.
    pub fn advance(&mut self, status: JobStatus, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        if self.started_at.is_none() && !matches!(status, JobStatus::Queued) {
            self.started_at = Some(now);
        }
        self.status = status;
        self.updated_at = now;
    }

    /// Move to a terminal status, stamping `finished_at`. No-op if already terminal.
    pub fn finish(&mut self, status: JobStatus, now: DateTime<Utc>, error_message: Option<String>) {
        if self.is_terminal() {
            return;
        }
        debug_assert!(status.is_terminal(), "finish() requires a terminal status");
        self.status = status;
        self.finished_at = Some(now);
        self.updated_at = now;
        if status == JobStatus::Completed {
            self.progress_pct = 100;
        }
        if error_message.is_some() {
            self.error_message = error_message;
        }
    }

    /// Set progress, clamped to `[0, 100]`. No-op if already terminal.
    pub fn set_progress(&mut self, pct: i64, now: DateTime<Utc>) {
        if self.is_terminal() {
            return;
        }
        self.progress_pct = pct.clamp(0, 100) as u8;
        self.updated_at = now;
    }

    /// The profile to encode with: first in the job's list, or `None` if empty
    /// (callers fall back to [`crate::model::Profile::default_builtin`]).
    pub fn primary_profile(&self) -> Option<&str> {
        self.profiles.first().map(String::as_str)
    }
}

crate::builder! {
    pub struct JobBuilder => Job {
        set {
            user_id: Uuid = Uuid::nil(),
            source_url: String = String::from("https://example.test/source.mp4"),
            source_type: SourceType = SourceType::Url,
            profiles: Vec<String> = vec!["h264_1080p".to_string()],
            status: JobStatus = JobStatus::Queued,
            progress_pct: u8 = 0,
        }
        option {
            eta_seconds: i64 = None,
            error_message: String = None,
            assigned_worker_id: String = None,
            started_at: DateTime<Utc> = None,
            finished_at: DateTime<Utc> = None,
        }
        computed {
            id: JobId = JobId::new(),
            created_at: DateTime<Utc> = Utc::now(),
            updated_at: DateTime<Utc> = Utc::now(),
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
