// SPDX-License-Identifier: MIT

//! Per-job log lines, appended from a worker's `log` task event.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::model::job::JobId;

crate::define_uuid_id! {
    /// Unique identifier for a job log line.
    pub struct JobLogId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    Debug,
    Info,
    Warn,
    Error,
}

crate::simple_display! {
    LogLevel {
        Debug => "debug",
        Info => "info",
        Warn => "warn",
        Error => "error",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobLog {
    pub id: JobLogId,
    pub job_id: JobId,
    pub level: LogLevel,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl JobLog {
    pub fn new(job_id: JobId, level: LogLevel, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self { id: JobLogId::new(), job_id, level, message: message.into(), created_at: now }
    }
}

#[cfg(test)]
#[path = "job_log_tests.rs"]
mod tests;
