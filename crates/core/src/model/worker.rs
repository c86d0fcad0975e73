// SPDX-License-Identifier: MIT

//! Worker identity and health.
//!
//! Unlike other entities, a worker's id is not a UUID: it is a stable
//! identity the worker itself chooses at startup (typically its hostname),
//! so that a worker rejoining after a restart reuses its prior row instead
//! of minting a new one.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Stable worker identity, typically the host's hostname.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct WorkerId(pub String);

impl WorkerId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for WorkerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<String> for WorkerId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for WorkerId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WorkerStatus {
    Idle,
    Busy,
    Offline,
}

crate::simple_display! {
    WorkerStatus {
        Idle => "idle",
        Busy => "busy",
        Offline => "offline",
    }
}

/// A registered encoding worker and its last-known health.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Worker {
    pub id: WorkerId,
    pub hostname: String,
    pub version: String,
    pub status: WorkerStatus,
    /// Task kinds this worker can execute (e.g. `["probe", "transcode"]`);
    /// workers without `ffmpeg`/`ffprobe` on `PATH` omit those kinds.
    pub capabilities: Vec<String>,
    /// Arbitrary worker-reported capacity hints (concurrency slots, GPU, etc).
    pub capacity: serde_json::Value,
    pub last_seen_at: DateTime<Utc>,
    pub registered_at: DateTime<Utc>,
}

impl Worker {
    pub fn register(id: WorkerId, hostname: String, version: String, capabilities: Vec<String>, capacity: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self {
            id,
            hostname,
            version,
            status: WorkerStatus::Idle,
            capabilities,
            capacity,
            last_seen_at: now,
            registered_at: now,
        }
    }

    pub fn heartbeat(&mut self, status: WorkerStatus, now: DateTime<Utc>) {
        self.status = status;
        self.last_seen_at = now;
    }

    /// A worker is unhealthy once its last heartbeat is older than `threshold`.
    pub fn is_healthy(&self, now: DateTime<Utc>, threshold: chrono::Duration) -> bool {
        now.signed_duration_since(self.last_seen_at) < threshold
    }

    pub fn can_handle(&self, task_kind: &str) -> bool {
        self.capabilities.iter().any(|c| c == task_kind)
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
