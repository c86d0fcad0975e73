// SPDX-License-Identifier: MIT

//! Internal error events recorded off the `events.error` subject, surfaced
//! to operators independent of any single job's lifecycle.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_uuid_id! {
    /// Unique identifier for a recorded error event.
    pub struct ErrorEventId;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Warning,
    Error,
    Critical,
    Fatal,
}

crate::simple_display! {
    Severity {
        Warning => "warning",
        Error => "error",
        Critical => "critical",
        Fatal => "fatal",
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorEvent {
    pub id: ErrorEventId,
    pub source_component: String,
    pub severity: Severity,
    pub message: String,
    pub stack_trace: Option<String>,
    pub context_data: Option<serde_json::Value>,
    pub resolved: bool,
    pub created_at: DateTime<Utc>,
}

impl ErrorEvent {
    pub fn new(source_component: String, severity: Severity, message: String, now: DateTime<Utc>) -> Self {
        Self {
            id: ErrorEventId::new(),
            source_component,
            severity,
            message,
            stack_trace: None,
            context_data: None,
            resolved: false,
            created_at: now,
        }
    }
}

crate::builder! {
    pub struct ErrorEventBuilder => ErrorEvent {
        set {
            source_component: String = String::from("mf-worker"),
            severity: Severity = Severity::Error,
            message: String = String::from("something went wrong"),
            resolved: bool = false,
        }
        option {
            stack_trace: String = None,
            context_data: serde_json::Value = None,
        }
        computed {
            id: ErrorEventId = ErrorEventId::new(),
            created_at: DateTime<Utc> = Utc::now(),
        }
    }
}
