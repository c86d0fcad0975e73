// SPDX-License-Identifier: MIT

//! Audit log entries persisted from `audit.*` bus messages.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

crate::define_uuid_id! {
    /// Unique identifier for an audit log entry.
    pub struct AuditLogId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditLogEntry {
    pub id: AuditLogId,
    pub actor: String,
    pub action: String,
    pub resource: String,
    pub metadata: serde_json::Value,
    pub created_at: DateTime<Utc>,
}

impl AuditLogEntry {
    pub fn new(actor: impl Into<String>, action: impl Into<String>, resource: impl Into<String>, metadata: serde_json::Value, now: DateTime<Utc>) -> Self {
        Self { id: AuditLogId::new(), actor: actor.into(), action: action.into(), resource: resource.into(), metadata, created_at: now }
    }
}
