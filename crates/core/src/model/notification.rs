// SPDX-License-Identifier: MIT

//! Operator-facing notifications (e.g. worker marked unhealthy by the janitor).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

crate::define_uuid_id! {
    /// Unique identifier for a notification.
    pub struct NotificationId;
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    pub id: NotificationId,
    /// Recipient; `None` for operator-wide notifications (e.g. worker health).
    pub user_id: Option<Uuid>,
    pub kind: String,
    pub message: String,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    pub fn new(user_id: Option<Uuid>, kind: impl Into<String>, message: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: NotificationId::new(),
            user_id,
            kind: kind.into(),
            message: message.into(),
            created_at: now,
        }
    }
}
