// SPDX-License-Identifier: MIT

//! Webhook subscriptions: user-registered HTTP callbacks for job/live events.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

crate::define_uuid_id! {
    /// Unique identifier for a webhook subscription.
    pub struct WebhookId;
}

/// A failure count of this many consecutive delivery attempts deactivates
/// the webhook (spec §4.7).
pub const MAX_FAILURE_COUNT: u32 = 10;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Webhook {
    pub id: WebhookId,
    pub user_id: Uuid,
    pub url: String,
    /// Shared secret used to HMAC-SHA256 sign delivered payloads; `None`
    /// means the webhook is delivered unsigned.
    pub secret: Option<String>,
    /// Event names this webhook is subscribed to (e.g. `"job.completed"`).
    pub events: HashSet<String>,
    pub is_active: bool,
    pub failure_count: u32,
    pub last_triggered_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Webhook {
    pub fn new(user_id: Uuid, url: String, secret: Option<String>, events: HashSet<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: WebhookId::new(),
            user_id,
            url,
            secret,
            events,
            is_active: true,
            failure_count: 0,
            last_triggered_at: None,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn is_subscribed_to(&self, event: &str) -> bool {
        self.is_active && self.events.contains(event)
    }

    pub fn record_success(&mut self, now: DateTime<Utc>) {
        self.failure_count = 0;
        self.last_triggered_at = Some(now);
        self.updated_at = now;
    }

    /// Record a failed delivery attempt, deactivating once
    /// [`MAX_FAILURE_COUNT`] consecutive failures have accumulated.
    pub fn record_failure(&mut self, now: DateTime<Utc>) {
        self.failure_count += 1;
        self.last_triggered_at = Some(now);
        self.updated_at = now;
        if self.failure_count >= MAX_FAILURE_COUNT {
            self.is_active = false;
        }
    }
}

#[cfg(test)]
#[path = "webhook_tests.rs"]
mod tests;
