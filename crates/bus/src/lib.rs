// SPDX-License-Identifier: MIT

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! The message bus: three independent delivery semantics over the same
//! transport, matching the lifecycle of what's being carried.
//!
//! - **WORK** (`jobs.dispatch`) — competing consumers, durable, requires ack.
//!   Exactly one worker claims each task.
//! - **EVENTS** (`jobs.events`, `events.error`, `audit.*`) — fan-out, durable
//!   enough to survive a consumer restart, no ack required. Every
//!   subscriber (orchestrator, listener, webhook dispatcher) sees every
//!   message.
//! - **LIVE** (`workers.heartbeat`, `live.telemetry.*`, `live.lifecycle.*`)
//!   — fan-out, ephemeral. A slow or absent subscriber may miss messages;
//!   nothing here is replayed.
//!
//! [`NatsBus`] backs this with NATS JetStream streams of matching retention
//! policy; [`InMemoryBus`] backs it with in-process tokio channels for tests
//! and single-node local runs where `NATS_URL` is unset.

mod error;
mod in_memory;
mod nats;

pub use error::BusError;
pub use in_memory::InMemoryBus;
pub use mf_core::wire::subjects;
pub use nats::NatsBus;

use async_trait::async_trait;
use serde::Serialize;
use serde::de::DeserializeOwned;

/// A message delivered to a fan-out (EVENTS/LIVE) subscriber.
#[derive(Debug, Clone)]
pub struct BusMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl BusMessage {
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        Ok(serde_json::from_slice(&self.payload)?)
    }
}

/// A message claimed off a WORK queue. Exactly one of [`WorkMessage::ack`],
/// [`WorkMessage::nak`], or [`WorkMessage::term`] must be called once the
/// worker has decided the task's fate.
#[async_trait]
pub trait WorkMessage: Send {
    fn payload(&self) -> &[u8];

    fn decode<T: DeserializeOwned>(&self) -> Result<T, BusError> {
        Ok(serde_json::from_slice(self.payload())?)
    }

    /// Acknowledge successful processing; the message will not be redelivered.
    async fn ack(self: Box<Self>) -> Result<(), BusError>;

    /// Signal failure; the message is redelivered (subject to the queue's
    /// redelivery policy).
    async fn nak(self: Box<Self>) -> Result<(), BusError>;

    /// Signal the message should never be redelivered (e.g. the owning job
    /// was cancelled).
    async fn term(self: Box<Self>) -> Result<(), BusError>;
}

/// A subscription to a fan-out subject (or subject wildcard).
#[async_trait]
pub trait Subscription: Send {
    async fn next(&mut self) -> Option<BusMessage>;
}

/// A handle to a WORK queue's competing-consumer stream.
#[async_trait]
pub trait WorkConsumer: Send {
    async fn next(&mut self) -> Option<Box<dyn WorkMessage>>;
}

/// The bus abstraction every component programs against.
#[async_trait]
pub trait Bus: Send + Sync + 'static {
    /// Idempotent: create or verify the underlying streams exist with the
    /// retention policy matching each subject's delivery semantics. Safe to
    /// call on every startup.
    async fn init_streams(&self) -> Result<(), BusError>;

    /// Publish a fan-out (EVENTS/LIVE) message.
    async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Subscribe to a fan-out subject or wildcard, receiving every message
    /// published after subscription (LIVE) or from stream start (EVENTS),
    /// per the subject's retention policy.
    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, BusError>;

    /// Dispatch one unit of work onto the WORK queue.
    async fn dispatch_work(&self, subject: &str, payload: &[u8]) -> Result<(), BusError>;

    /// Join the WORK queue's competing-consumer group for `subject`.
    async fn consume_work(&self, subject: &str) -> Result<Box<dyn WorkConsumer>, BusError>;
}

/// JSON-encoding convenience methods layered over [`Bus`], kept separate so
/// `Bus` itself stays object-safe (`Box<dyn Bus>` is how the daemon picks
/// between [`NatsBus`] and [`InMemoryBus`] at startup).
#[async_trait]
pub trait BusExt: Bus {
    async fn publish_json<T: Serialize + Sync>(&self, subject: &str, message: &T) -> Result<(), BusError> {
        let payload = serde_json::to_vec(message)?;
        self.publish(subject, &payload).await
    }

    async fn dispatch_work_json<T: Serialize + Sync>(&self, subject: &str, message: &T) -> Result<(), BusError> {
        let payload = serde_json::to_vec(message)?;
        self.dispatch_work(subject, &payload).await
    }
}

impl<B: Bus + ?Sized> BusExt for B {}

#[cfg(test)]
mod tests;
