// SPDX-License-Identifier: MIT

//! In-process bus for tests and single-node local runs. Fan-out publishes
//! all go through one `tokio::sync::broadcast` channel, with each
//! subscription filtering by subject pattern on the way out — the same
//! thing a NATS client does internally, just without the network hop. WORK
//! queues are backed by an unbounded `mpsc` channel shared by every
//! consumer in the group, which gives the same "exactly one consumer gets
//! each message" property as a JetStream work-queue stream without needing
//! a broker.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use tokio::sync::{broadcast, mpsc};

use crate::{BusError, BusMessage, Subscription, WorkConsumer, WorkMessage};

const FANOUT_CAPACITY: usize = 4096;

struct WorkQueue {
    sender: mpsc::UnboundedSender<Vec<u8>>,
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
}

/// In-memory [`crate::Bus`] implementation.
///
/// Subscriptions match by exact subject or NATS-style `>` suffix wildcard
/// (e.g. `live.lifecycle.>` matches anything published under
/// `live.lifecycle.`), since that's the matching the real NATS deployment uses.
#[derive(Clone)]
pub struct InMemoryBus {
    fanout: broadcast::Sender<BusMessage>,
    work: Arc<Mutex<HashMap<String, WorkQueue>>>,
}

impl Default for InMemoryBus {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryBus {
    pub fn new() -> Self {
        Self { fanout: broadcast::channel(FANOUT_CAPACITY).0, work: Arc::new(Mutex::new(HashMap::new())) }
    }

    fn work_queue(&self, subject: &str) -> WorkQueue {
        let mut queues = self.work.lock();
        let entry = queues.entry(subject.to_string()).or_insert_with(|| {
            let (sender, receiver) = mpsc::unbounded_channel();
            WorkQueue { sender, receiver: Arc::new(tokio::sync::Mutex::new(receiver)) }
        });
        WorkQueue { sender: entry.sender.clone(), receiver: entry.receiver.clone() }
    }
}

fn subject_matches(pattern: &str, subject: &str) -> bool {
    match pattern.strip_suffix('>') {
        Some(prefix) => subject.starts_with(prefix),
        None => pattern == subject,
    }
}

struct InMemorySubscription {
    pattern: String,
    receiver: broadcast::Receiver<BusMessage>,
}

#[async_trait]
impl Subscription for InMemorySubscription {
    async fn next(&mut self) -> Option<BusMessage> {
        loop {
            match self.receiver.recv().await {
                Ok(msg) if subject_matches(&self.pattern, &msg.subject) => return Some(msg),
                Ok(_) => continue,
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

struct InMemoryWorkMessage {
    payload: Vec<u8>,
    requeue: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl WorkMessage for InMemoryWorkMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self: Box<Self>) -> Result<(), BusError> {
        Ok(())
    }

    async fn nak(self: Box<Self>) -> Result<(), BusError> {
        self.requeue.send(self.payload).map_err(|_| BusError::Closed)
    }

    async fn term(self: Box<Self>) -> Result<(), BusError> {
        Ok(())
    }
}

struct InMemoryWorkConsumer {
    receiver: Arc<tokio::sync::Mutex<mpsc::UnboundedReceiver<Vec<u8>>>>,
    requeue: mpsc::UnboundedSender<Vec<u8>>,
}

#[async_trait]
impl WorkConsumer for InMemoryWorkConsumer {
    async fn next(&mut self) -> Option<Box<dyn WorkMessage>> {
        let mut receiver = self.receiver.lock().await;
        let payload = receiver.recv().await?;
        Some(Box::new(InMemoryWorkMessage { payload, requeue: self.requeue.clone() }))
    }
}

#[async_trait]
impl crate::Bus for InMemoryBus {
    async fn init_streams(&self) -> Result<(), BusError> {
        Ok(())
    }

    async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BusError> {
        // No subscribers yet is not an error: LIVE/EVENTS publishes happen
        // before any consumer may have started (e.g. in tests).
        let _ = self.fanout.send(BusMessage { subject: subject.to_string(), payload: payload.to_vec() });
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, BusError> {
        Ok(Box::new(InMemorySubscription { pattern: subject.to_string(), receiver: self.fanout.subscribe() }))
    }

    async fn dispatch_work(&self, subject: &str, payload: &[u8]) -> Result<(), BusError> {
        let queue = self.work_queue(subject);
        queue.sender.send(payload.to_vec()).map_err(|_| BusError::Closed)
    }

    async fn consume_work(&self, subject: &str) -> Result<Box<dyn WorkConsumer>, BusError> {
        let queue = self.work_queue(subject);
        Ok(Box::new(InMemoryWorkConsumer { receiver: queue.receiver, requeue: queue.sender }))
    }
}

#[cfg(test)]
#[path = "in_memory_tests.rs"]
mod tests;
