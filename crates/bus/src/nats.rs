// SPDX-License-Identifier: MIT

//! NATS-backed [`crate::Bus`].
//!
//! - WORK (`jobs.dispatch`) is a JetStream stream with `WorkQueue` retention,
//!   consumed through a durable pull consumer so redelivery survives a
//!   worker restart.
//! - EVENTS (`jobs.events`, `events.error`, `audit.>`) is a JetStream stream
//!   with `Limits` retention (time-bounded, not work-queue): every
//!   subscriber gets an independent durable consumer and sees every message.
//! - LIVE (`workers.heartbeat`, `live.telemetry.>`, `live.lifecycle.>`) is
//!   plain core NATS publish/subscribe — no stream, no replay, delivered
//!   only to subscribers connected at publish time.

use async_nats::jetstream::{self, consumer::PullConsumer, stream::RetentionPolicy};
use async_trait::async_trait;
use futures::StreamExt;

use crate::{BusError, BusMessage, Subscription, WorkConsumer, WorkMessage};
use mf_core::wire::subjects;

const WORK_STREAM: &str = "MF_WORK";
const EVENTS_STREAM: &str = "MF_EVENTS";

fn is_live_subject(subject: &str) -> bool {
    subject.starts_with(subjects::LIVE_TELEMETRY_PREFIX)
        || subject.starts_with(subjects::LIVE_LIFECYCLE_PREFIX)
        || subject == subjects::WORKERS_HEARTBEAT
}

#[derive(Clone)]
pub struct NatsBus {
    client: async_nats::Client,
    jetstream: jetstream::Context,
}

impl NatsBus {
    pub async fn connect(url: &str) -> Result<Self, BusError> {
        let client = async_nats::connect(url)
            .await
            .map_err(|e| BusError::Init(format!("connecting to {url}: {e}")))?;
        let jetstream = jetstream::new(client.clone());
        Ok(Self { client, jetstream })
    }
}

#[async_trait]
impl crate::Bus for NatsBus {
    async fn init_streams(&self) -> Result<(), BusError> {
        self.jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: WORK_STREAM.to_string(),
                subjects: vec![format!("{}.>", subjects::JOBS_DISPATCH), subjects::JOBS_DISPATCH.to_string()],
                retention: RetentionPolicy::WorkQueue,
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::Init(e.to_string()))?;

        self.jetstream
            .get_or_create_stream(jetstream::stream::Config {
                name: EVENTS_STREAM.to_string(),
                subjects: vec![
                    subjects::JOBS_EVENTS.to_string(),
                    subjects::EVENTS_ERROR.to_string(),
                    format!("{}>", subjects::AUDIT_PREFIX),
                ],
                retention: RetentionPolicy::Limits,
                max_age: std::time::Duration::from_secs(7 * 24 * 3600),
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::Init(e.to_string()))?;

        Ok(())
    }

    async fn publish(&self, subject: &str, payload: &[u8]) -> Result<(), BusError> {
        let bytes = bytes::Bytes::copy_from_slice(payload);
        if is_live_subject(subject) {
            self.client
                .publish(subject.to_string(), bytes)
                .await
                .map_err(|e| BusError::Publish { subject: subject.to_string(), source: Box::new(e) })?;
        } else {
            self.jetstream
                .publish(subject.to_string(), bytes)
                .await
                .map_err(|e| BusError::Publish { subject: subject.to_string(), source: Box::new(e) })?
                .await
                .map_err(|e| BusError::Publish { subject: subject.to_string(), source: Box::new(e) })?;
        }
        Ok(())
    }

    async fn subscribe(&self, subject: &str) -> Result<Box<dyn Subscription>, BusError> {
        if is_live_subject(subject) {
            let sub = self
                .client
                .subscribe(subject.to_string())
                .await
                .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
            return Ok(Box::new(CoreSubscription { inner: sub }));
        }

        let stream = self
            .jetstream
            .get_stream(EVENTS_STREAM)
            .await
            .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
        let consumer: PullConsumer = stream
            .create_consumer(jetstream::consumer::pull::Config {
                filter_subject: subject.to_string(),
                deliver_policy: jetstream::consumer::DeliverPolicy::New,
                ..Default::default()
            })
            .await
            .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
        let messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
        Ok(Box::new(JetStreamFanoutSubscription { inner: messages }))
    }

    async fn dispatch_work(&self, subject: &str, payload: &[u8]) -> Result<(), BusError> {
        self.jetstream
            .publish(subject.to_string(), bytes::Bytes::copy_from_slice(payload))
            .await
            .map_err(|e| BusError::Publish { subject: subject.to_string(), source: Box::new(e) })?
            .await
            .map_err(|e| BusError::Publish { subject: subject.to_string(), source: Box::new(e) })?;
        Ok(())
    }

    async fn consume_work(&self, subject: &str) -> Result<Box<dyn WorkConsumer>, BusError> {
        let stream = self
            .jetstream
            .get_stream(WORK_STREAM)
            .await
            .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
        let consumer: PullConsumer = stream
            .get_or_create_consumer(
                "mf-worker",
                jetstream::consumer::pull::Config {
                    durable_name: Some("mf-worker".to_string()),
                    filter_subject: subject.to_string(),
                    ack_policy: jetstream::consumer::AckPolicy::Explicit,
                    ..Default::default()
                },
            )
            .await
            .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
        let messages = consumer
            .messages()
            .await
            .map_err(|e| BusError::Subscribe { subject: subject.to_string(), source: Box::new(e) })?;
        Ok(Box::new(JetStreamWorkConsumer { inner: messages }))
    }
}

struct CoreSubscription {
    inner: async_nats::Subscriber,
}

#[async_trait]
impl Subscription for CoreSubscription {
    async fn next(&mut self) -> Option<BusMessage> {
        let msg = self.inner.next().await?;
        Some(BusMessage { subject: msg.subject.to_string(), payload: msg.payload.to_vec() })
    }
}

struct JetStreamFanoutSubscription {
    inner: jetstream::consumer::pull::Stream,
}

#[async_trait]
impl Subscription for JetStreamFanoutSubscription {
    async fn next(&mut self) -> Option<BusMessage> {
        let msg = self.inner.next().await?.ok()?;
        let subject = msg.subject.to_string();
        let payload = msg.payload.to_vec();
        let _ = msg.ack().await;
        Some(BusMessage { subject, payload })
    }
}

struct JetStreamWorkConsumer {
    inner: jetstream::consumer::pull::Stream,
}

#[async_trait]
impl WorkConsumer for JetStreamWorkConsumer {
    async fn next(&mut self) -> Option<Box<dyn WorkMessage>> {
        let msg = self.inner.next().await?.ok()?;
        Some(Box::new(JetStreamWorkMessage { payload: msg.payload.to_vec(), message: msg }))
    }
}

struct JetStreamWorkMessage {
    payload: Vec<u8>,
    message: jetstream::Message,
}

#[async_trait]
impl WorkMessage for JetStreamWorkMessage {
    fn payload(&self) -> &[u8] {
        &self.payload
    }

    async fn ack(self: Box<Self>) -> Result<(), BusError> {
        self.message.ack().await.map_err(|e| BusError::Publish { subject: "ack".to_string(), source: e })
    }

    async fn nak(self: Box<Self>) -> Result<(), BusError> {
        self.message
            .ack_with(jetstream::AckKind::Nak(None))
            .await
            .map_err(|e| BusError::Publish { subject: "nak".to_string(), source: e })
    }

    async fn term(self: Box<Self>) -> Result<(), BusError> {
        self.message
            .ack_with(jetstream::AckKind::Term)
            .await
            .map_err(|e| BusError::Publish { subject: "term".to_string(), source: e })
    }
}
