// SPDX-License-Identifier: MIT

use super::*;
use crate::Bus as _;

#[tokio::test]
async fn fanout_delivers_to_every_subscriber() {
    let bus = InMemoryBus::new();
    let mut a = bus.subscribe("jobs.events").await.unwrap();
    let mut b = bus.subscribe("jobs.events").await.unwrap();

    bus.publish("jobs.events", b"hello").await.unwrap();

    assert_eq!(a.next().await.unwrap().payload, b"hello");
    assert_eq!(b.next().await.unwrap().payload, b"hello");
}

#[tokio::test]
async fn subscription_filters_unrelated_subjects() {
    let bus = InMemoryBus::new();
    let mut sub = bus.subscribe("live.lifecycle.>").await.unwrap();

    bus.publish("workers.heartbeat", b"irrelevant").await.unwrap();
    bus.publish("live.lifecycle.stream-1", b"relevant").await.unwrap();

    let msg = sub.next().await.unwrap();
    assert_eq!(msg.subject, "live.lifecycle.stream-1");
    assert_eq!(msg.payload, b"relevant");
}

#[tokio::test]
async fn work_queue_delivers_each_message_once() {
    let bus = InMemoryBus::new();
    bus.dispatch_work("jobs.dispatch", b"task-1").await.unwrap();
    bus.dispatch_work("jobs.dispatch", b"task-2").await.unwrap();

    let mut consumer_a = bus.consume_work("jobs.dispatch").await.unwrap();
    let mut consumer_b = bus.consume_work("jobs.dispatch").await.unwrap();

    let first = consumer_a.next().await.unwrap();
    let second = consumer_b.next().await.unwrap();
    let mut payloads = vec![first.payload().to_vec(), second.payload().to_vec()];
    payloads.sort();
    assert_eq!(payloads, vec![b"task-1".to_vec(), b"task-2".to_vec()]);

    first.ack().await.unwrap();
    second.ack().await.unwrap();
}

#[tokio::test]
async fn nak_requeues_the_message() {
    let bus = InMemoryBus::new();
    bus.dispatch_work("jobs.dispatch", b"task-1").await.unwrap();

    let mut consumer = bus.consume_work("jobs.dispatch").await.unwrap();
    let msg = consumer.next().await.unwrap();
    msg.nak().await.unwrap();

    let redelivered = consumer.next().await.unwrap();
    assert_eq!(redelivered.payload(), b"task-1");
}
