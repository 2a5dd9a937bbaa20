//! Outbox relay integration tests.
//!
//! Drives `OutboxRelay` and `RelayWorker` against flaky publishers and
//! stores to check at-least-once delivery and status monotonicity.

#[path = "../support/mod.rs"]
mod support;

use std::collections::HashMap;
use std::sync::mpsc;
use std::time::Duration;

use order_outbox::broker::{Broker, HandlerError};
use order_outbox::order::{InMemoryOrderRepository, Order, OrderService};
use order_outbox::outbox::{
    InMemoryOutbox, MaxAttempts, OutboxRecord, OutboxRelay, OutboxStatus, OutboxStore,
    RelayWorker,
};
use order_outbox::trace::Tracer;

use support::{wait_until, FlakyPublisher, FlakyStore, RecordingPublisher};

fn record(id: &str, topic: &str) -> OutboxRecord {
    OutboxRecord::with_id(id, topic, br#"{"productIds":["p1"]}"#.to_vec())
}

// ============================================================================
// Test 1: Publish fails twice, then succeeds on the third tick
// ============================================================================

#[test]
fn failed_publish_stays_pending_until_it_succeeds() {
    let outbox = InMemoryOutbox::new();
    outbox.append(record("r1", "deduct-items")).unwrap();

    let sink = RecordingPublisher::new();
    let relay = OutboxRelay::new(outbox.clone(), FlakyPublisher::new(sink.clone(), 2));

    for _ in 0..2 {
        let stats = relay.tick().unwrap();
        assert_eq!(stats.failed, 1);
        assert_eq!(stats.published, 0);
        assert!(outbox.get("r1").unwrap().unwrap().is_pending());
    }

    let stats = relay.tick().unwrap();
    assert_eq!(stats.published, 1);

    let r1 = outbox.get("r1").unwrap().unwrap();
    assert!(r1.is_processed());
    assert_eq!(r1.attempts, 2);
    assert!(r1.last_error.is_some());
    assert_eq!(sink.count("deduct-items"), 1);

    // Nothing left to do.
    assert_eq!(relay.tick().unwrap().pending, 0);
}

// ============================================================================
// Test 2: A failed mark_processed leads to a second publish
// ============================================================================

#[test]
fn mark_failure_republishes_on_next_tick() {
    let outbox = InMemoryOutbox::new();
    outbox.append(record("r1", "deduct-items")).unwrap();

    let sink = RecordingPublisher::new();
    let relay = OutboxRelay::new(FlakyStore::new(outbox.clone(), ["r1"]), sink.clone());

    let first = relay.tick().unwrap();
    assert_eq!(first.published, 1);
    assert_eq!(first.mark_failures, 1);
    assert!(outbox.get("r1").unwrap().unwrap().is_pending());

    let second = relay.tick().unwrap();
    assert_eq!(second.published, 1);
    assert_eq!(second.mark_failures, 0);
    assert!(outbox.get("r1").unwrap().unwrap().is_processed());

    let published = sink.published();
    assert_eq!(published.len(), 2);
    assert_eq!(published[0], published[1]);
}

// ============================================================================
// Test 3: One bad record does not hold back the rest
// ============================================================================

#[test]
fn failures_are_isolated_per_record() {
    let outbox = InMemoryOutbox::new();
    outbox.append(record("good", "deduct-items")).unwrap();
    outbox
        .append(OutboxRecord::with_id("bad", "deduct-items", b"[1, 2".to_vec()))
        .unwrap();

    let sink = RecordingPublisher::new();
    let relay = OutboxRelay::new(outbox.clone(), sink.clone());
    let stats = relay.tick().unwrap();

    assert_eq!(stats.pending, 2);
    assert_eq!(stats.published, 1);
    assert_eq!(stats.failed, 1);
    assert!(outbox.get("good").unwrap().unwrap().is_processed());
    assert!(outbox.get("bad").unwrap().unwrap().is_pending());
}

// ============================================================================
// Test 4: A tick with one failing and one succeeding publish
// ============================================================================

#[test]
fn mixed_tick_retries_only_the_failed_record() {
    let outbox = InMemoryOutbox::new();
    outbox.append(record("a", "deduct-items")).unwrap();
    outbox.append(record("b", "send-notification")).unwrap();

    let sink = RecordingPublisher::new();
    let flaky = FlakyPublisher::failing_topic(sink.clone(), "deduct-items", 1);
    let relay = OutboxRelay::new(outbox.clone(), flaky.clone());

    let first = relay.tick().unwrap();
    assert_eq!(first.pending, 2);
    assert_eq!(first.published, 1);
    assert_eq!(first.failed, 1);

    let a = outbox.get("a").unwrap().unwrap();
    assert!(a.is_pending());
    assert_eq!(a.attempts, 1);
    assert!(a.last_error.is_some());
    let b = outbox.get("b").unwrap().unwrap();
    assert!(b.is_processed());
    assert_eq!(b.attempts, 0);

    let second = relay.tick().unwrap();
    assert_eq!(second.pending, 1);
    assert_eq!(second.published, 1);
    assert_eq!(second.failed, 0);

    assert!(outbox.get("a").unwrap().unwrap().is_processed());
    assert!(outbox.get("b").unwrap().unwrap().is_processed());
    assert_eq!(flaky.attempts("deduct-items"), 2);
    assert_eq!(flaky.attempts("send-notification"), 1);
    assert_eq!(sink.count("deduct-items"), 1);
    assert_eq!(sink.count("send-notification"), 1);
}

// ============================================================================
// Test 5: Bounded retries dead-letter and never publish again
// ============================================================================

#[test]
fn max_attempts_dead_letters_and_stays_terminal() {
    let outbox = InMemoryOutbox::new();
    outbox.append(record("r1", "t")).unwrap();

    let sink = RecordingPublisher::new();
    let flaky = FlakyPublisher::new(sink.clone(), 5);
    let relay = OutboxRelay::new(outbox.clone(), flaky.clone()).with_retry_policy(MaxAttempts(3));

    let dead: usize = (0..5).map(|_| relay.tick().unwrap().dead_lettered).sum();
    assert_eq!(dead, 1);
    assert_eq!(flaky.attempts("t"), 3);

    let r1 = outbox.get("r1").unwrap().unwrap();
    assert_eq!(r1.status, OutboxStatus::DeadLettered);
    assert_eq!(r1.attempts, 3);

    // Terminal: marking processed later changes nothing.
    outbox.mark_processed("r1").unwrap();
    assert_eq!(
        outbox.get("r1").unwrap().unwrap().status,
        OutboxStatus::DeadLettered
    );
    assert_eq!(sink.published().len(), 0);
}

// ============================================================================
// Test 6: Worker thread drains orders written through the order service
// ============================================================================

#[test]
fn worker_relays_order_records_to_broker() {
    let repo = InMemoryOrderRepository::new();
    let orders = OrderService::new(repo.clone(), Tracer::default());
    let broker = Broker::new();

    let (tx, rx) = mpsc::channel();
    let mut consumers = Vec::new();
    for topic in ["deduct-items", "send-notification"] {
        let tx = tx.clone();
        consumers.push(
            broker
                .spawn_consumer(topic, move |payload: &[u8]| -> Result<(), HandlerError> {
                    tx.send((topic, payload.to_vec())).unwrap();
                    Ok(())
                })
                .unwrap(),
        );
    }

    let worker = RelayWorker::start(
        OutboxRelay::new(repo.clone(), broker.clone()),
        Duration::from_millis(10),
    )
    .unwrap();

    orders.create(Order::new("o1", "c1", ["p1", "p2"])).unwrap();

    let mut received = HashMap::new();
    for _ in 0..2 {
        let (topic, payload) = rx.recv_timeout(Duration::from_secs(2)).unwrap();
        let json: serde_json::Value = serde_json::from_slice(&payload).unwrap();
        received.insert(topic, json);
    }

    let deduct_json = &received["deduct-items"];
    let notify_json = &received["send-notification"];
    assert_eq!(deduct_json["productIds"], serde_json::json!(["p1", "p2"]));
    assert_eq!(notify_json["userId"], "c1");
    assert_eq!(
        deduct_json["traceContext"]["traceId"],
        notify_json["traceContext"]["traceId"]
    );

    assert!(wait_until(Duration::from_secs(2), || {
        repo.list_pending().unwrap().is_empty()
    }));

    let stats = worker.stop();
    assert_eq!(stats.published, 2);

    broker.close();
    for consumer in consumers {
        assert_eq!(consumer.join().messages_handled, 1);
    }
}
