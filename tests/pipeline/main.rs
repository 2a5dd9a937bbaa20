//! End-to-end pipeline tests.
//!
//! Orders go in through `OrderService`, the relay thread moves their outbox
//! records through the broker, and both consumers act on them.

#[path = "../support/mod.rs"]
mod support;

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{mpsc, Arc};
use std::thread;
use std::time::Duration;

use order_outbox::broker::Broker;
use order_outbox::config::{RelaySettings, Settings};
use order_outbox::inventory::{Product, DEDUCT_ITEMS_TOPIC};
use order_outbox::notification::{LogNotifier, SEND_NOTIFICATION_TOPIC};
use order_outbox::order::Order;
use order_outbox::outbox::{OutboxRecord, OutboxStore};
use order_outbox::pipeline::Pipeline;
use order_outbox::trace::{SpanRecorder, Tracer};

use support::wait_until;

const TIMEOUT: Duration = Duration::from_secs(5);

fn start(recorder: &SpanRecorder, notifier: &LogNotifier) -> Pipeline {
    Pipeline::builder()
        .poll_interval(Duration::from_millis(10))
        .tracer(Tracer::with_recorder("order-outbox", recorder.clone()))
        .notifier(notifier.clone())
        .start()
        .unwrap()
}

fn seed(pipeline: &Pipeline, ids: &[&str]) {
    for id in ids {
        pipeline
            .inventory()
            .create(Product::new(*id, format!("product {id}")))
            .unwrap();
    }
}

fn remaining(pipeline: &Pipeline) -> Vec<String> {
    let mut ids: Vec<String> = pipeline
        .inventory()
        .list()
        .unwrap()
        .into_iter()
        .map(|p| p.id)
        .collect();
    ids.sort();
    ids
}

// ============================================================================
// Test 1: Order o1 deducts p1 and p2 and notifies its customer
// ============================================================================

#[test]
fn order_deducts_items_and_notifies_customer() {
    let recorder = SpanRecorder::new();
    let notifier = LogNotifier::buffered();
    let pipeline = start(&recorder, &notifier);
    seed(&pipeline, &["p1", "p2", "p3"]);

    pipeline
        .orders()
        .create(Order::new("o1", "c1", ["p1", "p2"]))
        .unwrap();

    assert!(wait_until(TIMEOUT, || {
        remaining(&pipeline) == vec!["p3"] && notifier.sent().len() == 1
    }));
    assert_eq!(notifier.sent()[0].user_id, "c1");
    assert!(wait_until(TIMEOUT, || {
        pipeline.outbox().list_pending().unwrap().is_empty()
    }));

    let report = pipeline.shutdown();
    assert_eq!(report.relay.published, 2);
    assert_eq!(report.consumer(DEDUCT_ITEMS_TOPIC).unwrap().messages_handled, 1);
    assert_eq!(
        report.consumer(SEND_NOTIFICATION_TOPIC).unwrap().messages_handled,
        1
    );
}

// ============================================================================
// Test 2: Consumer spans join the trace that created the order
// ============================================================================

#[test]
fn consumer_spans_continue_order_trace() {
    let recorder = SpanRecorder::new();
    let notifier = LogNotifier::buffered();
    let pipeline = start(&recorder, &notifier);
    seed(&pipeline, &["p1"]);

    pipeline
        .orders()
        .create(Order::new("o1", "c1", ["p1"]))
        .unwrap();

    assert!(wait_until(TIMEOUT, || {
        recorder.find("inventory.consumer.deduct_items").is_some()
            && recorder.find("notification.consumer.send_notification").is_some()
    }));
    pipeline.shutdown();

    let create = recorder.find("order.service.create").unwrap();
    for name in [
        "inventory.consumer.deduct_items",
        "notification.consumer.send_notification",
    ] {
        let span = recorder.find(name).unwrap();
        assert_eq!(span.context.trace_id, create.context.trace_id, "{name}");
        let parent = span.parent.expect("consumer span has a parent");
        assert_eq!(parent.span_id, create.context.span_id, "{name}");
        assert!(parent.remote, "{name}");
    }

    // Service spans run inside the consumer spans.
    let deduct = recorder.find("inventory.consumer.deduct_items").unwrap();
    let delete = recorder.find("inventory.service.delete").unwrap();
    assert_eq!(delete.context.trace_id, create.context.trace_id);
    assert_eq!(delete.parent.unwrap().span_id, deduct.context.span_id);
}

// ============================================================================
// Test 3: Overlapping orders are handled idempotently
// ============================================================================

#[test]
fn overlapping_orders_skip_missing_products() {
    let recorder = SpanRecorder::new();
    let notifier = LogNotifier::buffered();
    let pipeline = start(&recorder, &notifier);
    seed(&pipeline, &["p1", "p2", "p3"]);

    pipeline
        .orders()
        .create(Order::new("o1", "c1", ["p1", "p2"]))
        .unwrap();
    pipeline
        .orders()
        .create(Order::new("o2", "c2", ["p2", "p3"]))
        .unwrap();

    assert!(wait_until(TIMEOUT, || {
        remaining(&pipeline).is_empty() && notifier.sent().len() == 2
    }));
    assert!(wait_until(TIMEOUT, || {
        pipeline.outbox().list_pending().unwrap().is_empty()
    }));

    let report = pipeline.shutdown();
    let deduct = report.consumer(DEDUCT_ITEMS_TOPIC).unwrap();
    assert_eq!(deduct.messages_handled, 2);
    assert_eq!(deduct.messages_failed, 0);
}

// ============================================================================
// Test 4: Duplicate order leaves the outbox untouched
// ============================================================================

#[test]
fn duplicate_order_is_rejected_without_side_effects() {
    let recorder = SpanRecorder::new();
    let notifier = LogNotifier::buffered();
    let pipeline = start(&recorder, &notifier);
    seed(&pipeline, &["p1", "p2"]);

    pipeline
        .orders()
        .create(Order::new("o1", "c1", ["p1"]))
        .unwrap();
    assert!(pipeline
        .orders()
        .create(Order::new("o1", "c1", ["p2"]))
        .is_err());

    assert!(wait_until(TIMEOUT, || {
        notifier.sent().len() == 1 && pipeline.outbox().list_pending().unwrap().is_empty()
    }));
    assert_eq!(remaining(&pipeline), vec!["p2"]);
    assert_eq!(pipeline.orders().get("o1").unwrap().product_ids, vec!["p1"]);

    let report = pipeline.shutdown();
    assert_eq!(report.relay.published, 2);
}

// ============================================================================
// Test 5: Publishing blocks until the consumer takes the message
// ============================================================================

#[test]
fn publish_waits_for_consumer() {
    let broker = Broker::new();
    let subscription = broker.subscribe("slow").unwrap();
    let delivered = Arc::new(AtomicUsize::new(0));

    let publisher = {
        let broker = broker.clone();
        let delivered = Arc::clone(&delivered);
        thread::spawn(move || {
            for i in 0..3u8 {
                broker.publish("slow", vec![i]).unwrap();
                delivered.fetch_add(1, Ordering::SeqCst);
            }
        })
    };

    thread::sleep(Duration::from_millis(100));
    assert_eq!(delivered.load(Ordering::SeqCst), 0);

    assert_eq!(subscription.recv_timeout(TIMEOUT), Some(vec![0]));
    assert!(wait_until(TIMEOUT, || delivered.load(Ordering::SeqCst) == 1));
    thread::sleep(Duration::from_millis(50));
    assert_eq!(delivered.load(Ordering::SeqCst), 1);

    assert_eq!(subscription.recv_timeout(TIMEOUT), Some(vec![1]));
    assert_eq!(subscription.recv_timeout(TIMEOUT), Some(vec![2]));
    publisher.join().unwrap();
    assert_eq!(delivered.load(Ordering::SeqCst), 3);
}

// ============================================================================
// Test 6: Settings drive the relay
// ============================================================================

#[test]
fn pipeline_starts_from_settings() {
    let settings = Settings {
        service_name: "orders-test".into(),
        relay: RelaySettings {
            poll_interval_ms: 10,
            max_attempts: Some(3),
        },
        ..Settings::default()
    };
    let notifier = LogNotifier::buffered();
    let pipeline = Pipeline::builder()
        .settings(&settings)
        .notifier(notifier.clone())
        .start()
        .unwrap();
    seed(&pipeline, &["p1"]);

    pipeline
        .orders()
        .create(Order::new("o1", "c1", ["p1"]))
        .unwrap();

    assert!(wait_until(TIMEOUT, || notifier.sent().len() == 1));
    assert!(wait_until(TIMEOUT, || remaining(&pipeline).is_empty()));

    let mut topics = pipeline.broker().topics();
    topics.sort();
    assert_eq!(topics, vec![DEDUCT_ITEMS_TOPIC, SEND_NOTIFICATION_TOPIC]);

    let report = pipeline.shutdown();
    assert_eq!(report.relay.dead_lettered, 0);
}

// ============================================================================
// Test 7: Shutdown returns while the relay waits on a topic with no consumer
// ============================================================================

#[test]
fn shutdown_releases_relay_blocked_on_unconsumed_topic() {
    let recorder = SpanRecorder::new();
    let notifier = LogNotifier::buffered();
    let pipeline = start(&recorder, &notifier);
    let outbox = pipeline.outbox().clone();

    outbox
        .append(OutboxRecord::with_id("audit-1", "audit", b"{}".to_vec()))
        .unwrap();
    assert!(wait_until(TIMEOUT, || {
        pipeline.broker().topics().contains(&"audit".to_string())
    }));
    thread::sleep(Duration::from_millis(100));

    let (tx, rx) = mpsc::channel();
    thread::spawn(move || {
        let _ = tx.send(pipeline.shutdown());
    });

    let report = rx
        .recv_timeout(Duration::from_secs(3))
        .expect("shutdown returned");
    assert_eq!(report.relay.published, 0);

    let audit = OutboxStore::get(&outbox, "audit-1").unwrap().unwrap();
    assert!(audit.is_pending());
    assert_eq!(audit.attempts, 1);
}
