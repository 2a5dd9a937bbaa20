//! Shared helpers for the integration suites.

#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use order_outbox::broker::{PublishError, Publisher};
use order_outbox::outbox::{OutboxError, OutboxRecord, OutboxStore};

/// Poll `condition` every few milliseconds until it holds or `timeout`
/// passes. Returns the last result.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(5));
    }
}

/// Captures every publish without delivering it anywhere.
#[derive(Clone, Default)]
pub struct RecordingPublisher {
    published: Arc<Mutex<Vec<(String, Vec<u8>)>>>,
}

impl RecordingPublisher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn published(&self) -> Vec<(String, Vec<u8>)> {
        self.published.lock().unwrap().clone()
    }

    pub fn count(&self, topic: &str) -> usize {
        self.published
            .lock()
            .unwrap()
            .iter()
            .filter(|(t, _)| t == topic)
            .count()
    }
}

impl Publisher for RecordingPublisher {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        self.published
            .lock()
            .unwrap()
            .push((topic.to_string(), payload));
        Ok(())
    }
}

/// Fails the first `failures` publishes on each topic, then forwards to
/// the inner publisher.
#[derive(Clone)]
pub struct FlakyPublisher<P> {
    inner: P,
    failures: usize,
    only_topic: Option<String>,
    attempts: Arc<Mutex<HashMap<String, usize>>>,
}

impl<P> FlakyPublisher<P> {
    pub fn new(inner: P, failures: usize) -> Self {
        Self {
            inner,
            failures,
            only_topic: None,
            attempts: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    /// Like [`FlakyPublisher::new`], but every other topic always succeeds.
    pub fn failing_topic(inner: P, topic: &str, failures: usize) -> Self {
        Self {
            only_topic: Some(topic.to_string()),
            ..Self::new(inner, failures)
        }
    }

    pub fn attempts(&self, topic: &str) -> usize {
        self.attempts
            .lock()
            .unwrap()
            .get(topic)
            .copied()
            .unwrap_or(0)
    }
}

impl<P: Publisher> Publisher for FlakyPublisher<P> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        let attempt = {
            let mut attempts = self.attempts.lock().unwrap();
            let count = attempts.entry(topic.to_string()).or_insert(0);
            *count += 1;
            *count
        };
        let targeted = self.only_topic.as_deref().map_or(true, |only| only == topic);
        if targeted && attempt <= self.failures {
            return Err(PublishError::Rejected(format!(
                "{topic} unavailable (attempt {attempt})"
            )));
        }
        self.inner.publish(topic, payload)
    }
}

/// Delegates to the inner store, but the first `mark_processed` for each id
/// in `fail_once` fails.
#[derive(Clone)]
pub struct FlakyStore<S> {
    inner: S,
    fail_once: Arc<Mutex<HashSet<String>>>,
}

impl<S> FlakyStore<S> {
    pub fn new<I, T>(inner: S, fail_once: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            inner,
            fail_once: Arc::new(Mutex::new(fail_once.into_iter().map(Into::into).collect())),
        }
    }
}

impl<S: OutboxStore> OutboxStore for FlakyStore<S> {
    fn append(&self, record: OutboxRecord) -> Result<(), OutboxError> {
        self.inner.append(record)
    }

    fn list_pending(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        self.inner.list_pending()
    }

    fn mark_processed(&self, id: &str) -> Result<(), OutboxError> {
        if self.fail_once.lock().unwrap().remove(id) {
            return Err(OutboxError::LockPoisoned("simulated mark failure"));
        }
        self.inner.mark_processed(id)
    }

    fn record_failure(&self, id: &str, error: &str) -> Result<u32, OutboxError> {
        self.inner.record_failure(id, error)
    }

    fn mark_dead_lettered(&self, id: &str, error: &str) -> Result<(), OutboxError> {
        self.inner.mark_dead_lettered(id, error)
    }

    fn get(&self, id: &str) -> Result<Option<OutboxRecord>, OutboxError> {
        self.inner.get(id)
    }
}
