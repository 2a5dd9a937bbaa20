use std::sync::mpsc::{Receiver, RecvTimeoutError};
use std::thread::JoinHandle;
use std::time::Duration;

use tracing::{debug, error, info};

use super::handler::MessageHandler;

/// Counters reported when a consumer loop ends.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ConsumerStats {
    pub messages_handled: usize,
    pub messages_failed: usize,
}

/// Exclusive reader of one topic.
pub struct Subscription {
    topic: String,
    receiver: Receiver<Vec<u8>>,
}

impl Subscription {
    pub(super) fn new(topic: String, receiver: Receiver<Vec<u8>>) -> Self {
        Self { topic, receiver }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    /// Block until a payload arrives. `None` once the broker is closed.
    pub fn recv(&self) -> Option<Vec<u8>> {
        self.receiver.recv().ok()
    }

    /// Like [`recv`](Self::recv) but gives up after `timeout`.
    pub fn recv_timeout(&self, timeout: Duration) -> Option<Vec<u8>> {
        match self.receiver.recv_timeout(timeout) {
            Ok(payload) => Some(payload),
            Err(RecvTimeoutError::Timeout) | Err(RecvTimeoutError::Disconnected) => None,
        }
    }

    /// Feed every payload to `handler` until the broker closes.
    ///
    /// A handler error is logged and the loop moves on to the next message.
    pub fn run<H: MessageHandler>(self, handler: H) -> ConsumerStats {
        let mut stats = ConsumerStats::default();
        info!(topic = %self.topic, "consumer started");

        for payload in self.receiver.iter() {
            match handler.handle(&payload) {
                Ok(()) => {
                    stats.messages_handled += 1;
                    debug!(topic = %self.topic, "message handled");
                }
                Err(e) => {
                    stats.messages_failed += 1;
                    error!(topic = %self.topic, error = %e, "failed to process message");
                }
            }
        }

        info!(
            topic = %self.topic,
            handled = stats.messages_handled,
            failed = stats.messages_failed,
            "consumer stopped"
        );
        stats
    }
}

/// A consumer loop running on its own thread.
///
/// The loop ends when the broker is closed; there is no other cancellation.
pub struct ConsumerHandle {
    topic: String,
    handle: Option<JoinHandle<ConsumerStats>>,
}

impl ConsumerHandle {
    pub(super) fn new(topic: String, handle: JoinHandle<ConsumerStats>) -> Self {
        Self {
            topic,
            handle: Some(handle),
        }
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_finished(&self) -> bool {
        self.handle.as_ref().map_or(true, |h| h.is_finished())
    }

    /// Wait for the loop to end and return its statistics.
    pub fn join(mut self) -> ConsumerStats {
        match self.handle.take() {
            Some(handle) => handle.join().unwrap_or_else(|_| {
                error!(topic = %self.topic, "consumer thread panicked");
                ConsumerStats::default()
            }),
            None => ConsumerStats::default(),
        }
    }
}
