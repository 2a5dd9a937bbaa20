use serde_json::{Map, Value};
use thiserror::Error;
use tracing::{debug, error, warn};

use crate::broker::{PublishError, Publisher};

use super::error::OutboxError;
use super::record::OutboxRecord;
use super::retry::{RetryDecision, RetryForever, RetryPolicy};
use super::store::OutboxStore;

/// Counters for one pass over the pending records.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TickStats {
    /// Pending records in the snapshot.
    pub pending: usize,
    pub published: usize,
    /// Records whose decode or publish failed.
    pub failed: usize,
    pub dead_lettered: usize,
    /// Published records that could not be marked processed. They will be
    /// published again next tick.
    pub mark_failures: usize,
    /// Records left untouched because a stop was requested mid-pass.
    pub skipped: usize,
}

#[derive(Debug, Error)]
enum RelayError {
    #[error("payload is not a JSON object: {0}")]
    Malformed(#[from] serde_json::Error),
    #[error(transparent)]
    Publish(#[from] PublishError),
}

/// Moves pending outbox records into a [`Publisher`].
///
/// Each record is handled on its own: a failure is logged, counted against
/// the record, and the pass continues. A record is marked processed only
/// after its publish succeeded.
pub struct OutboxRelay<S, P> {
    store: S,
    publisher: P,
    retry: Box<dyn RetryPolicy>,
}

impl<S, P> OutboxRelay<S, P> {
    /// Relay with the default unbounded retry policy.
    pub fn new(store: S, publisher: P) -> Self {
        Self {
            store,
            publisher,
            retry: Box::new(RetryForever),
        }
    }

    pub fn with_retry_policy(mut self, policy: impl RetryPolicy + 'static) -> Self {
        self.retry = Box::new(policy);
        self
    }

    pub fn with_boxed_retry_policy(mut self, policy: Box<dyn RetryPolicy>) -> Self {
        self.retry = policy;
        self
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    pub fn publisher(&self) -> &P {
        &self.publisher
    }
}

impl<S: OutboxStore, P: Publisher> OutboxRelay<S, P> {
    /// Relay every pending record once.
    ///
    /// Only a failure to snapshot the pending records is returned.
    pub fn tick(&self) -> Result<TickStats, OutboxError> {
        self.tick_until(|| false)
    }

    /// Like [`tick`](Self::tick), checking `should_stop` before each record.
    /// Records not reached stay pending.
    pub fn tick_until(&self, should_stop: impl Fn() -> bool) -> Result<TickStats, OutboxError> {
        let pending = self.store.list_pending()?;
        let mut stats = TickStats {
            pending: pending.len(),
            ..Default::default()
        };

        for (index, record) in pending.iter().enumerate() {
            if should_stop() {
                stats.skipped = pending.len() - index;
                debug!(skipped = stats.skipped, "stop requested, ending pass early");
                break;
            }
            self.relay_record(record, &mut stats);
        }

        if stats.pending > 0 {
            debug!(
                pending = stats.pending,
                published = stats.published,
                failed = stats.failed,
                dead_lettered = stats.dead_lettered,
                "outbox pass finished"
            );
        }
        Ok(stats)
    }

    fn relay_record(&self, record: &OutboxRecord, stats: &mut TickStats) {
        let result = reencode(&record.payload)
            .map_err(RelayError::from)
            .and_then(|bytes| Ok(self.publisher.publish(&record.topic, bytes)?));

        match result {
            Ok(()) => {
                stats.published += 1;
                if let Err(e) = self.store.mark_processed(&record.id) {
                    stats.mark_failures += 1;
                    warn!(
                        record_id = %record.id,
                        topic = %record.topic,
                        error = %e,
                        "published but failed to mark processed; record will be republished"
                    );
                }
            }
            Err(e) => {
                stats.failed += 1;
                self.handle_failure(record, &e, stats);
            }
        }
    }

    fn handle_failure(&self, record: &OutboxRecord, failure: &RelayError, stats: &mut TickStats) {
        let message = failure.to_string();
        warn!(
            record_id = %record.id,
            topic = %record.topic,
            error = %message,
            "failed to relay outbox record"
        );

        let attempts = match self.store.record_failure(&record.id, &message) {
            Ok(attempts) => attempts,
            Err(e) => {
                error!(record_id = %record.id, error = %e, "failed to record relay failure");
                record.attempts + 1
            }
        };

        if self.retry.on_failure(record, attempts) == RetryDecision::DeadLetter {
            match self.store.mark_dead_lettered(&record.id, &message) {
                Ok(()) => {
                    stats.dead_lettered += 1;
                    error!(
                        record_id = %record.id,
                        topic = %record.topic,
                        attempts,
                        "outbox record dead-lettered"
                    );
                }
                Err(e) => {
                    error!(record_id = %record.id, error = %e, "failed to dead-letter record");
                }
            }
        }
    }
}

/// Decode as a generic JSON object and encode again, so only well-formed
/// documents reach the broker.
fn reencode(payload: &[u8]) -> Result<Vec<u8>, serde_json::Error> {
    let message: Map<String, Value> = serde_json::from_slice(payload)?;
    serde_json::to_vec(&message)
}
