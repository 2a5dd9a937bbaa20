use super::record::OutboxRecord;

/// What the relay does with a record whose relay attempt just failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Leave it pending for the next tick.
    Retry,
    /// Stop retrying and mark it dead-lettered.
    DeadLetter,
}

/// Decides the fate of a failed record. `attempts` already counts the
/// failure being decided on.
pub trait RetryPolicy: Send + Sync {
    fn on_failure(&self, record: &OutboxRecord, attempts: u32) -> RetryDecision;
}

/// Retry every tick, forever, with no backoff.
#[derive(Debug, Default, Clone, Copy)]
pub struct RetryForever;

impl RetryPolicy for RetryForever {
    fn on_failure(&self, _record: &OutboxRecord, _attempts: u32) -> RetryDecision {
        RetryDecision::Retry
    }
}

/// Dead-letter a record once it has failed `max_attempts` times.
#[derive(Debug, Clone, Copy)]
pub struct MaxAttempts(pub u32);

impl RetryPolicy for MaxAttempts {
    fn on_failure(&self, _record: &OutboxRecord, attempts: u32) -> RetryDecision {
        if attempts >= self.0 {
            RetryDecision::DeadLetter
        } else {
            RetryDecision::Retry
        }
    }
}
