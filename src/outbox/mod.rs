//! Outbox - records of pending side effects and the relay that publishes them.
//!
//! The outbox pattern has two phases:
//! 1. **Append** - a repository writes the aggregate change and its outbox
//!    records under one lock (see `order::InMemoryOrderRepository`).
//! 2. **Relay** - [`RelayWorker`] periodically runs [`OutboxRelay::tick`],
//!    publishing each pending record and marking it processed afterwards.
//!
//! Publishing and marking are separate steps, so a record can be published
//! more than once. Consumers must be idempotent.

mod error;
mod record;
mod relay;
mod retry;
mod store;
mod worker;

pub use error::OutboxError;
pub use record::{OutboxRecord, OutboxStatus};
pub use relay::{OutboxRelay, TickStats};
pub use retry::{MaxAttempts, RetryDecision, RetryForever, RetryPolicy};
pub use store::{InMemoryOutbox, OutboxLedger, OutboxStore};
pub use worker::{RelayWorker, WorkerStats};
