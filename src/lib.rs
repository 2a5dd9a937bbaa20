//! Transactional outbox for order side effects.
//!
//! Creating an order writes the order and its follow-up events under one
//! lock. A relay thread later publishes those events to an in-process
//! broker, where inventory and notification consumers pick them up. The
//! trace context travels inside each event so consumer spans join the
//! trace that created the order.

pub mod broker;
pub mod config;
pub mod inventory;
pub mod notification;
pub mod order;
pub mod outbox;
pub mod pipeline;
pub mod repository;
pub mod telemetry;
pub mod trace;

pub use broker::{Broker, MessageHandler, Publisher};
pub use config::Settings;
pub use order::{Order, OrderService};
pub use outbox::{OutboxRecord, OutboxRelay, OutboxStore, RelayWorker};
pub use pipeline::{Pipeline, ShutdownReport};
pub use repository::{HashMapRepository, Repository, RepositoryError};
pub use trace::{TraceContext, Tracer};
