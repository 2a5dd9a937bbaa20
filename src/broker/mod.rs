//! In-process broker - topic registry, publishing, and consumer loops
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                  Broker (one per process)                 │
//! │  topic name ──▶ rendezvous channel (created once, lazily) │
//! └──────────────────────────────────────────────────────────┘
//!        ▲ publish(topic, bytes)             │ subscribe(topic)
//!        │ blocks until taken                ▼
//! ┌──────────────┐                  ┌────────────────────────┐
//! │ OutboxRelay  │                  │ Subscription::run       │
//! │ (Publisher)  │                  │  handler(bytes) per msg │
//! └──────────────┘                  └────────────────────────┘
//! ```
//!
//! One reader per topic. Fan-out to several consumers is modelled as
//! several topics.

#[allow(clippy::module_inception)]
mod broker;
mod consumer;
mod error;
mod handler;
mod publisher;

pub use broker::Broker;
pub use consumer::{ConsumerHandle, ConsumerStats, Subscription};
pub use error::{HandlerError, PublishError, SubscribeError};
pub use handler::MessageHandler;
pub use publisher::Publisher;
