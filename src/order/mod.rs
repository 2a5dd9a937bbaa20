//! Orders - the producer side of the outbox.

mod error;
#[allow(clippy::module_inception)]
mod order;
mod repository;
mod service;

pub use error::OrderError;
pub use order::Order;
pub use repository::{InMemoryOrderRepository, OrderRepository};
pub use service::OrderService;
