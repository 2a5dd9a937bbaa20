//! Inventory - products and the consumer that deducts them for new orders.

mod consumer;
mod error;
mod product;
mod service;

pub use consumer::{DeductItemsHandler, DeductItemsMessage, DEDUCT_ITEMS_TOPIC};
pub use error::InventoryError;
pub use product::Product;
pub use service::InventoryService;
