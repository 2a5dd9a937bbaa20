use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::broker::{HandlerError, MessageHandler};
use crate::trace::{self, TraceContext, Tracer};

use super::error::InventoryError;
use super::service::InventoryService;

pub const DEDUCT_ITEMS_TOPIC: &str = "deduct-items";

/// Envelope published on [`DEDUCT_ITEMS_TOPIC`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeductItemsMessage {
    pub product_ids: Vec<String>,
    #[serde(default, deserialize_with = "trace::deserialize_or_default")]
    pub trace_context: TraceContext,
}

/// Removes every product named in a [`DeductItemsMessage`].
///
/// Products that are already gone are skipped, so redelivery is harmless.
#[derive(Clone)]
pub struct DeductItemsHandler {
    inventory: InventoryService,
    tracer: Tracer,
}

impl DeductItemsHandler {
    pub fn new(inventory: InventoryService, tracer: Tracer) -> Self {
        Self { inventory, tracer }
    }

    fn deduct(&self, product_id: &str) -> Result<(), InventoryError> {
        self.inventory.get(product_id)?;
        self.inventory.delete(product_id)
    }
}

impl MessageHandler for DeductItemsHandler {
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let message: DeductItemsMessage = serde_json::from_slice(payload)?;

        let span = self.tracer.start_with_remote_parent(
            "inventory.consumer.deduct_items",
            &message.trace_context.span_context(),
        );
        let _guard = span.enter();

        for product_id in &message.product_ids {
            match self.deduct(product_id) {
                Ok(()) => info!(product_id = %product_id, "item deducted"),
                Err(e) if e.is_not_found() => {
                    warn!(product_id = %product_id, "product not found, skipping")
                }
                Err(e) => return Err(HandlerError::Service(e.to_string())),
            }
        }
        Ok(())
    }
}
