use tracing::info;

use crate::inventory::{DeductItemsMessage, DEDUCT_ITEMS_TOPIC};
use crate::notification::{SendNotificationMessage, SEND_NOTIFICATION_TOPIC};
use crate::outbox::OutboxRecord;
use crate::repository::Repository;
use crate::trace::{TraceContext, Tracer};

use super::error::OrderError;
use super::order::Order;
use super::repository::OrderRepository;

/// Order use cases. Creating an order records its side effects in the
/// outbox instead of performing them.
pub struct OrderService<R> {
    repo: R,
    tracer: Tracer,
}

impl<R: Clone> Clone for OrderService<R> {
    fn clone(&self) -> Self {
        Self {
            repo: self.repo.clone(),
            tracer: self.tracer.clone(),
        }
    }
}

impl<R> OrderService<R> {
    pub fn new(repo: R, tracer: Tracer) -> Self {
        Self { repo, tracer }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }
}

impl<R: OrderRepository> OrderService<R> {
    /// Persist `order` together with one inventory-deduction and one
    /// notification record, both tagged with this call's trace context.
    pub fn create(&self, order: Order) -> Result<(), OrderError> {
        let span = self.tracer.start("order.service.create");
        let _guard = span.enter();

        if order.id.trim().is_empty() {
            return Err(OrderError::Invalid("order id is empty".into()));
        }

        let trace_context = TraceContext::capture();
        let deduct = OutboxRecord::encode(
            DEDUCT_ITEMS_TOPIC,
            &DeductItemsMessage {
                product_ids: order.product_ids.clone(),
                trace_context: trace_context.clone(),
            },
        )?;
        let notify = OutboxRecord::encode(
            SEND_NOTIFICATION_TOPIC,
            &SendNotificationMessage {
                user_id: order.customer_id.clone(),
                trace_context,
            },
        )?;

        let order_id = order.id.clone();
        self.repo.create_with_outbox(order, vec![deduct, notify])?;
        info!(order_id = %order_id, "order created");
        Ok(())
    }

    pub fn get(&self, id: &str) -> Result<Order, OrderError> {
        let span = self.tracer.start("order.service.get");
        let _guard = span.enter();
        Ok(Repository::get(&self.repo, id)?)
    }

    pub fn update(&self, order: Order) -> Result<(), OrderError> {
        let span = self.tracer.start("order.service.update");
        let _guard = span.enter();
        Ok(self.repo.update(order)?)
    }

    pub fn delete(&self, id: &str) -> Result<(), OrderError> {
        let span = self.tracer.start("order.service.delete");
        let _guard = span.enter();
        Ok(self.repo.delete(id)?)
    }

    pub fn list(&self) -> Result<Vec<Order>, OrderError> {
        let span = self.tracer.start("order.service.list");
        let _guard = span.enter();
        Ok(self.repo.list()?)
    }
}
