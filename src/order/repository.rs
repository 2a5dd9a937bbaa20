use std::collections::{HashMap, HashSet};
use std::sync::{Arc, RwLock};

use crate::outbox::{OutboxError, OutboxLedger, OutboxRecord, OutboxStore};
use crate::repository::{Repository, RepositoryError};

use super::order::Order;

/// Order storage that also owns the outbox for order side effects.
pub trait OrderRepository: Repository<Order> + OutboxStore {
    /// Insert `order` and append `records` as one all-or-nothing write.
    fn create_with_outbox(
        &self,
        order: Order,
        records: Vec<OutboxRecord>,
    ) -> Result<(), RepositoryError>;
}

#[derive(Default)]
struct OrderState {
    orders: HashMap<String, Order>,
    outbox: OutboxLedger,
}

/// Orders and their outbox records behind a single lock.
///
/// Clones share the same storage.
///
/// ## Example
///
/// ```
/// use order_outbox::order::{InMemoryOrderRepository, Order, OrderRepository};
/// use order_outbox::outbox::{OutboxRecord, OutboxStore};
///
/// let repo = InMemoryOrderRepository::new();
/// let order = Order::new("o1", "c1", ["p1"]);
/// let record = OutboxRecord::new("deduct-items", br#"{"productIds":["p1"]}"#.to_vec());
///
/// repo.create_with_outbox(order, vec![record]).unwrap();
/// assert_eq!(repo.list_pending().unwrap().len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct InMemoryOrderRepository {
    state: Arc<RwLock<OrderState>>,
}

impl InMemoryOrderRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every outbox record regardless of status.
    pub fn outbox_records(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        let state = self
            .state
            .read()
            .map_err(|_| OutboxError::LockPoisoned("outbox read"))?;
        Ok(state.outbox.records().cloned().collect())
    }

    fn read_outbox<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&OutboxLedger) -> T,
    ) -> Result<T, OutboxError> {
        let state = self
            .state
            .read()
            .map_err(|_| OutboxError::LockPoisoned(operation))?;
        Ok(f(&state.outbox))
    }

    fn write_outbox<T>(
        &self,
        operation: &'static str,
        f: impl FnOnce(&mut OutboxLedger) -> Result<T, OutboxError>,
    ) -> Result<T, OutboxError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| OutboxError::LockPoisoned(operation))?;
        f(&mut state.outbox)
    }
}

impl OrderRepository for InMemoryOrderRepository {
    fn create_with_outbox(
        &self,
        order: Order,
        records: Vec<OutboxRecord>,
    ) -> Result<(), RepositoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("order create"))?;
        if state.orders.contains_key(&order.id) {
            return Err(RepositoryError::AlreadyExists(format!("order {}", order.id)));
        }
        let clash = {
            let mut seen = HashSet::with_capacity(records.len());
            records
                .iter()
                .find(|r| state.outbox.contains(&r.id) || !seen.insert(r.id.as_str()))
                .map(|r| r.id.clone())
        };
        if let Some(id) = clash {
            return Err(RepositoryError::AlreadyExists(format!("outbox record {id}")));
        }
        state.orders.insert(order.id.clone(), order);
        for record in records {
            state
                .outbox
                .append(record)
                .map_err(|e| RepositoryError::AlreadyExists(e.to_string()))?;
        }
        Ok(())
    }
}

impl Repository<Order> for InMemoryOrderRepository {
    fn list(&self) -> Result<Vec<Order>, RepositoryError> {
        let state = self
            .state
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("order list"))?;
        Ok(state.orders.values().cloned().collect())
    }

    fn get(&self, id: &str) -> Result<Order, RepositoryError> {
        let state = self
            .state
            .read()
            .map_err(|_| RepositoryError::LockPoisoned("order get"))?;
        state
            .orders
            .get(id)
            .cloned()
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))
    }

    fn create(&self, order: Order) -> Result<(), RepositoryError> {
        self.create_with_outbox(order, Vec::new())
    }

    fn update(&self, order: Order) -> Result<(), RepositoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("order update"))?;
        match state.orders.get_mut(&order.id) {
            Some(existing) => {
                *existing = order;
                Ok(())
            }
            None => Err(RepositoryError::NotFound(format!("order {}", order.id))),
        }
    }

    fn delete(&self, id: &str) -> Result<(), RepositoryError> {
        let mut state = self
            .state
            .write()
            .map_err(|_| RepositoryError::LockPoisoned("order delete"))?;
        state
            .orders
            .remove(id)
            .map(|_| ())
            .ok_or_else(|| RepositoryError::NotFound(format!("order {id}")))
    }
}

impl OutboxStore for InMemoryOrderRepository {
    fn append(&self, record: OutboxRecord) -> Result<(), OutboxError> {
        self.write_outbox("outbox append", |outbox| outbox.append(record))
    }

    fn list_pending(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        self.read_outbox("outbox read", |outbox| outbox.pending())
    }

    fn mark_processed(&self, id: &str) -> Result<(), OutboxError> {
        self.write_outbox("outbox mark processed", |outbox| outbox.mark_processed(id))
    }

    fn record_failure(&self, id: &str, error: &str) -> Result<u32, OutboxError> {
        self.write_outbox("outbox record failure", |outbox| {
            outbox.record_failure(id, error)
        })
    }

    fn mark_dead_lettered(&self, id: &str, error: &str) -> Result<(), OutboxError> {
        self.write_outbox("outbox dead letter", |outbox| {
            outbox.mark_dead_lettered(id, error)
        })
    }

    fn get(&self, id: &str) -> Result<Option<OutboxRecord>, OutboxError> {
        self.read_outbox("outbox read", |outbox| outbox.get(id).cloned())
    }
}
