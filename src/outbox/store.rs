use std::collections::HashMap;
use std::sync::{Arc, RwLock};

use chrono::Utc;

use super::error::OutboxError;
use super::record::{OutboxRecord, OutboxStatus};

/// Ledger of outbox records, shared between producers and the relay.
pub trait OutboxStore: Send + Sync {
    /// Insert `record` as pending, stamping `created_at`.
    fn append(&self, record: OutboxRecord) -> Result<(), OutboxError>;

    /// Snapshot of every pending record, in no particular order.
    fn list_pending(&self) -> Result<Vec<OutboxRecord>, OutboxError>;

    /// Move a pending record to processed. Already-terminal records are left
    /// untouched.
    fn mark_processed(&self, id: &str) -> Result<(), OutboxError>;

    /// Count a failed relay attempt. Returns the new attempt count.
    fn record_failure(&self, id: &str, error: &str) -> Result<u32, OutboxError>;

    /// Move a pending record to dead-lettered.
    fn mark_dead_lettered(&self, id: &str, error: &str) -> Result<(), OutboxError>;

    fn get(&self, id: &str) -> Result<Option<OutboxRecord>, OutboxError>;
}

impl<S: OutboxStore + ?Sized> OutboxStore for Arc<S> {
    fn append(&self, record: OutboxRecord) -> Result<(), OutboxError> {
        (**self).append(record)
    }

    fn list_pending(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        (**self).list_pending()
    }

    fn mark_processed(&self, id: &str) -> Result<(), OutboxError> {
        (**self).mark_processed(id)
    }

    fn record_failure(&self, id: &str, error: &str) -> Result<u32, OutboxError> {
        (**self).record_failure(id, error)
    }

    fn mark_dead_lettered(&self, id: &str, error: &str) -> Result<(), OutboxError> {
        (**self).mark_dead_lettered(id, error)
    }

    fn get(&self, id: &str) -> Result<Option<OutboxRecord>, OutboxError> {
        (**self).get(id)
    }
}

/// Unlocked record map.
///
/// Aggregate repositories embed a ledger inside the state guarded by their
/// own lock, so the aggregate write and its outbox records become visible
/// together.
#[derive(Debug, Default, Clone)]
pub struct OutboxLedger {
    records: HashMap<String, OutboxRecord>,
}

impl OutboxLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `record` as pending. An id that is already present is
    /// rejected and the stored record keeps its status.
    pub fn append(&mut self, mut record: OutboxRecord) -> Result<(), OutboxError> {
        if self.records.contains_key(&record.id) {
            return Err(OutboxError::Duplicate(record.id));
        }
        record.status = OutboxStatus::Pending;
        record.created_at = Utc::now();
        self.records.insert(record.id.clone(), record);
        Ok(())
    }

    pub fn contains(&self, id: &str) -> bool {
        self.records.contains_key(id)
    }

    pub fn pending(&self) -> Vec<OutboxRecord> {
        self.records
            .values()
            .filter(|r| r.is_pending())
            .cloned()
            .collect()
    }

    pub fn pending_count(&self) -> usize {
        self.records.values().filter(|r| r.is_pending()).count()
    }

    pub fn mark_processed(&mut self, id: &str) -> Result<(), OutboxError> {
        let record = self.record_mut(id)?;
        if record.is_pending() {
            record.status = OutboxStatus::Processed;
            record.processed_at = Some(Utc::now());
        }
        Ok(())
    }

    pub fn record_failure(&mut self, id: &str, error: &str) -> Result<u32, OutboxError> {
        let record = self.record_mut(id)?;
        record.attempts += 1;
        record.last_error = Some(error.to_string());
        Ok(record.attempts)
    }

    pub fn mark_dead_lettered(&mut self, id: &str, error: &str) -> Result<(), OutboxError> {
        let record = self.record_mut(id)?;
        if record.is_pending() {
            record.status = OutboxStatus::DeadLettered;
            record.last_error = Some(error.to_string());
        }
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&OutboxRecord> {
        self.records.get(id)
    }

    pub fn records(&self) -> impl Iterator<Item = &OutboxRecord> {
        self.records.values()
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    fn record_mut(&mut self, id: &str) -> Result<&mut OutboxRecord, OutboxError> {
        self.records
            .get_mut(id)
            .ok_or_else(|| OutboxError::NotFound(id.to_string()))
    }
}

/// Standalone thread-safe outbox. Clones share the same ledger.
#[derive(Clone, Default)]
pub struct InMemoryOutbox {
    ledger: Arc<RwLock<OutboxLedger>>,
}

impl InMemoryOutbox {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every record regardless of status.
    pub fn records(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| OutboxError::LockPoisoned("outbox read"))?;
        Ok(ledger.records().cloned().collect())
    }
}

impl OutboxStore for InMemoryOutbox {
    fn append(&self, record: OutboxRecord) -> Result<(), OutboxError> {
        self.ledger
            .write()
            .map_err(|_| OutboxError::LockPoisoned("outbox append"))?
            .append(record)
    }

    fn list_pending(&self) -> Result<Vec<OutboxRecord>, OutboxError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| OutboxError::LockPoisoned("outbox read"))?;
        Ok(ledger.pending())
    }

    fn mark_processed(&self, id: &str) -> Result<(), OutboxError> {
        self.ledger
            .write()
            .map_err(|_| OutboxError::LockPoisoned("outbox mark processed"))?
            .mark_processed(id)
    }

    fn record_failure(&self, id: &str, error: &str) -> Result<u32, OutboxError> {
        self.ledger
            .write()
            .map_err(|_| OutboxError::LockPoisoned("outbox record failure"))?
            .record_failure(id, error)
    }

    fn mark_dead_lettered(&self, id: &str, error: &str) -> Result<(), OutboxError> {
        self.ledger
            .write()
            .map_err(|_| OutboxError::LockPoisoned("outbox dead letter"))?
            .mark_dead_lettered(id, error)
    }

    fn get(&self, id: &str) -> Result<Option<OutboxRecord>, OutboxError> {
        let ledger = self
            .ledger
            .read()
            .map_err(|_| OutboxError::LockPoisoned("outbox read"))?;
        Ok(ledger.get(id).cloned())
    }
}
