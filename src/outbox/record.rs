use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Lifecycle of an outbox record. Transitions only ever leave `Pending`.
#[derive(Clone, Copy, Serialize, Deserialize, Debug, Default, PartialEq, Eq)]
pub enum OutboxStatus {
    #[default]
    Pending,
    Processed,
    /// Given up on by a bounded retry policy.
    DeadLettered,
}

/// Intent to publish `payload` on `topic`, recorded alongside the aggregate
/// change that caused it.
#[derive(Clone, Serialize, Deserialize, Debug, PartialEq)]
pub struct OutboxRecord {
    pub id: String,
    pub topic: String,
    pub payload: Vec<u8>,
    pub created_at: DateTime<Utc>,
    pub status: OutboxStatus,
    pub attempts: u32,
    pub last_error: Option<String>,
    pub processed_at: Option<DateTime<Utc>>,
}

impl OutboxRecord {
    /// New pending record with a random UUID.
    pub fn new(topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self::with_id(Uuid::new_v4().to_string(), topic, payload)
    }

    pub fn with_id(id: impl Into<String>, topic: impl Into<String>, payload: Vec<u8>) -> Self {
        Self {
            id: id.into(),
            topic: topic.into(),
            payload,
            created_at: Utc::now(),
            status: OutboxStatus::Pending,
            attempts: 0,
            last_error: None,
            processed_at: None,
        }
    }

    /// New record whose payload is `event` encoded as JSON.
    pub fn encode<T: Serialize>(topic: impl Into<String>, event: &T) -> Result<Self, serde_json::Error> {
        Ok(Self::new(topic, serde_json::to_vec(event)?))
    }

    pub fn is_pending(&self) -> bool {
        self.status == OutboxStatus::Pending
    }

    pub fn is_processed(&self) -> bool {
        self.status == OutboxStatus::Processed
    }

    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }
}
