use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum OutboxError {
    #[error("outbox record {0} not found")]
    NotFound(String),
    #[error("outbox record {0} already exists")]
    Duplicate(String),
    #[error("outbox lock poisoned during {0}")]
    LockPoisoned(&'static str),
}
