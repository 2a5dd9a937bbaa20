use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum NotificationError {
    #[error("notification rejected: {0}")]
    Rejected(String),

    #[error("lock poisoned: {0}")]
    LockPoisoned(&'static str),
}
