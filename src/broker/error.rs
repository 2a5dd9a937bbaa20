//! Error types for the in-process broker.

use thiserror::Error;

/// Error returned when handing a payload to a topic fails.
#[derive(Debug, Error)]
pub enum PublishError {
    /// The broker was closed before or during the hand-off.
    #[error("broker is closed")]
    BrokerClosed,
    /// The topic's reader went away while the payload was waiting.
    #[error("topic {0} has no reader")]
    TopicClosed(String),
    #[error("broker lock poisoned during {0}")]
    LockPoisoned(&'static str),
    /// The broker refused the payload.
    #[error("event rejected: {0}")]
    Rejected(String),
}

/// Error returned when claiming a topic's reader.
#[derive(Debug, Error)]
pub enum SubscribeError {
    #[error("broker is closed")]
    BrokerClosed,
    #[error("topic {0} already has a consumer")]
    AlreadyConsumed(String),
    #[error("broker lock poisoned during {0}")]
    LockPoisoned(&'static str),
    #[error("failed to spawn consumer thread: {0}")]
    Spawn(#[from] std::io::Error),
}

/// Error returned by a message handler. Logged by the consumer loop, never
/// retried by the broker.
#[derive(Debug, Error)]
pub enum HandlerError {
    /// Payload could not be decoded into the expected envelope.
    #[error("malformed payload: {0}")]
    Malformed(String),
    /// The owning domain service failed.
    #[error("service error: {0}")]
    Service(String),
}

impl From<serde_json::Error> for HandlerError {
    fn from(err: serde_json::Error) -> Self {
        HandlerError::Malformed(err.to_string())
    }
}
