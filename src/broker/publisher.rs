use std::sync::Arc;

use super::error::PublishError;

/// Hands raw payloads to a named topic.
///
/// The relay worker is generic over this trait, so a real network broker
/// can replace the in-process [`Broker`](super::Broker).
pub trait Publisher: Send + Sync {
    /// Publish `payload` on `topic`. Implementations may block until the
    /// payload has been accepted by a reader.
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError>;
}

impl<P: Publisher + ?Sized> Publisher for Arc<P> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        (**self).publish(topic, payload)
    }
}

impl<P: Publisher + ?Sized> Publisher for Box<P> {
    fn publish(&self, topic: &str, payload: Vec<u8>) -> Result<(), PublishError> {
        (**self).publish(topic, payload)
    }
}
