use super::error::HandlerError;

/// Processes one raw message from a topic.
pub trait MessageHandler: Send {
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError>;
}

impl<F> MessageHandler for F
where
    F: Fn(&[u8]) -> Result<(), HandlerError> + Send,
{
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        self(payload)
    }
}
