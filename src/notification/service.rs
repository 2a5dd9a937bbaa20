use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Utc};
use tracing::info;

use crate::trace::{SpanContext, Tracer};

use super::error::NotificationError;

/// A message delivered to one user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub user_id: String,
    pub message: String,
    pub sent_at: DateTime<Utc>,
    /// Trace that caused the send, if one was active.
    pub trace_id: Option<String>,
}

/// Delivery channel for notifications.
pub trait Notifier: Send + Sync {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError>;
}

impl<N: Notifier + ?Sized> Notifier for Arc<N> {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        (**self).notify(notification)
    }
}

impl<N: Notifier + ?Sized> Notifier for Box<N> {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        (**self).notify(notification)
    }
}

/// Simulated delivery: every notification is written to the log.
///
/// A buffered notifier also keeps what it sent, shared across clones.
#[derive(Clone, Default)]
pub struct LogNotifier {
    sent: Option<Arc<Mutex<Vec<Notification>>>>,
}

impl LogNotifier {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn buffered() -> Self {
        Self {
            sent: Some(Arc::new(Mutex::new(Vec::new()))),
        }
    }

    /// Notifications sent so far. Always empty when not buffered.
    pub fn sent(&self) -> Vec<Notification> {
        match &self.sent {
            Some(sent) => sent.lock().unwrap_or_else(PoisonError::into_inner).clone(),
            None => Vec::new(),
        }
    }
}

impl Notifier for LogNotifier {
    fn notify(&self, notification: &Notification) -> Result<(), NotificationError> {
        info!(
            user_id = %notification.user_id,
            message = %notification.message,
            "notification sent (simulated)"
        );
        if let Some(sent) = &self.sent {
            sent.lock()
                .map_err(|_| NotificationError::LockPoisoned("notification buffer"))?
                .push(notification.clone());
        }
        Ok(())
    }
}

#[derive(Clone)]
pub struct NotificationService {
    notifier: Arc<dyn Notifier>,
    tracer: Tracer,
}

impl NotificationService {
    pub fn new(notifier: impl Notifier + 'static, tracer: Tracer) -> Self {
        Self {
            notifier: Arc::new(notifier),
            tracer,
        }
    }

    /// Tell `user_id` that their order was placed.
    pub fn send(&self, user_id: &str) -> Result<(), NotificationError> {
        let span = self.tracer.start("notification.service.send");
        let _guard = span.enter();

        if user_id.is_empty() {
            return Err(NotificationError::Rejected("user id is empty".into()));
        }

        let notification = Notification {
            user_id: user_id.to_string(),
            message: "Your order has been placed".to_string(),
            sent_at: Utc::now(),
            trace_id: SpanContext::current().map(|c| c.trace_id.to_string()),
        };
        self.notifier.notify(&notification)
    }
}
