//! Notifications - the consumer that tells a customer their order was placed.

mod consumer;
mod error;
mod service;

pub use consumer::{SendNotificationHandler, SendNotificationMessage, SEND_NOTIFICATION_TOPIC};
pub use error::NotificationError;
pub use service::{LogNotifier, Notification, NotificationService, Notifier};
