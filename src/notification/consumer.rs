use serde::{Deserialize, Serialize};
use tracing::{error, info};

use crate::broker::{HandlerError, MessageHandler};
use crate::trace::{self, TraceContext, Tracer};

use super::service::NotificationService;

pub const SEND_NOTIFICATION_TOPIC: &str = "send-notification";

/// Envelope published on [`SEND_NOTIFICATION_TOPIC`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SendNotificationMessage {
    pub user_id: String,
    #[serde(default, deserialize_with = "trace::deserialize_or_default")]
    pub trace_context: TraceContext,
}

#[derive(Clone)]
pub struct SendNotificationHandler {
    notifications: NotificationService,
    tracer: Tracer,
}

impl SendNotificationHandler {
    pub fn new(notifications: NotificationService, tracer: Tracer) -> Self {
        Self {
            notifications,
            tracer,
        }
    }
}

impl MessageHandler for SendNotificationHandler {
    fn handle(&self, payload: &[u8]) -> Result<(), HandlerError> {
        let message: SendNotificationMessage = serde_json::from_slice(payload)?;

        let span = self.tracer.start_with_remote_parent(
            "notification.consumer.send_notification",
            &message.trace_context.span_context(),
        );
        let _guard = span.enter();

        if let Err(e) = self.notifications.send(&message.user_id) {
            error!(user_id = %message.user_id, error = %e, "failed to send notification");
            return Err(HandlerError::Service(e.to_string()));
        }
        info!(user_id = %message.user_id, "notification delivered");
        Ok(())
    }
}
