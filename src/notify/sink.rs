use tracing::info;

use crate::notify::deduper::NotificationEvent;

/// Outbound notification channel. Fire-and-forget: implementations log
/// delivery failures and never retry; the dedup record is already written by
/// the time an event reaches a sink.
pub trait NotificationSink: Send + Sync {
    fn dispatch(&self, event: &NotificationEvent);
}

/// Default sink: structured log line per notification. Stands in for a push
/// gateway in local runs and tests.
pub struct LogSink;

impl NotificationSink for LogSink {
    fn dispatch(&self, event: &NotificationEvent) {
        info!(
            booking_id = %event.booking_id,
            event_key = %event.event_key,
            priority = event.priority.label(),
            title = %event.title,
            "notification dispatched"
        );
    }
}
