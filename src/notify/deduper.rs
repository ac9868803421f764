use std::sync::Arc;

use serde::Serialize;
use tracing::error;

use crate::models::booking::{BookingSnapshot, BookingStatus};
use crate::notify::store::{record_key, NotificationRecordStore};

pub const TECH_ASSIGNED_KEY: &str = "tech_assigned";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum NotificationPriority {
    Normal,
    High,
}

impl NotificationPriority {
    pub fn label(&self) -> &'static str {
        match self {
            NotificationPriority::Normal => "normal",
            NotificationPriority::High => "high",
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationEvent {
    pub booking_id: String,
    pub event_key: String,
    pub title: String,
    pub body: String,
    pub priority: NotificationPriority,
}

/// Detects meaningful transitions between consecutive snapshots of a booking
/// and guarantees each (booking, event) pair fires at most once across the
/// booking's lifetime, backed by the durable record store.
pub struct NotificationDeduper {
    store: Arc<dyn NotificationRecordStore>,
}

impl NotificationDeduper {
    pub fn new(store: Arc<dyn NotificationRecordStore>) -> Self {
        Self { store }
    }

    /// Diff the snapshots and return the events that should be dispatched.
    /// Each record is marked durably before its event is returned, so a
    /// re-delivered transition (duplicate poll, crash-retry) stays silent.
    /// A store write failure suppresses the event: at-most-once beats
    /// double-delivery on the next poll.
    pub fn on_snapshot(
        &self,
        current: &BookingSnapshot,
        previous: Option<&BookingSnapshot>,
    ) -> Vec<NotificationEvent> {
        let mut events = Vec::new();

        for candidate in pending_transitions(current, previous) {
            let key = record_key(&candidate.booking_id, &candidate.event_key);
            if self.store.contains(&key) {
                continue;
            }
            if let Err(err) = self.store.mark(&key) {
                error!(
                    booking_id = %candidate.booking_id,
                    event_key = %candidate.event_key,
                    error = %err,
                    "failed to persist notification record; suppressing event"
                );
                continue;
            }
            events.push(candidate);
        }

        events
    }
}

/// Pure diff: which notifications does this snapshot pair call for, before any
/// dedup bookkeeping. A booking seen for the first time produces nothing; a
/// fresh observation is not a transition.
pub fn pending_transitions(
    current: &BookingSnapshot,
    previous: Option<&BookingSnapshot>,
) -> Vec<NotificationEvent> {
    let Some(previous) = previous else {
        return Vec::new();
    };

    let mut events = Vec::new();

    if previous.technician_id.is_none() && current.technician_id.is_some() {
        events.push(NotificationEvent {
            booking_id: current.booking_id.clone(),
            event_key: TECH_ASSIGNED_KEY.to_string(),
            title: "Technician assigned".to_string(),
            body: "A technician has been assigned to your booking.".to_string(),
            priority: NotificationPriority::Normal,
        });
    }

    if previous.status != current.status {
        if let Some((title, body)) = status_template(current.status) {
            events.push(NotificationEvent {
                booking_id: current.booking_id.clone(),
                event_key: current.status.event_key().to_string(),
                title: title.to_string(),
                body: body.to_string(),
                priority: priority_for(current.status),
            });
        }
    }

    events
}

/// Statuses a customer should hear about. `Pending` has no template: nothing
/// has happened yet from the customer's point of view.
fn status_template(status: BookingStatus) -> Option<(&'static str, &'static str)> {
    match status {
        BookingStatus::Pending => None,
        BookingStatus::Confirmed => Some(("Booking confirmed", "Your booking has been confirmed.")),
        BookingStatus::StartJourney => Some((
            "Technician on the way",
            "Your technician has started the journey to your address.",
        )),
        BookingStatus::Reached => Some((
            "Technician arrived",
            "Your technician has reached your address.",
        )),
        BookingStatus::StartService => {
            Some(("Service started", "Work on your vehicle has started."))
        }
        BookingStatus::Completed => Some(("Service completed", "Your vehicle is ready.")),
        BookingStatus::Cancelled => {
            Some(("Booking cancelled", "Your booking has been cancelled."))
        }
    }
}

fn priority_for(status: BookingStatus) -> NotificationPriority {
    match status {
        BookingStatus::Reached | BookingStatus::StartService | BookingStatus::Completed => {
            NotificationPriority::High
        }
        _ => NotificationPriority::Normal,
    }
}
