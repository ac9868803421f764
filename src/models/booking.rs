use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum BookingStatus {
    Pending,
    Confirmed,
    StartJourney,
    Reached,
    StartService,
    Completed,
    Cancelled,
}

impl BookingStatus {
    /// Stable key fragment used for notification dedup records.
    pub fn event_key(&self) -> &'static str {
        match self {
            BookingStatus::Pending => "status_pending",
            BookingStatus::Confirmed => "status_confirmed",
            BookingStatus::StartJourney => "status_start_journey",
            BookingStatus::Reached => "status_reached",
            BookingStatus::StartService => "status_start_service",
            BookingStatus::Completed => "status_completed",
            BookingStatus::Cancelled => "status_cancelled",
        }
    }
}

/// A point-in-time view of a booking as returned by the bookings source.
/// Consecutive snapshots for the same booking id are diffed to detect
/// technician assignment and status transitions.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BookingSnapshot {
    pub booking_id: String,
    pub technician_id: Option<String>,
    pub status: BookingStatus,
}
