use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::{debug, info, warn};

use crate::models::booking::BookingSnapshot;
use crate::state::AppState;

/// Long-lived poll loop over the bookings source. Each cycle fetches the
/// current snapshot array, diffs it against the previously seen copy, and
/// dispatches whatever the deduper lets through. A failed poll is logged and
/// waits for the next tick; there is no inner retry.
pub async fn run_booking_watcher(state: Arc<AppState>, poll_url: String, interval: Duration) {
    info!(poll_url = %poll_url, interval_secs = interval.as_secs(), "booking watcher started");

    let client = Client::new();
    let mut ticker = tokio::time::interval(interval);

    loop {
        ticker.tick().await;

        match fetch_snapshots(&client, &poll_url).await {
            Ok(snapshots) => {
                let dispatched = apply_snapshots(&state, snapshots);
                if dispatched > 0 {
                    debug!(dispatched, "booking watcher dispatched notifications");
                }
            }
            Err(err) => {
                warn!(error = %err, "booking poll failed");
            }
        }
    }
}

async fn fetch_snapshots(client: &Client, url: &str) -> Result<Vec<BookingSnapshot>, reqwest::Error> {
    client
        .get(url)
        .send()
        .await?
        .error_for_status()?
        .json::<Vec<BookingSnapshot>>()
        .await
}

/// Diffs one snapshot batch against the stored previous copies and dispatches
/// the resulting events. Returns the number of notifications dispatched.
pub fn apply_snapshots(state: &AppState, snapshots: Vec<BookingSnapshot>) -> usize {
    let mut dispatched = 0;

    for current in snapshots {
        let previous = state
            .bookings
            .get(&current.booking_id)
            .map(|entry| entry.value().clone());

        for event in state.deduper.on_snapshot(&current, previous.as_ref()) {
            state
                .metrics
                .notifications_total
                .with_label_values(&[event.priority.label()])
                .inc();
            state.sink.dispatch(&event);
            dispatched += 1;
        }

        state.bookings.insert(current.booking_id.clone(), current);
    }

    dispatched
}
