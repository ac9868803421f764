pub mod normalize;

use chrono::Utc;
use dashmap::DashMap;
use serde_json::Value;
use tokio::sync::broadcast;
use tracing::{debug, warn};

use crate::models::coordinate::LocationUpdate;

const FEED_BUFFER: usize = 64;

/// One event on a technician's location feed. `Offline` means the channel
/// delivered no usable coordinate: either nothing at all, or a payload every
/// shape matcher rejected.
#[derive(Debug, Clone)]
pub enum FeedEvent {
    Update(LocationUpdate),
    Offline,
}

/// Receiver half of a technician subscription. Dropping it releases the
/// channel; the hub keeps no per-subscriber state.
pub struct LocationFeed {
    rx: broadcast::Receiver<FeedEvent>,
}

impl LocationFeed {
    pub async fn recv(&mut self) -> Option<FeedEvent> {
        loop {
            match self.rx.recv().await {
                Ok(event) => return Some(event),
                // Updates are applied in arrival order; if this subscriber
                // lagged, skip to the most recent events rather than erroring.
                Err(broadcast::error::RecvError::Lagged(skipped)) => {
                    warn!(skipped, "location feed subscriber lagged");
                }
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    }
}

/// Registry of per-technician location channels plus the last-known cache
/// backing seed reads. Shared across sessions behind `Arc<AppState>`.
pub struct LocationHub {
    channels: DashMap<String, broadcast::Sender<FeedEvent>>,
    last_known: DashMap<String, LocationUpdate>,
}

impl LocationHub {
    pub fn new() -> Self {
        Self {
            channels: DashMap::new(),
            last_known: DashMap::new(),
        }
    }

    /// Ingests a raw payload for a technician. Returns the normalized update
    /// on success; `None` means the payload was unusable and the technician is
    /// now considered offline (cache cleared, `Offline` broadcast).
    pub fn publish(&self, technician_id: &str, payload: &Value) -> Option<LocationUpdate> {
        match normalize::normalize_payload(payload) {
            Some(coordinate) => {
                let update = LocationUpdate {
                    coordinate,
                    source_timestamp: Utc::now(),
                };
                self.last_known.insert(technician_id.to_string(), update);
                self.broadcast(technician_id, FeedEvent::Update(update));
                Some(update)
            }
            None => {
                debug!(technician_id, "unusable location payload; marking offline");
                self.mark_offline(technician_id);
                None
            }
        }
    }

    /// Explicit offline signal: clears the cached coordinate so a later seed
    /// read does not resurrect a stale position.
    pub fn mark_offline(&self, technician_id: &str) {
        self.last_known.remove(technician_id);
        self.broadcast(technician_id, FeedEvent::Offline);
    }

    pub fn subscribe(&self, technician_id: &str) -> LocationFeed {
        let tx = self
            .channels
            .entry(technician_id.to_string())
            .or_insert_with(|| broadcast::channel(FEED_BUFFER).0);

        LocationFeed {
            rx: tx.subscribe(),
        }
    }

    /// One-shot read of the last-known position, used to seed a session before
    /// the first live push arrives.
    pub fn seed(&self, technician_id: &str) -> Option<LocationUpdate> {
        self.last_known
            .get(technician_id)
            .map(|entry| *entry.value())
    }

    fn broadcast(&self, technician_id: &str, event: FeedEvent) {
        if let Some(tx) = self.channels.get(technician_id) {
            // No subscribers is fine; the send result only reports that.
            let _ = tx.send(event);
        }
    }
}

impl Default for LocationHub {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{FeedEvent, LocationHub};

    #[tokio::test]
    async fn publish_reaches_subscriber_and_caches_seed() {
        let hub = LocationHub::new();
        let mut feed = hub.subscribe("tech-1");

        let update = hub
            .publish("tech-1", &json!({ "latitude": 17.4, "longitude": 78.4 }))
            .unwrap();
        assert_eq!(update.coordinate.latitude, 17.4);

        match feed.recv().await {
            Some(FeedEvent::Update(received)) => {
                assert_eq!(received.coordinate.longitude, 78.4);
            }
            other => panic!("expected update, got {other:?}"),
        }

        assert!(hub.seed("tech-1").is_some());
    }

    #[tokio::test]
    async fn unusable_payload_clears_cache_and_signals_offline() {
        let hub = LocationHub::new();
        hub.publish("tech-1", &json!({ "latitude": 17.4, "longitude": 78.4 }));
        assert!(hub.seed("tech-1").is_some());

        let mut feed = hub.subscribe("tech-1");
        assert!(hub.publish("tech-1", &json!({})).is_none());

        assert!(matches!(feed.recv().await, Some(FeedEvent::Offline)));
        assert!(hub.seed("tech-1").is_none());
    }

    #[test]
    fn seed_for_unknown_technician_is_empty() {
        let hub = LocationHub::new();
        assert!(hub.seed("nobody").is_none());
    }
}
