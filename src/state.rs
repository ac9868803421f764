use std::sync::Arc;

use dashmap::DashMap;
use reqwest::Client;
use uuid::Uuid;

use crate::feed::LocationHub;
use crate::models::booking::BookingSnapshot;
use crate::notify::deduper::NotificationDeduper;
use crate::notify::sink::NotificationSink;
use crate::notify::store::NotificationRecordStore;
use crate::observability::metrics::Metrics;
use crate::route::{RouteEstimator, RouteEstimatorConfig};
use crate::session::TrackingSession;

pub struct SessionEntry {
    pub booking_id: Option<String>,
    pub session: TrackingSession,
}

pub struct AppState {
    pub hub: Arc<LocationHub>,
    pub estimator_config: RouteEstimatorConfig,
    pub http_client: Client,
    pub sessions: DashMap<Uuid, SessionEntry>,
    pub bookings: DashMap<String, BookingSnapshot>,
    pub deduper: NotificationDeduper,
    pub sink: Arc<dyn NotificationSink>,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(
        estimator_config: RouteEstimatorConfig,
        record_store: Arc<dyn NotificationRecordStore>,
        sink: Arc<dyn NotificationSink>,
    ) -> Self {
        Self {
            hub: Arc::new(LocationHub::new()),
            estimator_config,
            http_client: Client::new(),
            sessions: DashMap::new(),
            bookings: DashMap::new(),
            deduper: NotificationDeduper::new(record_store),
            sink,
            metrics: Metrics::new(),
        }
    }

    /// A fresh estimator per session: each booking's screen gets its own rate
    /// gate, so concurrent sessions never block each other's route refreshes.
    /// The connection pool is shared.
    pub fn new_estimator(&self) -> Arc<RouteEstimator> {
        Arc::new(RouteEstimator::with_client(
            self.http_client.clone(),
            self.estimator_config.clone(),
        ))
    }
}
