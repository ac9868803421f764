use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::feed::{FeedEvent, LocationHub};
use crate::models::coordinate::Coordinate;
use crate::models::route::RouteResult;
use crate::observability::metrics::Metrics;
use crate::route::{RouteError, RouteEstimator};

/// Status line surfaced when a route refresh fails. The previous route stays
/// on screen.
pub const ROUTE_FAILED_TEXT: &str = "route calculation failed";

/// Presentation state for one tracking screen, pushed over a watch channel so
/// REST reads and the WebSocket stream see the same snapshot.
#[derive(Debug, Clone, Serialize)]
pub struct SessionView {
    pub technician: Option<Coordinate>,
    pub customer: Coordinate,
    pub route: Option<RouteResult>,
    pub offline: bool,
    pub route_status: Option<String>,
    pub last_update: Option<DateTime<Utc>>,
}

impl SessionView {
    fn initial(customer: Coordinate) -> Self {
        Self {
            technician: None,
            customer,
            route: None,
            offline: false,
            route_status: None,
            last_update: None,
        }
    }
}

/// One customer screen following one technician. Owns its feed subscription
/// and its route estimator for the lifetime of the screen; sessions share
/// nothing beyond the notification record store and the HTTP connection pool.
pub struct TrackingSession {
    view_rx: watch::Receiver<SessionView>,
    shutdown_tx: watch::Sender<bool>,
    handle: Option<JoinHandle<()>>,
}

impl TrackingSession {
    /// Spawns the session task. A missing or empty technician id means no
    /// subscription at all: the view stays at its initial state until the
    /// session is recreated with an assigned technician.
    pub fn start(
        hub: Arc<LocationHub>,
        estimator: Arc<RouteEstimator>,
        metrics: Metrics,
        technician_id: Option<String>,
        customer: Coordinate,
    ) -> Self {
        let (view_tx, view_rx) = watch::channel(SessionView::initial(customer));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handle = technician_id
            .filter(|id| !id.trim().is_empty())
            .map(|technician_id| {
                tokio::spawn(run_session(
                    hub,
                    estimator,
                    metrics,
                    technician_id,
                    customer,
                    view_tx,
                    shutdown_rx,
                ))
            });

        Self {
            view_rx,
            shutdown_tx,
            handle,
        }
    }

    pub fn view(&self) -> SessionView {
        self.view_rx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<SessionView> {
        self.view_rx.clone()
    }

    /// Idempotent. Signals shutdown and waits for the task to exit, so when
    /// this returns the view can no longer change; an in-flight route
    /// response is dropped at the task's select point, never applied.
    pub async fn stop(&mut self) {
        let _ = self.shutdown_tx.send(true);
        if let Some(handle) = self.handle.take() {
            let _ = handle.await;
        }
    }
}

impl Drop for TrackingSession {
    fn drop(&mut self) {
        // Can't await here; the task sees the flag at its next select point.
        let _ = self.shutdown_tx.send(true);
    }
}

async fn run_session(
    hub: Arc<LocationHub>,
    estimator: Arc<RouteEstimator>,
    metrics: Metrics,
    technician_id: String,
    customer: Coordinate,
    view_tx: watch::Sender<SessionView>,
    mut shutdown_rx: watch::Receiver<bool>,
) {
    let mut feed = hub.subscribe(&technician_id);
    let mut view = view_tx.borrow().clone();

    // Seed read so the screen is not blank before the first live push. A live
    // coordinate always wins: the seed is applied only into an empty view.
    if view.technician.is_none() {
        if let Some(seeded) = hub.seed(&technician_id) {
            view.technician = Some(seeded.coordinate);
            view.last_update = Some(seeded.source_timestamp);
            let _ = view_tx.send(view.clone());
        }
    }

    loop {
        tokio::select! {
            // Shutdown first: once stop() is called nothing else may win.
            biased;

            changed = shutdown_rx.changed() => {
                if changed.is_err() || *shutdown_rx.borrow() {
                    break;
                }
            }
            event = feed.recv() => {
                match event {
                    Some(FeedEvent::Update(update)) => {
                        view.technician = Some(update.coordinate);
                        view.offline = false;
                        view.last_update = Some(update.source_timestamp);
                        let _ = view_tx.send(view.clone());

                        // Route refresh raced against shutdown: a response
                        // arriving after stop() never reaches the view.
                        tokio::select! {
                            biased;

                            changed = shutdown_rx.changed() => {
                                if changed.is_err() || *shutdown_rx.borrow() {
                                    break;
                                }
                            }
                            computed = estimator.try_compute(update.coordinate, customer) => {
                                apply_route(&mut view, &metrics, computed);
                                let _ = view_tx.send(view.clone());
                            }
                        }
                    }
                    Some(FeedEvent::Offline) => {
                        view.technician = None;
                        view.offline = true;
                        let _ = view_tx.send(view.clone());
                    }
                    None => {
                        warn!(%technician_id, "location feed closed; ending session");
                        break;
                    }
                }
            }
        }
    }

    debug!(%technician_id, "tracking session stopped");
}

fn apply_route(
    view: &mut SessionView,
    metrics: &Metrics,
    computed: Result<Option<RouteResult>, RouteError>,
) {
    match computed {
        Ok(Some(route)) => {
            metrics
                .route_requests_total
                .with_label_values(&["success"])
                .inc();
            view.route = Some(route);
            view.route_status = None;
        }
        Ok(None) => {
            metrics
                .route_requests_total
                .with_label_values(&["skipped"])
                .inc();
        }
        Err(err) => {
            metrics
                .route_requests_total
                .with_label_values(&["error"])
                .inc();
            debug!(error = %err, "route computation failed; keeping previous route");
            view.route_status = Some(ROUTE_FAILED_TEXT.to_string());
        }
    }
}
