use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::get;
use axum::Json;
use axum::Router;
use serde::Serialize;
use serde_json::Value;

use crate::error::AppError;
use crate::models::coordinate::LocationUpdate;
use crate::state::AppState;

pub fn router() -> Router<Arc<AppState>> {
    Router::new().route(
        "/technicians/:id/location",
        get(last_location)
            .patch(push_location)
            .delete(mark_offline),
    )
}

#[derive(Serialize)]
struct PushLocationResponse {
    offline: bool,
    update: Option<LocationUpdate>,
}

/// Raw payload from a technician device. Any of the supported coordinate
/// shapes is accepted; an unusable payload flips the technician to offline
/// rather than erroring, matching the feed contract.
async fn push_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(payload): Json<Value>,
) -> Json<PushLocationResponse> {
    let update = state.hub.publish(&id, &payload);
    let outcome = if update.is_some() { "accepted" } else { "rejected" };
    state
        .metrics
        .location_updates_total
        .with_label_values(&[outcome])
        .inc();

    Json(PushLocationResponse {
        offline: update.is_none(),
        update,
    })
}

async fn mark_offline(State(state): State<Arc<AppState>>, Path(id): Path<String>) -> StatusCode {
    state.hub.mark_offline(&id);
    StatusCode::NO_CONTENT
}

/// Seed read: the last-known position, if the technician has reported one.
async fn last_location(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> Result<Json<LocationUpdate>, AppError> {
    state
        .hub
        .seed(&id)
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("no known location for technician {id}")))
}
