use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::Json;
use axum::Router;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::AppError;
use crate::models::coordinate::Coordinate;
use crate::session::{SessionView, TrackingSession};
use crate::state::{AppState, SessionEntry};

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/sessions", post(create_session))
        .route("/sessions/:id", get(get_session).delete(delete_session))
        .route("/sessions/:id/ws", get(super::ws::session_ws_handler))
}

#[derive(Deserialize)]
pub struct CreateSessionRequest {
    pub booking_id: Option<String>,
    pub technician_id: Option<String>,
    pub customer: CustomerPoint,
}

/// Deserialized separately from [`Coordinate`] so the finite check runs before
/// a session exists.
#[derive(Deserialize)]
pub struct CustomerPoint {
    pub latitude: f64,
    pub longitude: f64,
}

#[derive(Serialize)]
struct SessionCreated {
    id: Uuid,
}

async fn create_session(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<CreateSessionRequest>,
) -> Result<Json<SessionCreated>, AppError> {
    let customer = Coordinate::new(payload.customer.latitude, payload.customer.longitude)
        .ok_or_else(|| AppError::BadRequest("customer coordinate must be finite".to_string()))?;

    let session = TrackingSession::start(
        state.hub.clone(),
        state.new_estimator(),
        state.metrics.clone(),
        payload.technician_id,
        customer,
    );

    let id = Uuid::new_v4();
    state.sessions.insert(
        id,
        SessionEntry {
            booking_id: payload.booking_id,
            session,
        },
    );
    state.metrics.active_sessions.inc();

    Ok(Json(SessionCreated { id }))
}

async fn get_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<Json<SessionView>, AppError> {
    let entry = state
        .sessions
        .get(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id} not found")))?;

    Ok(Json(entry.session.view()))
}

async fn delete_session(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> Result<StatusCode, AppError> {
    let (_, mut entry) = state
        .sessions
        .remove(&id)
        .ok_or_else(|| AppError::NotFound(format!("session {id} not found")))?;

    entry.session.stop().await;
    state.metrics.active_sessions.dec();

    Ok(StatusCode::NO_CONTENT)
}
