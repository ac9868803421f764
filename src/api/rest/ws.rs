use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket, WebSocketUpgrade};
use axum::extract::{Path, State};
use axum::response::IntoResponse;
use futures::SinkExt;
use futures::StreamExt;
use tokio::sync::watch;
use tokio_stream::wrappers::WatchStream;
use tracing::{info, warn};
use uuid::Uuid;

use crate::error::AppError;
use crate::session::SessionView;
use crate::state::AppState;

/// Streams view updates for one session. The stream opens with the current
/// view, so a screen reconnecting mid-journey is never blank.
pub async fn session_ws_handler(
    ws: WebSocketUpgrade,
    Path(id): Path<Uuid>,
    State(state): State<Arc<AppState>>,
) -> Result<impl IntoResponse, AppError> {
    let view_rx = state
        .sessions
        .get(&id)
        .map(|entry| entry.session.subscribe())
        .ok_or_else(|| AppError::NotFound(format!("session {id} not found")))?;

    Ok(ws.on_upgrade(move |socket| handle_socket(socket, view_rx)))
}

async fn handle_socket(socket: WebSocket, view_rx: watch::Receiver<SessionView>) {
    let (mut sender, mut receiver) = socket.split();
    let mut views = WatchStream::new(view_rx);

    info!("tracking websocket client connected");

    let send_task = tokio::spawn(async move {
        while let Some(view) = views.next().await {
            let json = match serde_json::to_string(&view) {
                Ok(json) => json,
                Err(err) => {
                    warn!(error = %err, "failed to serialize session view for ws");
                    continue;
                }
            };

            if sender.send(Message::Text(json.into())).await.is_err() {
                break;
            }
        }
    });

    let recv_task = tokio::spawn(async move {
        while let Some(Ok(_msg)) = receiver.next().await {}
    });

    tokio::select! {
        _ = send_task => {},
        _ = recv_task => {},
    }

    info!("tracking websocket client disconnected");
}
