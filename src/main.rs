mod api;
mod config;
mod error;
mod feed;
mod models;
mod notify;
mod observability;
mod route;
mod session;
mod state;

use std::sync::Arc;
use std::time::Duration;

use tracing_subscriber::EnvFilter;

use crate::notify::sink::LogSink;
use crate::notify::store::{FileRecordStore, MemoryRecordStore, NotificationRecordStore};
use crate::notify::watcher::run_booking_watcher;

#[tokio::main]
async fn main() -> Result<(), error::AppError> {
    let config = config::Config::from_env()?;

    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::new(config.log_level.clone()))
        .with_target(false)
        .compact()
        .init();

    let record_store: Arc<dyn NotificationRecordStore> = match &config.record_store_path {
        Some(path) => Arc::new(FileRecordStore::open(path).map_err(|err| {
            error::AppError::Internal(format!("failed to open record store: {err}"))
        })?),
        None => {
            tracing::warn!("NOTIFICATION_RECORDS_PATH not set; dedup records will not survive restarts");
            Arc::new(MemoryRecordStore::new())
        }
    };

    let app_state = Arc::new(state::AppState::new(
        config.estimator_config(),
        record_store,
        Arc::new(LogSink),
    ));

    if config.directions_api_key.is_none() {
        tracing::warn!("DIRECTIONS_API_KEY not set; sessions will track locations without routes");
    }

    if let Some(poll_url) = config.bookings_poll_url.clone() {
        tokio::spawn(run_booking_watcher(
            app_state.clone(),
            poll_url,
            Duration::from_secs(config.bookings_poll_interval_secs),
        ));
    } else {
        tracing::info!("BOOKINGS_POLL_URL not set; booking watcher disabled");
    }

    let app = api::rest::router(app_state.clone());

    let bind_addr = format!("0.0.0.0:{}", config.http_port);
    let listener = tokio::net::TcpListener::bind(&bind_addr)
        .await
        .map_err(|err| error::AppError::Internal(format!("failed to bind {bind_addr}: {err}")))?;

    tracing::info!(http_port = config.http_port, "http server started");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(|err| error::AppError::Internal(format!("server error: {err}")))?;

    Ok(())
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "failed to listen for shutdown signal");
    }
}
