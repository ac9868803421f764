use std::env;
use std::path::PathBuf;
use std::time::Duration;

use crate::error::AppError;
use crate::route::{RouteEstimatorConfig, GOOGLE_DIRECTIONS_URL};

#[derive(Debug, Clone)]
pub struct Config {
    pub http_port: u16,
    pub log_level: String,
    pub directions_api_key: Option<String>,
    pub directions_base_url: String,
    /// Minimum gap between route request starts. The booking card view ran
    /// this at 30s and the full-screen map at 60s; it is one knob here.
    pub route_min_interval_secs: u64,
    pub bookings_poll_url: Option<String>,
    pub bookings_poll_interval_secs: u64,
    pub record_store_path: Option<PathBuf>,
}

impl Config {
    pub fn from_env() -> Result<Self, AppError> {
        let _ = dotenvy::dotenv();

        Ok(Self {
            http_port: parse_or_default("HTTP_PORT", 3000)?,
            log_level: env::var("LOG_LEVEL").unwrap_or_else(|_| "info".to_string()),
            directions_api_key: env::var("DIRECTIONS_API_KEY").ok().filter(|k| !k.is_empty()),
            directions_base_url: env::var("DIRECTIONS_BASE_URL")
                .unwrap_or_else(|_| GOOGLE_DIRECTIONS_URL.to_string()),
            route_min_interval_secs: parse_or_default("ROUTE_MIN_INTERVAL_SECS", 30)?,
            bookings_poll_url: env::var("BOOKINGS_POLL_URL").ok().filter(|u| !u.is_empty()),
            bookings_poll_interval_secs: parse_or_default("BOOKINGS_POLL_INTERVAL_SECS", 60)?,
            record_store_path: env::var("NOTIFICATION_RECORDS_PATH").ok().map(PathBuf::from),
        })
    }

    pub fn estimator_config(&self) -> RouteEstimatorConfig {
        RouteEstimatorConfig {
            api_key: self.directions_api_key.clone(),
            base_url: self.directions_base_url.clone(),
            min_interval: Duration::from_secs(self.route_min_interval_secs),
        }
    }
}

fn parse_or_default<T>(key: &str, default: T) -> Result<T, AppError>
where
    T: std::str::FromStr,
    T::Err: std::fmt::Display,
{
    match env::var(key) {
        Ok(raw) => raw
            .parse::<T>()
            .map_err(|err| AppError::Internal(format!("invalid {key}: {err}"))),
        Err(_) => Ok(default),
    }
}
