pub mod polyline;

use std::sync::Mutex;
use std::time::{Duration, Instant};

use reqwest::Client;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::coordinate::Coordinate;
use crate::models::route::RouteResult;

pub const GOOGLE_DIRECTIONS_URL: &str = "https://maps.googleapis.com/maps/api/directions/json";

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("coordinates must be finite")]
    NonFiniteCoordinate,

    #[error("directions request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("directions service returned status {0}")]
    ServiceStatus(String),
}

#[derive(Debug, Clone)]
pub struct RouteEstimatorConfig {
    /// Without a key the estimator short-circuits: no network call, no error.
    pub api_key: Option<String>,
    pub base_url: String,
    /// Minimum wall-clock gap between request starts. The original product
    /// used 30s on the booking card and 60s on the full-screen map; both are
    /// just values of this knob.
    pub min_interval: Duration,
}

/// Tracks the rate window and the single-in-flight guard. The window is
/// measured from request start, not completion, so a slow response does not
/// stretch the interval.
struct Gate {
    last_start: Option<Instant>,
    in_flight: bool,
}

impl Gate {
    fn try_begin(&mut self, min_interval: Duration, now: Instant) -> bool {
        if self.in_flight {
            return false;
        }
        if let Some(last) = self.last_start {
            if now.duration_since(last) < min_interval {
                return false;
            }
        }
        self.last_start = Some(now);
        self.in_flight = true;
        true
    }

    fn finish(&mut self) {
        self.in_flight = false;
    }
}

/// Releases the in-flight slot when the request ends, including when the
/// `try_compute` future is dropped mid-request by a stopping session. Without
/// this, a cancelled request would leave the gate closed forever.
struct InFlightGuard<'a> {
    gate: &'a Mutex<Gate>,
}

impl Drop for InFlightGuard<'_> {
    fn drop(&mut self) {
        if let Ok(mut gate) = self.gate.lock() {
            gate.finish();
        }
    }
}

/// Computes routes against an external directions API. Calls blocked by the
/// rate window or an in-flight request are dropped (`Ok(None)`), never queued.
pub struct RouteEstimator {
    client: Client,
    config: RouteEstimatorConfig,
    gate: Mutex<Gate>,
}

impl RouteEstimator {
    pub fn new(config: RouteEstimatorConfig) -> Self {
        Self::with_client(Client::new(), config)
    }

    /// Builds an estimator over an existing client, so per-session estimators
    /// can share one connection pool while keeping their own rate gates.
    pub fn with_client(client: Client, config: RouteEstimatorConfig) -> Self {
        Self {
            client,
            config,
            gate: Mutex::new(Gate {
                last_start: None,
                in_flight: false,
            }),
        }
    }

    /// `Ok(Some(route))` on a fresh result, `Ok(None)` when the call was
    /// skipped (no API key, rate window, or a request already in flight),
    /// `Err` on transport failure or a non-OK service status. Callers keep
    /// their previous route on `Err`.
    pub async fn try_compute(
        &self,
        origin: Coordinate,
        destination: Coordinate,
    ) -> Result<Option<RouteResult>, RouteError> {
        if !origin.is_finite() || !destination.is_finite() {
            return Err(RouteError::NonFiniteCoordinate);
        }

        let Some(api_key) = self.config.api_key.clone() else {
            debug!("no directions api key configured; skipping route computation");
            return Ok(None);
        };

        {
            let mut gate = self.gate.lock().expect("route gate poisoned");
            if !gate.try_begin(self.config.min_interval, Instant::now()) {
                debug!("route request dropped by rate gate");
                return Ok(None);
            }
        }

        let _guard = InFlightGuard { gate: &self.gate };
        let result = self.request_route(origin, destination, &api_key).await;

        result.map(Some)
    }

    async fn request_route(
        &self,
        origin: Coordinate,
        destination: Coordinate,
        api_key: &str,
    ) -> Result<RouteResult, RouteError> {
        let response = self
            .client
            .get(&self.config.base_url)
            .query(&[
                ("origin", format!("{},{}", origin.latitude, origin.longitude)),
                (
                    "destination",
                    format!("{},{}", destination.latitude, destination.longitude),
                ),
                ("key", api_key.to_string()),
                ("avoid", "tolls".to_string()),
                ("units", "metric".to_string()),
            ])
            .send()
            .await?
            .error_for_status()?
            .json::<DirectionsResponse>()
            .await?;

        interpret(response)
    }
}

#[derive(Debug, Deserialize)]
struct DirectionsResponse {
    status: String,
    #[serde(default)]
    routes: Vec<DirectionsRoute>,
}

#[derive(Debug, Deserialize)]
struct DirectionsRoute {
    overview_polyline: EncodedPolyline,
    #[serde(default)]
    legs: Vec<RouteLeg>,
}

#[derive(Debug, Deserialize)]
struct EncodedPolyline {
    points: String,
}

#[derive(Debug, Deserialize)]
struct RouteLeg {
    distance: Option<TextValue>,
    duration: Option<TextValue>,
}

#[derive(Debug, Deserialize)]
struct TextValue {
    text: String,
}

fn interpret(response: DirectionsResponse) -> Result<RouteResult, RouteError> {
    match response.status.as_str() {
        "OK" => {
            // First candidate route wins; the service orders them by preference.
            let Some(route) = response.routes.into_iter().next() else {
                return Ok(RouteResult::unavailable());
            };

            let polyline = polyline::decode(&route.overview_polyline.points);
            let first_leg = route.legs.into_iter().next();
            let (distance_text, eta_text) = match first_leg {
                Some(leg) => (
                    leg.distance.map(|d| d.text).unwrap_or_default(),
                    leg.duration.map(|d| d.text),
                ),
                None => (String::new(), None),
            };

            Ok(RouteResult {
                polyline,
                distance_text,
                eta_text,
            })
        }
        "ZERO_RESULTS" => Ok(RouteResult::unavailable()),
        other => Err(RouteError::ServiceStatus(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, Instant};

    use serde_json::json;

    use super::{interpret, DirectionsResponse, Gate, RouteError};
    use crate::models::route::NO_ROUTE_TEXT;

    fn gate() -> Gate {
        Gate {
            last_start: None,
            in_flight: false,
        }
    }

    #[test]
    fn gate_blocks_within_min_interval() {
        let mut gate = gate();
        let start = Instant::now();
        let window = Duration::from_secs(30);

        assert!(gate.try_begin(window, start));
        gate.finish();

        assert!(!gate.try_begin(window, start + Duration::from_secs(10)));
        assert!(gate.try_begin(window, start + Duration::from_secs(30)));
    }

    #[test]
    fn gate_blocks_while_in_flight_even_past_window() {
        let mut gate = gate();
        let start = Instant::now();
        let window = Duration::from_secs(30);

        assert!(gate.try_begin(window, start));
        assert!(!gate.try_begin(window, start + Duration::from_secs(120)));

        gate.finish();
        assert!(gate.try_begin(window, start + Duration::from_secs(120)));
    }

    #[test]
    fn gate_window_runs_from_request_start() {
        let mut gate = gate();
        let start = Instant::now();
        let window = Duration::from_secs(30);

        assert!(gate.try_begin(window, start));
        // Finished 25s in; the next slot is still measured from start.
        gate.finish();
        assert!(gate.try_begin(window, start + Duration::from_secs(31)));
    }

    fn parse(body: serde_json::Value) -> DirectionsResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn ok_response_yields_decoded_route() {
        let response = parse(json!({
            "status": "OK",
            "routes": [{
                "overview_polyline": { "points": "_p~iF~ps|U_ulLnnqC" },
                "legs": [{
                    "distance": { "text": "6.2 km" },
                    "duration": { "text": "14 mins" }
                }]
            }]
        }));

        let route = interpret(response).unwrap();
        assert_eq!(route.distance_text, "6.2 km");
        assert_eq!(route.eta_text.as_deref(), Some("14 mins"));
        assert_eq!(route.polyline.len(), 2);
    }

    #[test]
    fn eta_is_optional() {
        let response = parse(json!({
            "status": "OK",
            "routes": [{
                "overview_polyline": { "points": "_p~iF~ps|U" },
                "legs": [{ "distance": { "text": "1.0 km" } }]
            }]
        }));

        let route = interpret(response).unwrap();
        assert_eq!(route.distance_text, "1.0 km");
        assert!(route.eta_text.is_none());
    }

    #[test]
    fn zero_results_is_not_an_error() {
        let response = parse(json!({ "status": "ZERO_RESULTS", "routes": [] }));

        let route = interpret(response).unwrap();
        assert!(route.polyline.is_empty());
        assert_eq!(route.distance_text, NO_ROUTE_TEXT);
    }

    #[test]
    fn unexpected_status_is_an_error() {
        let response = parse(json!({ "status": "REQUEST_DENIED", "routes": [] }));

        match interpret(response) {
            Err(RouteError::ServiceStatus(status)) => assert_eq!(status, "REQUEST_DENIED"),
            other => panic!("expected service status error, got {other:?}"),
        }
    }
}
