use serde::{Deserialize, Serialize};

use crate::models::coordinate::Coordinate;

/// Status line shown when the directions service reports no path between the
/// two points. Not an error: the overlay simply stays empty.
pub const NO_ROUTE_TEXT: &str = "route not available";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RouteResult {
    pub polyline: Vec<Coordinate>,
    pub distance_text: String,
    pub eta_text: Option<String>,
}

impl RouteResult {
    pub fn unavailable() -> Self {
        Self {
            polyline: Vec::new(),
            distance_text: NO_ROUTE_TEXT.to_string(),
            eta_text: None,
        }
    }
}
