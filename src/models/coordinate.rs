use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// A WGS84 point. Constructed only through [`Coordinate::new`], which rejects
/// non-finite components, so downstream code can rely on finite values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Coordinate {
    pub latitude: f64,
    pub longitude: f64,
}

impl Coordinate {
    pub fn new(latitude: f64, longitude: f64) -> Option<Self> {
        if latitude.is_finite() && longitude.is_finite() {
            Some(Self {
                latitude,
                longitude,
            })
        } else {
            None
        }
    }

    pub fn is_finite(&self) -> bool {
        self.latitude.is_finite() && self.longitude.is_finite()
    }
}

/// One delivery from the technician location channel. Transient: cached in
/// memory as the last-known value, cleared when the technician goes offline.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct LocationUpdate {
    pub coordinate: Coordinate,
    pub source_timestamp: DateTime<Utc>,
}
