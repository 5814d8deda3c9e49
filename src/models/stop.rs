//! Bus stop records as stored in the document store

use serde::{Deserialize, Serialize};

/// A bus stop as stored in the document store
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StopRecord {
    /// Five-digit stop code, e.g. "01012"
    #[serde(rename = "BusStopCode")]
    pub stop_code: String,
    /// Human readable stop name
    #[serde(rename = "Description")]
    pub description: String,
    /// Longitude in decimal degrees
    #[serde(rename = "Longitude")]
    pub longitude: f64,
    /// Latitude in decimal degrees
    #[serde(rename = "Latitude")]
    pub latitude: f64,
}

impl StopRecord {
    /// Create a new stop record
    #[must_use]
    pub fn new(stop_code: &str, description: &str, longitude: f64, latitude: f64) -> Self {
        Self {
            stop_code: stop_code.to_string(),
            description: description.to_string(),
            longitude,
            latitude,
        }
    }
}

/// A stop matched by a proximity query, with its distance from the search point
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ProximityResult {
    #[serde(flatten)]
    pub stop: StopRecord,
    /// Distance from the search point in metres
    #[serde(rename = "Range")]
    pub distance_meters: f64,
}

impl ProximityResult {
    #[must_use]
    pub fn new(stop: StopRecord, distance_meters: f64) -> Self {
        Self {
            stop,
            distance_meters,
        }
    }

    /// Whether this result honours the radius it was queried with
    #[must_use]
    pub fn is_within(&self, radius_meters: f64) -> bool {
        self.distance_meters.is_finite() && self.distance_meters < radius_meters
    }
}

/// Sorts results nearest first. The sort is stable, so equal distances keep
/// the order the store returned them in.
pub fn sort_by_distance(results: &mut [ProximityResult]) {
    results.sort_by(|a, b| a.distance_meters.total_cmp(&b.distance_meters));
}
