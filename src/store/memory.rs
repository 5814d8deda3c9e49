use async_trait::async_trait;
use haversine::{Location as HaversineLocation, Units, distance};
use std::path::Path;
use tracing::{debug, info, warn};

use super::StopStore;
use crate::models::{ProximityQuery, ProximityResult, StopRecord};
use crate::{BusArrivalError, Result};

/// Stops held in memory, searched with great-circle distances
pub struct InMemoryStopStore {
    stops: Vec<StopRecord>,
}

impl InMemoryStopStore {
    #[must_use]
    pub fn new(stops: Vec<StopRecord>) -> Self {
        Self { stops }
    }

    /// Load a JSON array of stop documents
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let contents = tokio::fs::read_to_string(path).await.map_err(|e| {
            BusArrivalError::config(format!("Failed to read {}: {e}", path.display()))
        })?;
        let stops: Vec<StopRecord> = serde_json::from_str(&contents).map_err(|e| {
            BusArrivalError::config(format!("Failed to parse {}: {e}", path.display()))
        })?;

        if stops.is_empty() {
            warn!("{} contains no bus stops", path.display());
        }
        info!("Loaded {} bus stops from {}", stops.len(), path.display());
        Ok(Self::new(stops))
    }
}

fn distance_meters(query: &ProximityQuery, stop: &StopRecord) -> f64 {
    let from = HaversineLocation {
        latitude: query.latitude,
        longitude: query.longitude,
    };
    let to = HaversineLocation {
        latitude: stop.latitude,
        longitude: stop.longitude,
    };
    distance(from, to, Units::Kilometers) * 1000.0
}

#[async_trait]
impl StopStore for InMemoryStopStore {
    async fn stops_within(&self, query: &ProximityQuery) -> Result<Vec<ProximityResult>> {
        let results: Vec<ProximityResult> = self
            .stops
            .iter()
            .map(|stop| ProximityResult::new(stop.clone(), distance_meters(query, stop)))
            .filter(|result| result.is_within(query.radius_meters))
            .collect();

        debug!(
            "{} of {} stops within {}m",
            results.len(),
            self.stops.len(),
            query.radius_meters
        );
        Ok(results)
    }
}
