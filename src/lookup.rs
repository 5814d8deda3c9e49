//! Nearby stop lookup with live arrival enrichment
//!
//! One pass per request: query the stop store, order matches nearest first,
//! then fetch arrivals for every stop. Arrival calls run with bounded
//! concurrency but results are always emitted in distance order. The first
//! failure aborts the whole lookup.

use chrono::Utc;
use futures::stream::{self, StreamExt, TryStreamExt};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, instrument, warn};

use crate::arrivals::ArrivalSource;
use crate::models::{ProximityQuery, ProximityResult, StopArrivalSummary, sort_by_distance};
use crate::store::StopStore;
use crate::Result;

/// Finds nearby stops and attaches arrival predictions
pub struct ArrivalLookup {
    store: Arc<dyn StopStore>,
    arrivals: Arc<dyn ArrivalSource>,
    concurrency: usize,
}

impl ArrivalLookup {
    /// `concurrency` is the number of arrival calls in flight at once; 1 makes
    /// enrichment strictly sequential.
    #[must_use]
    pub fn new(
        store: Arc<dyn StopStore>,
        arrivals: Arc<dyn ArrivalSource>,
        concurrency: usize,
    ) -> Self {
        Self {
            store,
            arrivals,
            concurrency: concurrency.max(1),
        }
    }

    /// Stops strictly within the radius, nearest first
    pub async fn nearby_stops(&self, query: &ProximityQuery) -> Result<Vec<ProximityResult>> {
        if query.radius_meters <= 0.0 {
            debug!("Radius {}m matches nothing", query.radius_meters);
            return Ok(Vec::new());
        }

        let mut stops = self.store.stops_within(query).await?;

        let returned = stops.len();
        stops.retain(|stop| stop.is_within(query.radius_meters));
        if stops.len() != returned {
            warn!(
                "Store returned {} stops outside the {}m radius",
                returned - stops.len(),
                query.radius_meters
            );
        }

        sort_by_distance(&mut stops);
        Ok(stops)
    }

    /// Arrival summary for a single stop
    pub async fn enrich(&self, stop: ProximityResult) -> Result<StopArrivalSummary> {
        let response = self.arrivals.arrivals(&stop.stop.stop_code).await?;
        let predictions = response.to_predictions(Utc::now())?;

        Ok(StopArrivalSummary {
            stop_code: stop.stop.stop_code,
            description: stop.stop.description,
            predictions,
        })
    }

    /// Run the full lookup for one request
    #[instrument(name = "arrival_lookup", skip(self), fields(lon = query.longitude, lat = query.latitude, range = query.radius_meters))]
    pub async fn lookup(&self, query: &ProximityQuery) -> Result<Vec<StopArrivalSummary>> {
        let start_time = Instant::now();

        let stops = self.nearby_stops(query).await?;
        debug!("Enriching {} stops", stops.len());

        let summaries: Vec<StopArrivalSummary> = stream::iter(stops)
            .map(|stop| self.enrich(stop))
            .buffered(self.concurrency)
            .try_collect()
            .await?;

        info!(
            "Resolved arrivals for {} stops in {:.3}s",
            summaries.len(),
            start_time.elapsed().as_secs_f64()
        );
        Ok(summaries)
    }
}
