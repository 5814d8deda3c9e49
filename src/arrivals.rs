//! Arrival prediction API client (LTA DataMall `BusArrival`)
//!
//! The upstream payload is decoded into a typed schema and then checked
//! field by field, so a missing `NextBus*` block or a garbled timestamp
//! surfaces as `MalformedUpstreamData` naming the offending service.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::Client;
use serde::Deserialize;
use std::time::Instant;
use tracing::{debug, instrument, warn};

use crate::config::ArrivalApiSettings;
use crate::models::{ArrivalMinutes, ArrivalPrediction};
use crate::{BusArrivalError, Result};

/// Body of a `BusArrival` response
#[derive(Debug, Clone, Deserialize)]
pub struct BusArrivalResponse {
    #[serde(rename = "Services")]
    pub services: Vec<ServiceArrival>,
}

/// Upcoming buses of one service at the requested stop
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceArrival {
    #[serde(rename = "ServiceNo")]
    pub service_no: Option<String>,
    #[serde(rename = "NextBus")]
    pub next_bus: Option<NextBus>,
    #[serde(rename = "NextBus2")]
    pub next_bus2: Option<NextBus>,
    #[serde(rename = "NextBus3")]
    pub next_bus3: Option<NextBus>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct NextBus {
    /// RFC 3339 timestamp; blank when no bus is scheduled in this slot
    #[serde(rename = "EstimatedArrival", default)]
    pub estimated_arrival: Option<String>,
}

/// Source of live arrival data for a stop
#[async_trait]
pub trait ArrivalSource: Send + Sync {
    async fn arrivals(&self, stop_code: &str) -> Result<BusArrivalResponse>;
}

/// Decode a raw response body
pub fn decode_response(body: &str) -> Result<BusArrivalResponse> {
    serde_json::from_str(body)
        .map_err(|e| BusArrivalError::malformed(format!("Invalid arrival response: {e}")))
}

/// Whole minutes from `now` until `estimated`. Exact half minutes round
/// towards positive infinity, so 4.5 becomes 5 and -4.5 becomes -4.
#[must_use]
pub fn minutes_until(estimated: DateTime<Utc>, now: DateTime<Utc>) -> i64 {
    let delta_ms = (estimated - now).num_milliseconds();
    (delta_ms + 30_000).div_euclid(60_000)
}

fn slot_minutes(
    service_no: &str,
    slot: &str,
    next_bus: Option<&NextBus>,
    now: DateTime<Utc>,
) -> Result<Option<i64>> {
    let next_bus = next_bus.ok_or_else(|| {
        BusArrivalError::malformed(format!("Service {service_no} is missing {slot}"))
    })?;

    let Some(estimated) = next_bus
        .estimated_arrival
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
    else {
        return Ok(None);
    };

    let estimated = DateTime::parse_from_rfc3339(estimated).map_err(|e| {
        BusArrivalError::malformed(format!(
            "Service {service_no} {slot} has invalid EstimatedArrival '{estimated}': {e}"
        ))
    })?;

    Ok(Some(minutes_until(estimated.with_timezone(&Utc), now)))
}

impl ServiceArrival {
    /// Normalize into minutes until each of the next three buses
    pub fn to_prediction(&self, now: DateTime<Utc>) -> Result<ArrivalPrediction> {
        let service_no = self
            .service_no
            .as_deref()
            .ok_or_else(|| BusArrivalError::malformed("Service is missing ServiceNo"))?;

        let minutes: ArrivalMinutes = [
            slot_minutes(service_no, "NextBus", self.next_bus.as_ref(), now)?,
            slot_minutes(service_no, "NextBus2", self.next_bus2.as_ref(), now)?,
            slot_minutes(service_no, "NextBus3", self.next_bus3.as_ref(), now)?,
        ];

        Ok(ArrivalPrediction {
            service_number: service_no.to_string(),
            minutes_until_arrival: minutes,
        })
    }
}

impl BusArrivalResponse {
    /// Predictions for every service, in upstream order
    pub fn to_predictions(&self, now: DateTime<Utc>) -> Result<Vec<ArrivalPrediction>> {
        self.services
            .iter()
            .map(|service| service.to_prediction(now))
            .collect()
    }
}

/// HTTP client for the LTA DataMall arrival endpoint
pub struct LtaArrivalClient {
    client: Client,
    base_url: String,
    api_key: String,
}

impl LtaArrivalClient {
    /// Create a new arrival API client
    pub fn new(settings: &ArrivalApiSettings) -> Result<Self> {
        let client = Client::builder()
            .timeout(settings.timeout)
            .user_agent(concat!("bus-arrival/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BusArrivalError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            base_url: settings.base_url.clone(),
            api_key: settings.api_key.clone(),
        })
    }
}

#[async_trait]
impl ArrivalSource for LtaArrivalClient {
    #[instrument(name = "bus_arrival_api", skip(self))]
    async fn arrivals(&self, stop_code: &str) -> Result<BusArrivalResponse> {
        let start_time = Instant::now();

        let response = self
            .client
            .get(&self.base_url)
            .query(&[("BusStopCode", stop_code)])
            .header("AccountKey", &self.api_key)
            .header("Accept", "application/json")
            .send()
            .await
            .map_err(|e| {
                BusArrivalError::upstream_enrichment(format!(
                    "Arrival request for stop {stop_code} failed: {e}"
                ))
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(BusArrivalError::upstream_enrichment(format!(
                "Arrival API error {status} for stop {stop_code}: {error_text}"
            )));
        }

        let body = response.text().await.map_err(|e| {
            BusArrivalError::upstream_enrichment(format!(
                "Failed to read arrival response for stop {stop_code}: {e}"
            ))
        })?;
        let arrivals = decode_response(&body)?;

        let duration = start_time.elapsed();
        debug!(
            "Stop {} has {} services ({:.3}s)",
            stop_code,
            arrivals.services.len(),
            duration.as_secs_f64()
        );
        if duration.as_secs() > 5 {
            warn!("Slow arrival API response: {:.3}s", duration.as_secs_f64());
        }

        Ok(arrivals)
    }
}
