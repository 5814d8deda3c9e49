//! Arrival predictions as returned to callers

use serde::{Deserialize, Serialize};

/// Minutes until the next three buses of one service. A slot is `None` when
/// no estimate is published for that bus.
pub type ArrivalMinutes = [Option<i64>; 3];

/// Predicted arrivals for one bus service at a stop
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct ArrivalPrediction {
    /// Service number, e.g. "961M"
    #[serde(rename = "ServiceNo")]
    pub service_number: String,
    /// Whole minutes until each of the next three buses; negative once a bus is due
    #[serde(rename = "ArrivalTimeInMinutes")]
    pub minutes_until_arrival: ArrivalMinutes,
}

/// Arrival predictions for one matched stop
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct StopArrivalSummary {
    #[serde(rename = "BusStopCode")]
    pub stop_code: String,
    #[serde(rename = "Description")]
    pub description: String,
    #[serde(rename = "BusDetails")]
    pub predictions: Vec<ArrivalPrediction>,
}
