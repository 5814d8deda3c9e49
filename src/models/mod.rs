//! Data models for the bus arrival service
//!
//! - Stop: stored bus stops and proximity matches
//! - Arrival: per-service predictions and per-stop summaries
//! - Query: validated search parameters

pub mod arrival;
pub mod query;
pub mod stop;

pub use arrival::{ArrivalMinutes, ArrivalPrediction, StopArrivalSummary};
pub use query::{LookupParams, ProximityQuery};
pub use stop::{ProximityResult, StopRecord, sort_by_distance};
