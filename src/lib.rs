//! `BusArrival` - nearby bus stops with live arrival predictions
//!
//! This library provides the request pipeline behind the `BusArrival`
//! function: parameter validation, the proximity query against the stop
//! store, and arrival enrichment from the LTA DataMall API.

pub mod api;
pub mod arrivals;
pub mod config;
pub mod error;
pub mod lookup;
pub mod models;
pub mod store;
pub mod telemetry;
pub mod web;

// Re-export core types for public API
pub use arrivals::{ArrivalSource, BusArrivalResponse, LtaArrivalClient};
pub use config::BusArrivalConfig;
pub use error::BusArrivalError;
pub use lookup::ArrivalLookup;
pub use models::{
    ArrivalPrediction, ProximityQuery, ProximityResult, StopArrivalSummary, StopRecord,
};
pub use store::{CosmosStopStore, InMemoryStopStore, StopStore};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, BusArrivalError>;
