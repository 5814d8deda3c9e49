//! Geo-indexed bus stop stores
//!
//! A store answers one question: which stops lie strictly closer than a radius
//! to a point, and how far away is each. Cosmos DB is the production store;
//! the in-memory store serves local runs from a JSON export of the same
//! documents.

use async_trait::async_trait;

use crate::Result;
use crate::models::{ProximityQuery, ProximityResult};

pub mod cosmos;
pub mod memory;

pub use cosmos::CosmosStopStore;
pub use memory::InMemoryStopStore;

#[async_trait]
pub trait StopStore: Send + Sync {
    /// Stops within `query.radius_meters` of the query point, with distances
    /// in metres. Order is store-defined.
    async fn stops_within(&self, query: &ProximityQuery) -> Result<Vec<ProximityResult>>;
}
