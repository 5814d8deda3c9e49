use std::sync::Arc;

use axum::{
    Router,
    extract::{Query, State, rejection::QueryRejection},
    response::Json,
    routing::get,
};
use tracing::instrument;

use crate::BusArrivalError;
use crate::lookup::ArrivalLookup;
use crate::models::{LookupParams, ProximityQuery, StopArrivalSummary};

pub fn router(lookup: Arc<ArrivalLookup>) -> Router {
    Router::new()
        .route("/BusArrival", get(bus_arrival))
        .with_state(lookup)
}

#[instrument(name = "bus_arrival", skip_all)]
async fn bus_arrival(
    State(lookup): State<Arc<ArrivalLookup>>,
    params: Result<Query<LookupParams>, QueryRejection>,
) -> Result<Json<Vec<StopArrivalSummary>>, BusArrivalError> {
    let Query(params) =
        params.map_err(|e| BusArrivalError::invalid_request(e.body_text()))?;
    let query = ProximityQuery::try_from(&params)?;

    let summaries = lookup.lookup(&query).await?;
    Ok(Json(summaries))
}
