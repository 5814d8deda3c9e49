use std::sync::Arc;

use anyhow::{Context, Result};
use bus_arrival::config::StoreSettings;
use bus_arrival::{
    ArrivalLookup, BusArrivalConfig, CosmosStopStore, InMemoryStopStore, LtaArrivalClient,
    StopStore, telemetry, web,
};
use tracing::info;

async fn build_store(config: &BusArrivalConfig) -> Result<Arc<dyn StopStore>> {
    let store: Arc<dyn StopStore> = match config.store()? {
        StoreSettings::Cosmos(settings) => {
            info!(
                "Using Cosmos DB container {}/{} at {}",
                settings.database, settings.container, settings.endpoint
            );
            Arc::new(CosmosStopStore::new(&settings, config.request_timeout())?)
        }
        StoreSettings::File(path) => Arc::new(InMemoryStopStore::from_file(&path).await?),
    };
    Ok(store)
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = BusArrivalConfig::load().context("Failed to load configuration")?;
    let _telemetry = telemetry::init(&config)?;

    info!("Starting bus-arrival {}", bus_arrival::VERSION);

    let store = build_store(&config).await?;
    let arrivals = Arc::new(LtaArrivalClient::new(&config.arrival_api()?)?);
    let lookup = Arc::new(ArrivalLookup::new(
        store,
        arrivals,
        config.enrichment_concurrency,
    ));

    web::run(config.functions_customhandler_port, lookup).await
}
