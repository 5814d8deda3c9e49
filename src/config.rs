//! Configuration management for the bus arrival service
//!
//! Settings come from an optional TOML file and the process environment,
//! environment taking precedence. Variable names are read without a prefix so
//! the Functions app settings (`COSMOS_ENDPOINT`, `LTA_API_KEY`, ...) map onto
//! fields directly. The resulting struct is built once at startup and shared
//! read-only afterwards.

use crate::BusArrivalError;
use anyhow::{Context, Result};
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration structure for the bus arrival service
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusArrivalConfig {
    /// Cosmos DB account endpoint
    #[serde(default)]
    pub cosmos_endpoint: Option<String>,
    /// Cosmos DB master key (base64)
    #[serde(default)]
    pub cosmos_key: Option<String>,
    /// Cosmos DB database id
    #[serde(default)]
    pub cosmos_database: Option<String>,
    /// Cosmos DB container id
    #[serde(default)]
    pub cosmos_container: Option<String>,
    /// JSON file of bus stops, used instead of Cosmos DB when set
    #[serde(default)]
    pub stops_file: Option<String>,
    /// Arrival API endpoint
    #[serde(default)]
    pub bus_arrival_base_url: Option<String>,
    /// Arrival API account key
    #[serde(default)]
    pub lta_api_key: Option<String>,
    /// Port the Functions host forwards requests to
    #[serde(default = "default_port")]
    pub functions_customhandler_port: u16,
    /// Maximum arrival API calls in flight per request
    #[serde(default = "default_enrichment_concurrency")]
    pub enrichment_concurrency: usize,
    /// Outbound HTTP timeout in seconds
    #[serde(default = "default_request_timeout")]
    pub request_timeout_seconds: u32,
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// Log format (pretty or compact)
    #[serde(default = "default_log_format")]
    pub log_format: String,
    /// OTLP collector endpoint; trace export is off when unset
    #[serde(default)]
    pub otel_exporter_otlp_endpoint: Option<String>,
}

/// Where bus stops are read from
#[derive(Debug, Clone, PartialEq)]
pub enum StoreSettings {
    Cosmos(CosmosSettings),
    File(PathBuf),
}

/// Cosmos DB connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct CosmosSettings {
    pub endpoint: String,
    pub key: String,
    pub database: String,
    pub container: String,
}

/// Arrival API connection settings
#[derive(Debug, Clone, PartialEq)]
pub struct ArrivalApiSettings {
    pub base_url: String,
    pub api_key: String,
    pub timeout: Duration,
}

// Default value functions
fn default_port() -> u16 {
    3000
}

fn default_enrichment_concurrency() -> usize {
    4
}

fn default_request_timeout() -> u32 {
    30
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

/// Treats blank settings the same as absent ones.
fn non_empty(value: Option<&String>) -> Option<&str> {
    value.map(|v| v.trim()).filter(|v| !v.is_empty())
}

impl Default for BusArrivalConfig {
    fn default() -> Self {
        Self {
            cosmos_endpoint: None,
            cosmos_key: None,
            cosmos_database: None,
            cosmos_container: None,
            stops_file: None,
            bus_arrival_base_url: None,
            lta_api_key: None,
            functions_customhandler_port: default_port(),
            enrichment_concurrency: default_enrichment_concurrency(),
            request_timeout_seconds: default_request_timeout(),
            log_level: default_log_level(),
            log_format: default_log_format(),
            otel_exporter_otlp_endpoint: None,
        }
    }
}

impl BusArrivalConfig {
    /// Load configuration from file and environment variables
    pub fn load() -> Result<Self> {
        let config_path = std::env::var("BUS_ARRIVAL_CONFIG").ok().map(PathBuf::from);
        Self::load_from(config_path, Environment::default())
    }

    /// Load configuration from the given file and environment source
    pub fn load_from(config_path: Option<PathBuf>, environment: Environment) -> Result<Self> {
        let mut builder = Config::builder();

        let config_file = config_path.unwrap_or_else(|| PathBuf::from("bus-arrival.toml"));
        if config_file.exists() {
            builder = builder.add_source(
                File::from(config_file.clone())
                    .required(false)
                    .format(config::FileFormat::Toml),
            );
        }

        builder = builder.add_source(environment);

        let settings = builder
            .build()
            .with_context(|| "Failed to build configuration")?;

        let config: BusArrivalConfig = settings
            .try_deserialize()
            .with_context(|| "Failed to deserialize configuration")?;

        config.validate()?;

        Ok(config)
    }

    /// Validate all configuration settings
    pub fn validate(&self) -> Result<()> {
        self.store()?;
        self.arrival_api()?;
        self.validate_numeric_ranges()?;
        self.validate_string_values()?;
        Ok(())
    }

    /// Resolve which stop store to use
    pub fn store(&self) -> Result<StoreSettings> {
        let cosmos = [
            non_empty(self.cosmos_endpoint.as_ref()),
            non_empty(self.cosmos_key.as_ref()),
            non_empty(self.cosmos_database.as_ref()),
            non_empty(self.cosmos_container.as_ref()),
        ];

        if let [Some(endpoint), Some(key), Some(database), Some(container)] = cosmos {
            if !endpoint.starts_with("http://") && !endpoint.starts_with("https://") {
                return Err(BusArrivalError::config(
                    "COSMOS_ENDPOINT must be a valid HTTP or HTTPS URL",
                )
                .into());
            }
            return Ok(StoreSettings::Cosmos(CosmosSettings {
                endpoint: endpoint.trim_end_matches('/').to_string(),
                key: key.to_string(),
                database: database.to_string(),
                container: container.to_string(),
            }));
        }

        if let Some(path) = non_empty(self.stops_file.as_ref()) {
            return Ok(StoreSettings::File(PathBuf::from(path)));
        }

        if cosmos.iter().any(Option::is_some) {
            return Err(BusArrivalError::config(
                "Incomplete Cosmos DB settings. COSMOS_ENDPOINT, COSMOS_KEY, COSMOS_DATABASE and COSMOS_CONTAINER are all required.",
            )
            .into());
        }

        Err(BusArrivalError::config(
            "No stop store configured. Set the COSMOS_* settings or STOPS_FILE.",
        )
        .into())
    }

    /// Resolve the arrival API settings
    pub fn arrival_api(&self) -> Result<ArrivalApiSettings> {
        let base_url = non_empty(self.bus_arrival_base_url.as_ref())
            .ok_or_else(|| BusArrivalError::config("BUS_ARRIVAL_BASE_URL is required"))?;
        let api_key = non_empty(self.lta_api_key.as_ref())
            .ok_or_else(|| BusArrivalError::config("LTA_API_KEY is required"))?;

        if !base_url.starts_with("http://") && !base_url.starts_with("https://") {
            return Err(BusArrivalError::config(
                "BUS_ARRIVAL_BASE_URL must be a valid HTTP or HTTPS URL",
            )
            .into());
        }

        Ok(ArrivalApiSettings {
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
            timeout: self.request_timeout(),
        })
    }

    /// Outbound HTTP timeout
    #[must_use]
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_seconds.into())
    }

    /// Validate numeric configuration ranges
    fn validate_numeric_ranges(&self) -> Result<()> {
        if !(1..=64).contains(&self.enrichment_concurrency) {
            return Err(BusArrivalError::config(
                "Enrichment concurrency must be between 1 and 64",
            )
            .into());
        }

        if !(1..=300).contains(&self.request_timeout_seconds) {
            return Err(BusArrivalError::config(
                "Request timeout must be between 1 and 300 seconds",
            )
            .into());
        }

        Ok(())
    }

    /// Validate string configuration values
    fn validate_string_values(&self) -> Result<()> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.log_level.as_str()) {
            return Err(BusArrivalError::config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.log_level,
                valid_log_levels.join(", ")
            ))
            .into());
        }

        let valid_log_formats = ["pretty", "compact"];
        if !valid_log_formats.contains(&self.log_format.as_str()) {
            return Err(BusArrivalError::config(format!(
                "Invalid log format '{}'. Must be one of: {}",
                self.log_format,
                valid_log_formats.join(", ")
            ))
            .into());
        }

        Ok(())
    }
}
