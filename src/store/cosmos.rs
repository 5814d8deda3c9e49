//! Cosmos DB (SQL API) stop store over the REST interface
//!
//! Queries are signed with the account master key and paged with continuation
//! tokens until the result set is exhausted.

use async_trait::async_trait;
use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use chrono::{DateTime, Utc};
use hmac::{Hmac, Mac};
use reqwest::{Client, Response};
use serde::{Deserialize, Serialize};
use sha2::Sha256;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

use super::StopStore;
use crate::config::CosmosSettings;
use crate::models::{ProximityQuery, ProximityResult};
use crate::{BusArrivalError, Result};

const API_VERSION: &str = "2018-12-31";
const CONTINUATION_HEADER: &str = "x-ms-continuation";

const PROXIMITY_SQL: &str = r#"SELECT c.BusStopCode, c.Description, c.Longitude, c.Latitude, ST_DISTANCE({"type": "Point", "coordinates": [c.Longitude, c.Latitude]}, {"type": "Point", "coordinates": [@lon, @lat]}) AS Range FROM c WHERE ST_DISTANCE({"type": "Point", "coordinates": [c.Longitude, c.Latitude]}, {"type": "Point", "coordinates": [@lon, @lat]}) < @range"#;

type HmacSha256 = Hmac<Sha256>;

/// Parameterized query body
#[derive(Debug, Serialize)]
struct QuerySpec {
    query: &'static str,
    parameters: Vec<QueryParameter>,
}

#[derive(Debug, Serialize)]
struct QueryParameter {
    name: &'static str,
    value: f64,
}

/// One page of query results
#[derive(Debug, Deserialize)]
struct QueryPage {
    #[serde(rename = "Documents")]
    documents: Vec<ProximityResult>,
}

/// Stop store backed by a Cosmos DB container
pub struct CosmosStopStore {
    client: Client,
    endpoint: String,
    resource_link: String,
    key: Vec<u8>,
}

impl CosmosStopStore {
    /// Create a new store client
    pub fn new(settings: &CosmosSettings, timeout: Duration) -> Result<Self> {
        let key = BASE64
            .decode(settings.key.trim())
            .map_err(|e| BusArrivalError::config(format!("COSMOS_KEY is not valid base64: {e}")))?;

        let client = Client::builder()
            .timeout(timeout)
            .user_agent(concat!("bus-arrival/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| BusArrivalError::config(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            resource_link: format!("dbs/{}/colls/{}", settings.database, settings.container),
            key,
        })
    }

    fn documents_url(&self) -> String {
        format!("{}/{}/docs", self.endpoint, self.resource_link)
    }

    fn query_spec(query: &ProximityQuery) -> QuerySpec {
        QuerySpec {
            query: PROXIMITY_SQL,
            parameters: vec![
                QueryParameter {
                    name: "@lon",
                    value: query.longitude,
                },
                QueryParameter {
                    name: "@lat",
                    value: query.latitude,
                },
                QueryParameter {
                    name: "@range",
                    value: query.radius_meters,
                },
            ],
        }
    }

    async fn fetch_page(&self, body: &[u8], continuation: Option<&str>) -> Result<Response> {
        let date = http_date(Utc::now());
        let token = authorization_token(&self.key, "POST", "docs", &self.resource_link, &date)?;

        let mut request = self
            .client
            .post(self.documents_url())
            .header("authorization", token)
            .header("x-ms-date", date)
            .header("x-ms-version", API_VERSION)
            .header("x-ms-documentdb-isquery", "True")
            .header("x-ms-documentdb-query-enablecrosspartition", "True")
            .header("Content-Type", "application/query+json")
            .header("Accept", "application/json")
            .body(body.to_vec());

        if let Some(token) = continuation {
            request = request.header(CONTINUATION_HEADER, token);
        }

        let response = request
            .send()
            .await
            .map_err(|e| BusArrivalError::upstream_query(format!("Cosmos DB request failed: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(BusArrivalError::upstream_query(format!(
                "Cosmos DB query error {status}: {error_text}"
            )));
        }

        Ok(response)
    }
}

#[async_trait]
impl StopStore for CosmosStopStore {
    #[instrument(name = "cosmos_query", skip(self), fields(lon = query.longitude, lat = query.latitude, range = query.radius_meters))]
    async fn stops_within(&self, query: &ProximityQuery) -> Result<Vec<ProximityResult>> {
        let start_time = Instant::now();
        let body = serde_json::to_vec(&Self::query_spec(query))
            .map_err(|e| BusArrivalError::upstream_query(format!("Failed to encode query: {e}")))?;

        let mut results = Vec::new();
        let mut continuation: Option<String> = None;
        let mut pages = 0;

        loop {
            let response = self.fetch_page(&body, continuation.as_deref()).await?;
            continuation = response
                .headers()
                .get(CONTINUATION_HEADER)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string);

            let page: QueryPage = response.json().await.map_err(|e| {
                BusArrivalError::upstream_query(format!("Failed to parse Cosmos DB response: {e}"))
            })?;
            pages += 1;
            debug!("Page {} returned {} stops", pages, page.documents.len());
            results.extend(page.documents);

            if continuation.is_none() {
                break;
            }
        }

        let duration = start_time.elapsed();
        info!(
            "Found {} stops in {} page(s) in {:.3}s",
            results.len(),
            pages,
            duration.as_secs_f64()
        );
        if duration.as_secs() > 5 {
            warn!("Slow stop query: {:.3}s", duration.as_secs_f64());
        }

        Ok(results)
    }
}

/// RFC 1123 date as expected in `x-ms-date`
fn http_date(now: DateTime<Utc>) -> String {
    now.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

/// URL-encoded master key authorization token for one request
fn authorization_token(
    key: &[u8],
    verb: &str,
    resource_type: &str,
    resource_link: &str,
    date: &str,
) -> Result<String> {
    let payload = format!(
        "{}\n{}\n{}\n{}\n\n",
        verb.to_lowercase(),
        resource_type.to_lowercase(),
        resource_link,
        date.to_lowercase()
    );

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|e| BusArrivalError::config(format!("Unusable COSMOS_KEY: {e}")))?;
    mac.update(payload.as_bytes());
    let signature = BASE64.encode(mac.finalize().into_bytes());

    Ok(urlencoding::encode(&format!("type=master&ver=1.0&sig={signature}")).into_owned())
}
