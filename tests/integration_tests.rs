//! Integration tests for the BusArrival HTTP surface

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use axum::response::Response;
use bus_arrival::arrivals::decode_response;
use bus_arrival::{
    ArrivalLookup, ArrivalSource, BusArrivalError, BusArrivalResponse, InMemoryStopStore,
    ProximityQuery, ProximityResult, StopRecord, StopStore, web,
};
use chrono::{Duration, SecondsFormat, Utc};
use serde_json::Value;
use tower::ServiceExt;

/// Store returning fixed rows regardless of the query
struct FixedStore(Vec<ProximityResult>);

#[async_trait]
impl StopStore for FixedStore {
    async fn stops_within(
        &self,
        _query: &ProximityQuery,
    ) -> bus_arrival::Result<Vec<ProximityResult>> {
        Ok(self.0.clone())
    }
}

/// Arrival API stand-in keyed by stop code
struct CannedArrivals(HashMap<String, String>);

#[async_trait]
impl ArrivalSource for CannedArrivals {
    async fn arrivals(&self, stop_code: &str) -> bus_arrival::Result<BusArrivalResponse> {
        let body = self.0.get(stop_code).ok_or_else(|| {
            BusArrivalError::upstream_enrichment(format!("404 Not Found for {stop_code}"))
        })?;
        decode_response(body)
    }
}

fn arrival_body(service: &str, minutes: [i64; 3]) -> String {
    let slot = |m: i64| {
        (Utc::now() + Duration::minutes(m) + Duration::seconds(10))
            .to_rfc3339_opts(SecondsFormat::Secs, true)
    };
    format!(
        r#"{{"Services": [{{"ServiceNo": "{service}", "NextBus": {{"EstimatedArrival": "{}"}}, "NextBus2": {{"EstimatedArrival": "{}"}}, "NextBus3": {{"EstimatedArrival": "{}"}}}}]}}"#,
        slot(minutes[0]),
        slot(minutes[1]),
        slot(minutes[2])
    )
}

fn stop(code: &str, distance: f64) -> ProximityResult {
    ProximityResult::new(
        StopRecord::new(code, &format!("Stop {code}"), 103.8, 1.35),
        distance,
    )
}

fn app(store: impl StopStore + 'static, arrivals: CannedArrivals) -> axum::Router {
    web::app(Arc::new(ArrivalLookup::new(
        Arc::new(store),
        Arc::new(arrivals),
        4,
    )))
}

async fn get(app: axum::Router, uri: &str) -> Response {
    app.oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap()
}

async fn body_string(response: Response) -> String {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    String::from_utf8(bytes.to_vec()).unwrap()
}

/// Missing or empty parameters are rejected with a plain-text 400
#[tokio::test]
async fn test_missing_parameters_return_bad_request() {
    let uris = [
        "/api/BusArrival",
        "/api/BusArrival?lat=1.35&range=50",
        "/api/BusArrival?lon=103.8&range=50",
        "/api/BusArrival?lon=103.8&lat=1.35",
        "/api/BusArrival?lon=&lat=1.35&range=50",
        "/api/BusArrival?lon=103.8&lat=1.35&range=",
    ];

    for uri in uris {
        let app = app(FixedStore(vec![stop("01012", 10.0)]), CannedArrivals(HashMap::new()));
        let response = get(app, uri).await;

        assert_eq!(response.status(), StatusCode::BAD_REQUEST, "{uri}");
        let content_type = response.headers()[header::CONTENT_TYPE].to_str().unwrap().to_string();
        assert!(content_type.starts_with("text/plain"), "{uri}: {content_type}");
        assert_eq!(body_string(response).await, "Bad Request", "{uri}");
    }
}

/// Non-numeric input is rejected before the store is queried
#[tokio::test]
async fn test_non_numeric_parameters_return_bad_request() {
    let app = app(FixedStore(Vec::new()), CannedArrivals(HashMap::new()));
    let response = get(app, "/api/BusArrival?lon=103.8&lat=north&range=50").await;

    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    assert_eq!(body_string(response).await, "Bad Request");
}

/// An empty store yields an empty JSON array
#[tokio::test]
async fn test_empty_store_returns_empty_array() {
    let app = app(InMemoryStopStore::new(Vec::new()), CannedArrivals(HashMap::new()));
    let response = get(app, "/api/BusArrival?lon=103.8&lat=1.35&range=50").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers()[header::CONTENT_TYPE].to_str().unwrap(),
        "application/json"
    );
    assert_eq!(body_string(response).await, "[]");
}

/// A negative range is a valid search that matches nothing
#[tokio::test]
async fn test_negative_range_returns_empty_array() {
    let app = app(FixedStore(vec![stop("01012", 10.0)]), CannedArrivals(HashMap::new()));
    let response = get(app, "/api/BusArrival?lon=103.8&lat=1.35&range=-1").await;

    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_string(response).await, "[]");
}

/// Two stops come back nearest first, each with one service and three arrivals
#[tokio::test]
async fn test_end_to_end_two_stops_in_distance_order() {
    let store = FixedStore(vec![stop("FAR", 30.0), stop("NEAR", 10.0)]);
    let arrivals = CannedArrivals(HashMap::from([
        ("NEAR".to_string(), arrival_body("15", [2, 9, 17])),
        ("FAR".to_string(), arrival_body("961M", [5, 12, 25])),
    ]));

    let response = get(app(store, arrivals), "/api/BusArrival?lon=103.8&lat=1.35&range=50").await;
    assert_eq!(response.status(), StatusCode::OK);

    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let summaries = json.as_array().unwrap();
    assert_eq!(summaries.len(), 2);

    assert_eq!(summaries[0]["BusStopCode"], "NEAR");
    assert_eq!(summaries[0]["Description"], "Stop NEAR");
    assert_eq!(summaries[0]["BusDetails"][0]["ServiceNo"], "15");
    assert_eq!(
        summaries[0]["BusDetails"][0]["ArrivalTimeInMinutes"],
        serde_json::json!([2, 9, 17])
    );

    assert_eq!(summaries[1]["BusStopCode"], "FAR");
    let far = summaries[1]["BusDetails"].as_array().unwrap();
    assert_eq!(far.len(), 1);
    assert_eq!(far[0]["ArrivalTimeInMinutes"].as_array().unwrap().len(), 3);
}

/// Real distances from the in-memory store decide which stops are returned
#[tokio::test]
async fn test_in_memory_store_respects_range() {
    let store = InMemoryStopStore::new(vec![
        StopRecord::new("01012", "Hotel Grand Pacific", 103.8002, 1.35),
        StopRecord::new("01013", "St. Joseph's Ch", 103.81, 1.35),
    ]);
    let arrivals = CannedArrivals(HashMap::from([
        ("01012".to_string(), arrival_body("15", [1, 2, 3])),
        ("01013".to_string(), arrival_body("15", [1, 2, 3])),
    ]));

    let response = get(app(store, arrivals), "/api/BusArrival?lon=103.8&lat=1.35&range=50").await;
    let json: Value = serde_json::from_str(&body_string(response).await).unwrap();
    let codes: Vec<&str> = json
        .as_array()
        .unwrap()
        .iter()
        .map(|s| s["BusStopCode"].as_str().unwrap())
        .collect();
    assert_eq!(codes, vec!["01012"]);
}

/// One failed arrival call fails the whole request
#[tokio::test]
async fn test_enrichment_failure_returns_server_error() {
    let store = FixedStore(vec![stop("OK", 10.0), stop("MISSING", 20.0)]);
    let arrivals = CannedArrivals(HashMap::from([(
        "OK".to_string(),
        arrival_body("15", [1, 2, 3]),
    )]));

    let response = get(app(store, arrivals), "/api/BusArrival?lon=103.8&lat=1.35&range=50").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
    assert!(!body_string(response).await.contains("OK"));
}

/// Malformed upstream payloads are a server error, not a partial result
#[tokio::test]
async fn test_malformed_arrival_data_returns_server_error() {
    let store = FixedStore(vec![stop("01012", 10.0)]);
    let arrivals = CannedArrivals(HashMap::from([(
        "01012".to_string(),
        r#"{"Services": [{"ServiceNo": "15", "NextBus": {"EstimatedArrival": ""}}]}"#.to_string(),
    )]));

    let response = get(app(store, arrivals), "/api/BusArrival?lon=103.8&lat=1.35&range=50").await;
    assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
}

/// Only GET is routed
#[tokio::test]
async fn test_post_is_not_allowed() {
    let app = app(FixedStore(Vec::new()), CannedArrivals(HashMap::new()));
    let response = app
        .oneshot(
            Request::builder()
                .method("POST")
                .uri("/api/BusArrival?lon=103.8&lat=1.35&range=50")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
