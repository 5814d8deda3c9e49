//! Error types and HTTP mapping for the bus arrival service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

/// Main error type for the bus arrival service
#[derive(Error, Debug)]
pub enum BusArrivalError {
    /// Missing, empty or unusable query parameters
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// The stop store query failed
    #[error("Stop query failed: {message}")]
    UpstreamQuery { message: String },

    /// The arrival API call failed
    #[error("Arrival lookup failed: {message}")]
    UpstreamEnrichment { message: String },

    /// The arrival API answered with a payload we cannot use
    #[error("Malformed arrival data: {message}")]
    MalformedUpstreamData { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl BusArrivalError {
    /// Create a new invalid request error
    pub fn invalid_request<S: Into<String>>(message: S) -> Self {
        Self::InvalidRequest {
            message: message.into(),
        }
    }

    /// Create a new store query error
    pub fn upstream_query<S: Into<String>>(message: S) -> Self {
        Self::UpstreamQuery {
            message: message.into(),
        }
    }

    /// Create a new arrival API error
    pub fn upstream_enrichment<S: Into<String>>(message: S) -> Self {
        Self::UpstreamEnrichment {
            message: message.into(),
        }
    }

    /// Create a new malformed upstream data error
    pub fn malformed<S: Into<String>>(message: S) -> Self {
        Self::MalformedUpstreamData {
            message: message.into(),
        }
    }

    /// Create a new configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// HTTP status the error surfaces as
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            BusArrivalError::InvalidRequest { .. } => StatusCode::BAD_REQUEST,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Body text shown to the caller. Server errors carry no body so
    /// upstream details never leak.
    #[must_use]
    pub fn user_message(&self) -> Option<&'static str> {
        match self {
            BusArrivalError::InvalidRequest { .. } => Some("Bad Request"),
            _ => None,
        }
    }
}

impl IntoResponse for BusArrivalError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        match self.user_message() {
            Some(message) => {
                tracing::debug!(error = %self, "rejected request");
                (status, message).into_response()
            }
            None => {
                tracing::error!(error = %self, "request failed");
                status.into_response()
            }
        }
    }
}
