//! Validated proximity search parameters

use serde::Deserialize;

use crate::{BusArrivalError, Result};

/// Raw `lon`, `lat` and `range` query parameters as received
#[derive(Debug, Default, Clone, Deserialize)]
pub struct LookupParams {
    pub lon: Option<String>,
    pub lat: Option<String>,
    pub range: Option<String>,
}

/// A validated search point and radius
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProximityQuery {
    /// Longitude in decimal degrees
    pub longitude: f64,
    /// Latitude in decimal degrees
    pub latitude: f64,
    /// Search radius in metres; matches are strictly closer than this, so
    /// zero or a negative radius matches nothing
    pub radius_meters: f64,
}

impl ProximityQuery {
    pub fn new(longitude: f64, latitude: f64, radius_meters: f64) -> Result<Self> {
        if !(-180.0..=180.0).contains(&longitude) {
            return Err(BusArrivalError::invalid_request(format!(
                "lon {longitude} is outside [-180, 180]"
            )));
        }
        if !(-90.0..=90.0).contains(&latitude) {
            return Err(BusArrivalError::invalid_request(format!(
                "lat {latitude} is outside [-90, 90]"
            )));
        }

        Ok(Self {
            longitude,
            latitude,
            radius_meters,
        })
    }
}

fn parse_param(name: &str, value: Option<&String>) -> Result<f64> {
    let value = value
        .map(|v| v.trim())
        .filter(|v| !v.is_empty())
        .ok_or_else(|| BusArrivalError::invalid_request(format!("{name} is required")))?;

    value
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| BusArrivalError::invalid_request(format!("{name} '{value}' is not a number")))
}

impl TryFrom<&LookupParams> for ProximityQuery {
    type Error = BusArrivalError;

    fn try_from(params: &LookupParams) -> Result<Self> {
        let longitude = parse_param("lon", params.lon.as_ref())?;
        let latitude = parse_param("lat", params.lat.as_ref())?;
        let radius_meters = parse_param("range", params.range.as_ref())?;
        Self::new(longitude, latitude, radius_meters)
    }
}
