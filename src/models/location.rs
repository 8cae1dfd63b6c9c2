//! Location model: resolved coordinates and the location parameter of an intent

use serde::{Deserialize, Serialize};

/// Number of decimal digits coordinates are rounded to
const COORDINATE_PRECISION: i32 = 7;

/// Geographic coordinates resolved by the geocoder
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct Coordinates {
    /// Latitude in decimal degrees
    lat: f64,
    /// Longitude in decimal degrees
    lng: f64,
}

impl Coordinates {
    /// Create coordinates, rounding both axes to 7 decimal digits
    #[must_use]
    pub fn new(lat: f64, lng: f64) -> Self {
        Self {
            lat: round_to(lat, COORDINATE_PRECISION),
            lng: round_to(lng, COORDINATE_PRECISION),
        }
    }

    #[must_use]
    pub fn lat(&self) -> f64 {
        self.lat
    }

    #[must_use]
    pub fn lng(&self) -> f64 {
        self.lng
    }

    /// Format as the `lat,lng` pair used in provider URLs
    #[must_use]
    pub fn to_query_pair(&self) -> String {
        format!("{},{}", self.lat, self.lng)
    }
}

fn round_to(value: f64, digits: i32) -> f64 {
    let multiplier = 10_f64.powi(digits);
    (value * multiplier).round() / multiplier
}

/// Location as supplied by the conversational platform
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(untagged)]
pub enum LocationParam {
    /// Free-text location, e.g. "Amsterdam"
    Name(String),
    /// Structured location object; only the city is used
    Structured {
        city: String,
    },
}

impl LocationParam {
    /// Canonical name passed to the geocoder
    #[must_use]
    pub fn canonical_name(&self) -> &str {
        match self {
            LocationParam::Name(name) => name,
            LocationParam::Structured { city } => city,
        }
    }

    /// Empty strings are how the platform says "no location"
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.canonical_name().trim().is_empty()
    }
}
