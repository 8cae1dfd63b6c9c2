//! Geocoding
//!
//! Resolves a free-text location into coordinates. Only the first (best)
//! result is used; an empty result list means the location does not exist
//! as far as the assistant is concerned.

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument, warn};

use crate::config::GeocodingConfig;
use crate::error::FulfillmentError;
use crate::http::get_json;
use crate::models::Coordinates;

/// Anything that can turn a place name into coordinates
#[async_trait]
pub trait Geocoder: Send + Sync {
    async fn coordinates(&self, address: &str) -> crate::Result<Coordinates>;
}

/// Google Geocoding API client
pub struct GoogleGeocoder {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl GoogleGeocoder {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, config: &GeocodingConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    fn request_url(&self, address: &str) -> String {
        format!(
            "{}?address={}&key={}",
            self.base_url,
            form_encode(address),
            urlencoding::encode(&self.api_key)
        )
    }
}

/// Percent-encode with spaces as `+`
fn form_encode(value: &str) -> String {
    urlencoding::encode(value).replace("%20", "+")
}

#[async_trait]
impl Geocoder for GoogleGeocoder {
    #[instrument(skip(self))]
    async fn coordinates(&self, address: &str) -> crate::Result<Coordinates> {
        debug!("Geocoding location: '{}'", address);

        let response: GeocodeResponse =
            get_json(&self.client, &self.request_url(address), "geocoding").await?;

        let Some(best) = response.results.into_iter().next() else {
            warn!("No results found for location '{}'", address);
            return Err(FulfillmentError::location_not_found(address));
        };

        let location = best.geometry.location;
        let coordinates = Coordinates::new(location.lat, location.lng);
        debug!(
            "Found location '{}' at ({}, {})",
            address,
            coordinates.lat(),
            coordinates.lng()
        );
        Ok(coordinates)
    }
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}
