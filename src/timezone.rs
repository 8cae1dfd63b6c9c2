//! UTC offset lookups for a location
//!
//! Offsets come from an external time zone service; there is no local
//! time zone database.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, Utc};
use reqwest_middleware::ClientWithMiddleware;
use serde::Deserialize;
use tracing::{debug, instrument};

use crate::config::TimezoneConfig;
use crate::error::FulfillmentError;
use crate::http::get_json;
use crate::models::Coordinates;

/// Source of a location's UTC offset at a given instant
#[async_trait]
pub trait OffsetProvider: Send + Sync {
    async fn utc_offset(
        &self,
        coordinates: Coordinates,
        at: DateTime<Utc>,
    ) -> crate::Result<FixedOffset>;
}

/// Google Time Zone API client
pub struct GoogleTimezone {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl GoogleTimezone {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, config: &TimezoneConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.clone(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct TimezoneResponse {
    dst_offset: i32,
    raw_offset: i32,
}

impl TimezoneResponse {
    fn offset(&self) -> crate::Result<FixedOffset> {
        let seconds = self.dst_offset + self.raw_offset;
        FixedOffset::east_opt(seconds)
            .ok_or_else(|| FulfillmentError::api(format!("UTC offset out of range: {seconds}s")))
    }
}

#[async_trait]
impl OffsetProvider for GoogleTimezone {
    #[instrument(skip(self))]
    async fn utc_offset(
        &self,
        coordinates: Coordinates,
        at: DateTime<Utc>,
    ) -> crate::Result<FixedOffset> {
        let url = format!(
            "{}?location={}&timestamp={}&key={}",
            self.base_url,
            coordinates.to_query_pair(),
            at.timestamp(),
            urlencoding::encode(&self.api_key)
        );

        let response: TimezoneResponse = get_json(&self.client, &url, "timezone").await?;
        let offset = response.offset()?;
        debug!(%offset, "Resolved UTC offset");
        Ok(offset)
    }
}
