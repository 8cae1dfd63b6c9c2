//! Dark Sky forecast API client

use async_trait::async_trait;
use reqwest_middleware::ClientWithMiddleware;
use tracing::{debug, instrument};

use super::WeatherProvider;
use crate::config::WeatherConfig;
use crate::http::get_json;
use crate::models::{Coordinates, DataSection, ForecastResponse};

pub struct DarkSkyClient {
    client: ClientWithMiddleware,
    base_url: String,
    api_key: String,
}

impl DarkSkyClient {
    #[must_use]
    pub fn new(client: ClientWithMiddleware, config: &WeatherConfig) -> Self {
        Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone().unwrap_or_default(),
        }
    }

    fn request_url(&self, coordinates: Coordinates, include: &[DataSection]) -> String {
        let mut url = format!(
            "{}/{}/{}?units=si",
            self.base_url,
            urlencoding::encode(&self.api_key),
            coordinates.to_query_pair()
        );

        if !include.is_empty() {
            let exclude: Vec<&str> = DataSection::exclude_list(include)
                .into_iter()
                .map(DataSection::as_str)
                .collect();
            url.push_str("&exclude=");
            url.push_str(&exclude.join(","));
        }
        url
    }
}

#[async_trait]
impl WeatherProvider for DarkSkyClient {
    #[instrument(skip(self))]
    async fn forecast(
        &self,
        coordinates: Coordinates,
        include: &[DataSection],
    ) -> crate::Result<ForecastResponse> {
        let url = self.request_url(coordinates, include);
        let response: ForecastResponse = get_json(&self.client, &url, "weather").await?;

        debug!(
            currently = response.currently.is_some(),
            hourly_points = response.hourly.as_ref().map_or(0, |block| block.data.len()),
            daily_points = response.daily.as_ref().map_or(0, |block| block.data.len()),
            "Retrieved forecast"
        );
        Ok(response)
    }
}
