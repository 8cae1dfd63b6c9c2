//! Weather data retrieval and summaries

use async_trait::async_trait;

use crate::models::{Coordinates, DataSection, ForecastResponse};

pub mod client;
pub mod summary;

pub use client::DarkSkyClient;
pub use summary::{SummaryRule, WeatherRecord, summarize};

/// Source of forecast data for a location
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    /// Fetch the forecast, returning only the `include` sections (all when empty)
    async fn forecast(
        &self,
        coordinates: Coordinates,
        include: &[DataSection],
    ) -> crate::Result<ForecastResponse>;
}
