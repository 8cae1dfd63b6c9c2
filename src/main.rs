use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use sam_fulfillment::{
    ActionDispatcher, DarkSkyClient, FulfillmentConfig, GoogleGeocoder, GoogleTimezone,
    WeatherHandler, WeatherResolver, http, telemetry, web,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config_path = std::env::args().nth(1).map(PathBuf::from);
    let config = FulfillmentConfig::load_from_path(config_path)
        .context("Failed to load configuration")?;

    telemetry::init(&config.logging)?;
    tracing::info!(version = sam_fulfillment::VERSION, "Starting fulfillment service");

    let client = http::build_client(&config.http)?;
    let geocoder = Arc::new(GoogleGeocoder::new(client.clone(), &config.geocoding));
    let weather = Arc::new(DarkSkyClient::new(client.clone(), &config.weather));

    let mut resolver = WeatherResolver::new(geocoder, weather);
    if config.timezone.enabled {
        tracing::info!("Localizing daily forecasts through the time zone service");
        let offsets = GoogleTimezone::new(client, &config.timezone);
        resolver = resolver.with_offset_provider(Arc::new(offsets));
    }

    let dispatcher =
        ActionDispatcher::new().register("weather", Arc::new(WeatherHandler::new(resolver)));

    web::run(&config, Arc::new(dispatcher)).await
}
