//! Data models for the fulfillment service
//!
//! This module contains the domain and wire models organized by concern:
//! - Intent: webhook request/response and intent parameters
//! - Location: coordinates and the location parameter
//! - Weather: provider responses, granularity and summaries

pub mod intent;
pub mod location;
pub mod weather;

pub use intent::{
    DATE_TIME_KEY, DateTimeParam, LOCATION_KEY, OutputContext, Parameters, QueryResult,
    WebhookRequest, WebhookResponse,
};
pub use location::{Coordinates, LocationParam};
pub use weather::{
    DailyDataPoint, DataBlock, DataPoint, DataSection, ForecastResponse, WeatherGranularity,
    WeatherQuery, WeatherSummary,
};
