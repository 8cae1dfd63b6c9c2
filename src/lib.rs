//! `sam-fulfillment` - Webhook fulfillment for the Sam voice assistant
//!
//! Answers conversational intents with weather summaries for a location and
//! an optional date, time or period, remembering parameters across
//! follow-up turns.

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod geocode;
pub mod http;
pub mod models;
pub mod resolver;
pub mod telemetry;
pub mod temporal;
pub mod timezone;
pub mod weather;
pub mod web;

// Re-export core types for public API
pub use config::FulfillmentConfig;
pub use dispatcher::{ActionDispatcher, ActionHandler, ContextStore, IntentContext, WeatherHandler};
pub use error::FulfillmentError;
pub use geocode::{Geocoder, GoogleGeocoder};
pub use models::{Coordinates, WebhookRequest, WebhookResponse, WeatherSummary};
pub use resolver::{Clock, SystemClock, WeatherResolver};
pub use timezone::{GoogleTimezone, OffsetProvider};
pub use weather::{DarkSkyClient, WeatherProvider};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Core result type used throughout the library
pub type Result<T> = std::result::Result<T, FulfillmentError>;
