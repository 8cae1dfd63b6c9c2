//! Error types and handling for the fulfillment service

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use thiserror::Error;

use crate::models::WebhookResponse;

/// Main error type for the fulfillment service
#[derive(Error, Debug)]
pub enum FulfillmentError {
    /// Geocoding produced no results for the requested location
    #[error("Location not found: {location}")]
    LocationNotFound { location: String },

    /// The date-time expression has an unsupported shape
    #[error("Invalid date-time format: {message}")]
    InvalidDateTimeFormat { message: String },

    /// A start/end range could not be reduced to a valid reference hour
    #[error("Invalid temporal range: {message}")]
    InvalidTemporalRange { message: String },

    /// Requested day lies in the past, or the payload is malformed
    #[error("Invalid data format: {message}")]
    InvalidDataFormat { message: String },

    /// A follow-up intent arrived without the prior turn's context
    #[error("Missing context: {message}")]
    MissingContext { message: String },

    /// Provider communication or decoding errors
    #[error("API error: {message}")]
    Api { message: String },

    /// Configuration-related errors
    #[error("Configuration error: {message}")]
    Config { message: String },
}

impl FulfillmentError {
    pub fn location_not_found<S: Into<String>>(location: S) -> Self {
        Self::LocationNotFound {
            location: location.into(),
        }
    }

    pub fn invalid_date_time<S: Into<String>>(message: S) -> Self {
        Self::InvalidDateTimeFormat {
            message: message.into(),
        }
    }

    pub fn invalid_range<S: Into<String>>(message: S) -> Self {
        Self::InvalidTemporalRange {
            message: message.into(),
        }
    }

    pub fn invalid_data<S: Into<String>>(message: S) -> Self {
        Self::InvalidDataFormat {
            message: message.into(),
        }
    }

    pub fn missing_context<S: Into<String>>(message: S) -> Self {
        Self::MissingContext {
            message: message.into(),
        }
    }

    pub fn api<S: Into<String>>(message: S) -> Self {
        Self::Api {
            message: message.into(),
        }
    }

    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Get a user-friendly error message, suitable as fulfillment text
    #[must_use]
    pub fn user_message(&self) -> String {
        match self {
            FulfillmentError::LocationNotFound { location } => {
                format!("Sorry, I could not find the location '{location}'.")
            }
            FulfillmentError::InvalidDateTimeFormat { .. } => {
                "Sorry, I did not understand that date or time.".to_string()
            }
            FulfillmentError::InvalidTemporalRange { .. } => {
                "Sorry, that time period does not look valid.".to_string()
            }
            FulfillmentError::InvalidDataFormat { message } => format!("Sorry, {message}."),
            FulfillmentError::MissingContext { .. } => {
                "Sorry, I lost track of what we were talking about. Could you ask again?"
                    .to_string()
            }
            FulfillmentError::Api { .. } => {
                "Unable to reach the weather services right now. Please try again later."
                    .to_string()
            }
            FulfillmentError::Config { .. } => {
                "The assistant is misconfigured. Please contact the administrator.".to_string()
            }
        }
    }

    /// Caused by what the user asked rather than by a failing dependency
    #[must_use]
    pub fn is_user_error(&self) -> bool {
        self.status_code().is_client_error()
    }

    /// HTTP status reported to the conversational platform
    #[must_use]
    pub fn status_code(&self) -> StatusCode {
        match self {
            FulfillmentError::LocationNotFound { .. } => StatusCode::NOT_FOUND,
            FulfillmentError::InvalidDateTimeFormat { .. }
            | FulfillmentError::InvalidTemporalRange { .. }
            | FulfillmentError::InvalidDataFormat { .. }
            | FulfillmentError::MissingContext { .. } => StatusCode::UNPROCESSABLE_ENTITY,
            FulfillmentError::Api { .. } => StatusCode::BAD_GATEWAY,
            FulfillmentError::Config { .. } => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<reqwest::Error> for FulfillmentError {
    fn from(err: reqwest::Error) -> Self {
        FulfillmentError::api(err.to_string())
    }
}

impl From<reqwest_middleware::Error> for FulfillmentError {
    fn from(err: reqwest_middleware::Error) -> Self {
        FulfillmentError::api(err.to_string())
    }
}

impl IntoResponse for FulfillmentError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let body = WebhookResponse::new(self.user_message());
        (status, axum::Json(body)).into_response()
    }
}
