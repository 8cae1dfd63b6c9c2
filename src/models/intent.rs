//! Wire model of the conversational platform's webhook exchange

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::error::FulfillmentError;

/// Parameter key holding the location
pub const LOCATION_KEY: &str = "location";
/// Parameter key holding the date-time expression
pub const DATE_TIME_KEY: &str = "date-time";

/// Incoming webhook body: either the full envelope or a bare query result
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum WebhookRequest {
    Envelope {
        #[serde(rename = "queryResult")]
        query_result: QueryResult,
    },
    Bare(QueryResult),
}

impl WebhookRequest {
    #[must_use]
    pub fn query_result(&self) -> &QueryResult {
        match self {
            WebhookRequest::Envelope { query_result } | WebhookRequest::Bare(query_result) => {
                query_result
            }
        }
    }
}

/// The platform's interpretation of a single user turn
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QueryResult {
    pub action: String,
    #[serde(default)]
    pub query_text: Option<String>,
    #[serde(default)]
    pub parameters: Parameters,
    /// Prior-turn contexts, most recent first
    #[serde(default)]
    pub output_contexts: Vec<OutputContext>,
}

/// Context persisted by the platform across turns
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OutputContext {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub lifespan_count: Option<u32>,
    #[serde(default)]
    pub parameters: Parameters,
}

/// Extracted intent parameters
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
#[serde(transparent)]
pub struct Parameters(pub Map<String, Value>);

impl Parameters {
    /// Raw value for `key`; JSON null and empty strings count as absent
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key).filter(|value| !is_blank(value))
    }

    /// Typed value for `key`, failing if it is present but malformed
    pub fn get_as<T: DeserializeOwned>(&self, key: &str) -> crate::Result<Option<T>> {
        self.get(key).map(|value| decode_param(key, value)).transpose()
    }
}

/// Decode a single parameter value, reporting the key on failure
pub fn decode_param<T: DeserializeOwned>(key: &str, value: &Value) -> crate::Result<T> {
    serde_json::from_value(value.clone()).map_err(|e| {
        FulfillmentError::invalid_data(format!("parameter '{key}' is malformed ({e})"))
    })
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

/// Date-time parameter: a single expression or a start/end period
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
pub enum DateTimeParam {
    Point(String),
    Range {
        #[serde(rename = "startDateTime")]
        start: String,
        #[serde(rename = "endDateTime")]
        end: String,
    },
}

impl std::fmt::Display for DateTimeParam {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DateTimeParam::Point(text) => f.write_str(text),
            DateTimeParam::Range { start, end } => write!(f, "{start} - {end}"),
        }
    }
}

/// Outgoing webhook body
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct WebhookResponse {
    pub fulfillment_text: String,
}

impl WebhookResponse {
    pub fn new<S: Into<String>>(text: S) -> Self {
        Self {
            fulfillment_text: text.into(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_request() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "responseId": "abc",
            "queryResult": {
                "queryText": "what's the weather in Amsterdam",
                "action": "weather.weather",
                "parameters": {"location": "Amsterdam", "date-time": ""},
                "outputContexts": []
            }
        }))
        .unwrap();

        let query = request.query_result();
        assert_eq!(query.action, "weather.weather");
        assert_eq!(query.parameters.get(LOCATION_KEY), Some(&json!("Amsterdam")));
        assert!(query.parameters.get(DATE_TIME_KEY).is_none());
    }

    #[test]
    fn test_bare_request() {
        let request: WebhookRequest = serde_json::from_value(json!({
            "action": "weather.weather",
            "parameters": {"location": "Amsterdam"}
        }))
        .unwrap();

        assert!(matches!(request, WebhookRequest::Bare(_)));
        assert!(request.query_result().output_contexts.is_empty());
    }

    #[test]
    fn test_date_time_param_shapes() {
        let point: DateTimeParam =
            serde_json::from_value(json!("2018-09-04T12:00:00+02:00")).unwrap();
        assert_eq!(point, DateTimeParam::Point("2018-09-04T12:00:00+02:00".to_string()));

        let range: DateTimeParam = serde_json::from_value(json!({
            "startDateTime": "2018-09-04T12:00:00+02:00",
            "endDateTime": "2018-09-04T16:00:00+02:00"
        }))
        .unwrap();
        assert!(matches!(range, DateTimeParam::Range { .. }));
    }

    #[test]
    fn test_malformed_date_time_object_is_invalid_data() {
        let params: Parameters = serde_json::from_value(json!({
            "date-time": {"date_time": "2018-09-04"}
        }))
        .unwrap();

        let result = params.get_as::<DateTimeParam>(DATE_TIME_KEY);
        assert!(matches!(
            result,
            Err(FulfillmentError::InvalidDataFormat { .. })
        ));
    }

    #[test]
    fn test_response_serialization() {
        let response = WebhookResponse::new("Not yet implemented");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value, json!({"fulfillmentText": "Not yet implemented"}));
    }
}
