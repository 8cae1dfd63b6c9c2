//! Weather provider response model and granularity decisions

use std::fmt;

use chrono::{DateTime, FixedOffset};
use serde::{Deserialize, Serialize};

/// Time resolution a weather question is answered at
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum WeatherGranularity {
    /// Conditions right now
    Current,
    /// A single hourly bucket
    Hourly,
    /// A multi-hour period, answered by its midpoint hour
    Period,
    /// A full calendar day
    Daily,
}

impl WeatherGranularity {
    /// Provider data section holding the data for this granularity
    #[must_use]
    pub fn section(self) -> DataSection {
        match self {
            WeatherGranularity::Current => DataSection::Currently,
            WeatherGranularity::Hourly | WeatherGranularity::Period => DataSection::Hourly,
            WeatherGranularity::Daily => DataSection::Daily,
        }
    }
}

/// The resolver's decision: which granularity, at which reference timestamp
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WeatherQuery {
    pub granularity: WeatherGranularity,
    pub reference: DateTime<FixedOffset>,
}

/// Top-level sections of a forecast response
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DataSection {
    Currently,
    Minutely,
    Hourly,
    Daily,
    Alerts,
    Flags,
}

impl DataSection {
    /// Every section the provider knows about, in its documented order
    pub const ALL: [DataSection; 6] = [
        DataSection::Currently,
        DataSection::Minutely,
        DataSection::Hourly,
        DataSection::Daily,
        DataSection::Alerts,
        DataSection::Flags,
    ];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            DataSection::Currently => "currently",
            DataSection::Minutely => "minutely",
            DataSection::Hourly => "hourly",
            DataSection::Daily => "daily",
            DataSection::Alerts => "alerts",
            DataSection::Flags => "flags",
        }
    }

    /// Sections to exclude so that only `include` is returned
    #[must_use]
    pub fn exclude_list(include: &[DataSection]) -> Vec<DataSection> {
        Self::ALL
            .into_iter()
            .filter(|section| !include.contains(section))
            .collect()
    }
}

impl fmt::Display for DataSection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Forecast response; only the requested sections are present
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ForecastResponse {
    #[serde(default)]
    pub currently: Option<DataPoint>,
    #[serde(default)]
    pub hourly: Option<DataBlock<DataPoint>>,
    #[serde(default)]
    pub daily: Option<DataBlock<DailyDataPoint>>,
}

/// A series of data points
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataBlock<T> {
    #[serde(default = "Vec::new")]
    pub data: Vec<T>,
}

/// Current or hourly conditions
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DataPoint {
    /// Unix timestamp (seconds) this point is valid for
    #[serde(default)]
    pub time: i64,
    /// Narrative text, e.g. "Partly Cloudy"
    pub summary: String,
    /// Feels-like temperature in Celsius
    pub apparent_temperature: f64,
}

/// A daily aggregate
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct DailyDataPoint {
    /// Unix timestamp of local midnight for that day
    pub time: i64,
    pub summary: String,
    pub apparent_temperature_max: f64,
    pub apparent_temperature_min: f64,
}

/// Formatted answer plus the values it was derived from
#[derive(Debug, Clone, PartialEq)]
pub struct WeatherSummary {
    pub text: String,
    pub temperature: f64,
    pub narrative: String,
    pub granularity: WeatherGranularity,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exclude_list_keeps_only_requested_section() {
        let exclude = DataSection::exclude_list(&[DataSection::Hourly]);
        let names: Vec<&str> = exclude.iter().map(|s| s.as_str()).collect();
        assert_eq!(names, ["currently", "minutely", "daily", "alerts", "flags"]);
    }

    #[test]
    fn test_granularity_sections() {
        assert_eq!(WeatherGranularity::Current.section(), DataSection::Currently);
        assert_eq!(WeatherGranularity::Period.section(), DataSection::Hourly);
        assert_eq!(WeatherGranularity::Hourly.section(), DataSection::Hourly);
        assert_eq!(WeatherGranularity::Daily.section(), DataSection::Daily);
    }

    #[test]
    fn test_forecast_response_parses_partial_payload() {
        let response: ForecastResponse = serde_json::from_value(serde_json::json!({
            "latitude": 52.37,
            "longitude": 4.895,
            "hourly": {
                "summary": "Cloudy throughout the day.",
                "data": [
                    {"time": 1536055200, "summary": "Cloudy",
                     "apparentTemperature": 15.4, "humidity": 0.8}
                ]
            }
        }))
        .unwrap();

        assert!(response.currently.is_none());
        assert!(response.daily.is_none());
        let hourly = response.hourly.unwrap();
        assert_eq!(hourly.data[0].time, 1_536_055_200);
        assert_eq!(hourly.data[0].apparent_temperature, 15.4);
    }
}
