//! One-sentence weather summaries
//!
//! Each granularity has its own formatting rule. The rules disagree on
//! rounding, casing, punctuation and even spelling ("degreese" for periods).
//! Conversation transcripts compare these strings verbatim.

use crate::models::{DailyDataPoint, DataPoint, WeatherGranularity, WeatherSummary};

/// A provider record a summary can be built from
#[derive(Debug, Clone, Copy)]
pub enum WeatherRecord<'a> {
    /// Current or hourly conditions with a single apparent temperature
    Point(&'a DataPoint),
    /// Daily aggregate with apparent temperature extremes
    Aggregate(&'a DailyDataPoint),
}

impl WeatherRecord<'_> {
    fn narrative(&self) -> &str {
        match self {
            WeatherRecord::Point(point) => &point.summary,
            WeatherRecord::Aggregate(day) => &day.summary,
        }
    }

    fn temperature(&self) -> f64 {
        match self {
            WeatherRecord::Point(point) => point.apparent_temperature,
            WeatherRecord::Aggregate(day) => {
                (day.apparent_temperature_max + day.apparent_temperature_min) / 2.0
            }
        }
    }
}

/// Named formatting rules
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SummaryRule {
    /// 2-decimal temperature, lowercase unit, no trailing period
    Current,
    /// Same text as `Current`, temperature is the mean of max and min
    DailyAggregate,
    /// Integer temperature, capitalised unit, trailing period
    Hourly,
    /// Integer temperature, misspelled unit, trailing period
    Period,
}

impl SummaryRule {
    #[must_use]
    pub fn for_granularity(granularity: WeatherGranularity) -> Self {
        match granularity {
            WeatherGranularity::Current => SummaryRule::Current,
            WeatherGranularity::Hourly => SummaryRule::Hourly,
            WeatherGranularity::Period => SummaryRule::Period,
            WeatherGranularity::Daily => SummaryRule::DailyAggregate,
        }
    }

    fn format(self, narrative: &str, temperature: f64) -> String {
        match self {
            SummaryRule::Current | SummaryRule::DailyAggregate => format!(
                "{narrative} with a temperature of {} degrees celsius",
                two_decimals(temperature)
            ),
            SummaryRule::Hourly => format!(
                "{narrative} with a temperature of {} degrees Celsius.",
                whole_degrees(temperature)
            ),
            SummaryRule::Period => format!(
                "{narrative} with a temperature of {} degreese Celsius.",
                whole_degrees(temperature)
            ),
        }
    }
}

/// Summarize a record with the rule belonging to `granularity`
#[must_use]
pub fn summarize(record: WeatherRecord<'_>, granularity: WeatherGranularity) -> WeatherSummary {
    let narrative = record.narrative().to_string();
    let temperature = record.temperature();
    let text = SummaryRule::for_granularity(granularity).format(&narrative, temperature);

    WeatherSummary {
        text,
        temperature,
        narrative,
        granularity,
    }
}

/// Round to 2 decimals and print the shortest representation, keeping `.0`.
///
/// Rounding goes through the exact decimal expansion with ties to even, so
/// `0.125` becomes `0.12` and `2.675` (stored just below) becomes `2.67`.
fn two_decimals(value: f64) -> String {
    let rounded: f64 = format!("{value:.2}").parse().unwrap_or(value);
    format!("{rounded:?}")
}

/// Round half to even and print without decimals
fn whole_degrees(value: f64) -> i64 {
    value.round_ties_even() as i64
}
