//! Temporal expression parsing
//!
//! Turns the date-time strings emitted by the conversational platform into
//! timestamps, keeping track of how precise the original text was. The
//! resolver only treats an expression as a point in time when it carries a
//! time of day *and* an explicit UTC offset; everything coarser is reported
//! through [`Precision`] so the decision is made on structure, not length.

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveDateTime, Timelike};
use tracing::debug;

use crate::error::FulfillmentError;
use crate::models::DateTimeParam;

/// Date-time formats carrying an explicit offset that RFC 3339 rejects
const OFFSET_FORMATS: [&str; 3] = [
    "%Y-%m-%dT%H:%M%:z",
    "%Y-%m-%d %H:%M:%S%.f%:z",
    "%Y-%m-%d %H:%M%:z",
];

/// Date-time formats without an offset; interpreted as UTC
const NAIVE_DATETIME_FORMATS: [&str; 4] = [
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M",
];

/// Calendar dates, numeric and written out (month names in either form)
const DATE_FORMATS: [&str; 5] = ["%Y-%m-%d", "%b %d, %Y", "%b %d %Y", "%d %b %Y", "%d %b, %Y"];

/// How much of a timestamp the original text specified
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Precision {
    /// Only a calendar date
    DateOnly,
    /// Date and time of day, no offset
    DateTime,
    /// Date, time of day and explicit UTC offset
    DateTimeWithOffset,
}

/// A parsed date-time together with the precision of its source text
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParsedDateTime {
    timestamp: DateTime<FixedOffset>,
    precision: Precision,
    text_len: usize,
}

impl ParsedDateTime {
    #[must_use]
    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    #[must_use]
    pub fn precision(&self) -> Precision {
        self.precision
    }

    /// Length in characters of the text this was parsed from
    #[must_use]
    pub fn text_len(&self) -> usize {
        self.text_len
    }

    #[must_use]
    pub fn has_time_component(&self) -> bool {
        self.precision != Precision::DateOnly
    }

    #[must_use]
    pub fn hour(&self) -> u32 {
        self.timestamp.hour()
    }
}

/// Parse a date-time string into a timestamp
pub fn parse(text: &str) -> crate::Result<ParsedDateTime> {
    let trimmed = text.trim();
    let text_len = text.chars().count();

    let parsed = parse_with_offset(trimmed)
        .map(|ts| (ts, Precision::DateTimeWithOffset))
        .or_else(|| parse_naive_datetime(trimmed).map(|ts| (ts, Precision::DateTime)))
        .or_else(|| parse_date(trimmed).map(|ts| (ts, Precision::DateOnly)));

    match parsed {
        Some((timestamp, precision)) => {
            debug!(%timestamp, ?precision, text_len, "Parsed date-time expression");
            Ok(ParsedDateTime {
                timestamp,
                precision,
                text_len,
            })
        }
        None => Err(FulfillmentError::invalid_date_time(format!(
            "The given datetime format is invalid: {text}"
        ))),
    }
}

fn parse_with_offset(text: &str) -> Option<DateTime<FixedOffset>> {
    DateTime::parse_from_rfc3339(text).ok().or_else(|| {
        OFFSET_FORMATS
            .iter()
            .find_map(|format| DateTime::parse_from_str(text, format).ok())
    })
}

fn parse_naive_datetime(text: &str) -> Option<DateTime<FixedOffset>> {
    NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .map(|naive| naive.and_utc().fixed_offset())
}

fn parse_date(text: &str) -> Option<DateTime<FixedOffset>> {
    DATE_FORMATS
        .iter()
        .find_map(|format| NaiveDate::parse_from_str(text, format).ok())
        .map(|date| date.and_time(chrono::NaiveTime::MIN).and_utc().fixed_offset())
}

/// A date-time request in one of its three shapes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemporalExpression {
    /// Nothing supplied; means "now"
    Absent,
    /// A single moment or day
    Point(ParsedDateTime),
    /// A period of the day, e.g. "this afternoon"
    Range {
        start: ParsedDateTime,
        end: ParsedDateTime,
    },
}

impl TemporalExpression {
    /// Parse the platform's date-time parameter, if any
    pub fn from_param(param: Option<&DateTimeParam>) -> crate::Result<Self> {
        match param {
            None => Ok(TemporalExpression::Absent),
            Some(DateTimeParam::Point(text)) if text.trim().is_empty() => {
                Ok(TemporalExpression::Absent)
            }
            Some(DateTimeParam::Point(text)) => Ok(TemporalExpression::Point(parse(text)?)),
            Some(DateTimeParam::Range { start, end }) => Ok(TemporalExpression::Range {
                start: parse(start)?,
                end: parse(end)?,
            }),
        }
    }
}
