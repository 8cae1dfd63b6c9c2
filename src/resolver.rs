//! Temporal-intent resolution for weather questions
//!
//! Decides, from an absent, point or range date-time expression, which
//! weather granularity to query and for which reference timestamp, then
//! fetches the matching record and summarizes it.
//!
//! | Expression                          | Granularity | Reference                 |
//! |-------------------------------------|-------------|---------------------------|
//! | absent                              | Current     | now                       |
//! | range                               | Period      | start date, midpoint hour |
//! | point with offset, within 60s of now| Current     | now                       |
//! | point with offset, otherwise        | Daily       | midnight of that day      |
//! | point without time and offset       | error       |                           |

use std::sync::Arc;

use chrono::{DateTime, FixedOffset, NaiveDate, NaiveTime, TimeDelta, Timelike, Utc};
use tracing::{debug, info};

use crate::error::FulfillmentError;
use crate::geocode::Geocoder;
use crate::models::{
    Coordinates, DataSection, DateTimeParam, LocationParam, WeatherGranularity, WeatherQuery,
    WeatherSummary,
};
use crate::temporal::{ParsedDateTime, Precision, TemporalExpression};
use crate::timezone::OffsetProvider;
use crate::weather::{WeatherProvider, WeatherRecord, summarize};

/// A point this close to now is a question about current conditions
const NOW_TOLERANCE_SECONDS: i64 = 60;

/// Source of the current time
pub trait Clock: Send + Sync {
    fn now(&self) -> DateTime<Utc>;
}

/// Wall clock
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

impl<F> Clock for F
where
    F: Fn() -> DateTime<Utc> + Send + Sync,
{
    fn now(&self) -> DateTime<Utc> {
        self()
    }
}

/// Decide granularity and reference timestamp for an expression
pub fn plan(expression: &TemporalExpression, now: DateTime<Utc>) -> crate::Result<WeatherQuery> {
    match expression {
        TemporalExpression::Absent => Ok(current(now)),
        TemporalExpression::Range { start, end } => plan_period(start, end),
        TemporalExpression::Point(point) => plan_point(point, now),
    }
}

fn current(now: DateTime<Utc>) -> WeatherQuery {
    WeatherQuery {
        granularity: WeatherGranularity::Current,
        reference: now.fixed_offset(),
    }
}

fn plan_period(start: &ParsedDateTime, end: &ParsedDateTime) -> crate::Result<WeatherQuery> {
    if start.timestamp() > end.timestamp() {
        return Err(FulfillmentError::invalid_range(format!(
            "period starts at {} but ends earlier at {}",
            start.timestamp().to_rfc3339(),
            end.timestamp().to_rfc3339()
        )));
    }

    // The midpoint hour is applied to the start's date
    let (start_day, end_day) = (start.timestamp().date_naive(), end.timestamp().date_naive());
    if start_day != end_day || start.hour() > end.hour() {
        return Err(FulfillmentError::invalid_range(format!(
            "period from {} to {} does not fall within a single day",
            start.timestamp().to_rfc3339(),
            end.timestamp().to_rfc3339()
        )));
    }

    let midpoint = (start.hour() + end.hour()) / 2;
    if midpoint > 24 {
        return Err(FulfillmentError::invalid_range(format!(
            "average hour has been calculated as invalid: {midpoint}"
        )));
    }

    // Keeps the start's date, minutes, seconds and offset
    let reference = start.timestamp().with_hour(midpoint).ok_or_else(|| {
        FulfillmentError::invalid_range(format!(
            "average hour has been calculated as invalid: {midpoint}"
        ))
    })?;

    debug!(
        start_hour = start.hour(),
        end_hour = end.hour(),
        midpoint,
        %reference,
        "Resolved period to its midpoint hour"
    );
    Ok(WeatherQuery {
        granularity: WeatherGranularity::Period,
        reference,
    })
}

fn plan_point(point: &ParsedDateTime, now: DateTime<Utc>) -> crate::Result<WeatherQuery> {
    if point.precision() != Precision::DateTimeWithOffset {
        return Err(FulfillmentError::invalid_date_time(format!(
            "expected a date, time and UTC offset, got {:?} ({} characters)",
            point.precision(),
            point.text_len()
        )));
    }

    let requested = point.timestamp();
    if (requested.with_timezone(&Utc) - now).abs() <= TimeDelta::seconds(NOW_TOLERANCE_SECONDS) {
        debug!(%requested, "Requested time is now");
        return Ok(current(now));
    }

    let day = requested.date_naive();
    if day < now.with_timezone(requested.offset()).date_naive() {
        return Err(FulfillmentError::invalid_data(format!(
            "{} is in the past",
            requested.to_rfc3339()
        )));
    }

    Ok(WeatherQuery {
        granularity: WeatherGranularity::Daily,
        reference: midnight(day, *requested.offset())?,
    })
}

fn midnight(day: NaiveDate, offset: FixedOffset) -> crate::Result<DateTime<FixedOffset>> {
    day.and_time(NaiveTime::MIN)
        .and_local_timezone(offset)
        .single()
        .ok_or_else(|| FulfillmentError::invalid_data(format!("{day} has no local midnight")))
}

/// Answers weather questions for a location and date-time expression
pub struct WeatherResolver {
    geocoder: Arc<dyn Geocoder>,
    weather: Arc<dyn WeatherProvider>,
    offsets: Option<Arc<dyn OffsetProvider>>,
    clock: Arc<dyn Clock>,
}

impl WeatherResolver {
    pub fn new(geocoder: Arc<dyn Geocoder>, weather: Arc<dyn WeatherProvider>) -> Self {
        Self {
            geocoder,
            weather,
            offsets: None,
            clock: Arc::new(SystemClock),
        }
    }

    /// Anchor daily lookups to the location's own UTC offset
    #[must_use]
    pub fn with_offset_provider(mut self, offsets: Arc<dyn OffsetProvider>) -> Self {
        self.offsets = Some(offsets);
        self
    }

    #[must_use]
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    /// Summarize the weather at `location` for `date_time`.
    ///
    /// Returns `Ok(None)` when the chosen hourly or daily series has no entry
    /// at exactly the reference timestamp.
    pub async fn resolve_weather(
        &self,
        location: &LocationParam,
        date_time: Option<&DateTimeParam>,
    ) -> crate::Result<Option<WeatherSummary>> {
        let now = self.clock.now();
        let expression = TemporalExpression::from_param(date_time)?;
        let mut query = plan(&expression, now)?;

        let coordinates = self.geocoder.coordinates(location.canonical_name()).await?;

        if query.granularity == WeatherGranularity::Daily {
            query = self.localize_daily(query, coordinates).await?;
        }

        info!(
            location = location.canonical_name(),
            lat = coordinates.lat(),
            lng = coordinates.lng(),
            granularity = ?query.granularity,
            reference = %query.reference,
            "Resolving weather"
        );

        self.summarize_query(coordinates, query).await
    }

    async fn localize_daily(
        &self,
        query: WeatherQuery,
        coordinates: Coordinates,
    ) -> crate::Result<WeatherQuery> {
        let Some(offsets) = &self.offsets else {
            return Ok(query);
        };

        let offset = offsets
            .utc_offset(coordinates, query.reference.with_timezone(&Utc))
            .await?;
        Ok(WeatherQuery {
            reference: midnight(query.reference.date_naive(), offset)?,
            ..query
        })
    }

    /// Fetch the section a query needs and summarize the matching record
    pub async fn summarize_query(
        &self,
        coordinates: Coordinates,
        query: WeatherQuery,
    ) -> crate::Result<Option<WeatherSummary>> {
        let section = query.granularity.section();
        let response = self.weather.forecast(coordinates, &[section]).await?;
        let reference_ts = query.reference.timestamp();

        let summary = match query.granularity {
            WeatherGranularity::Current => {
                let current = response
                    .currently
                    .as_ref()
                    .ok_or_else(|| missing_section(section))?;
                Some(summarize(WeatherRecord::Point(current), query.granularity))
            }
            WeatherGranularity::Hourly | WeatherGranularity::Period => response
                .hourly
                .as_ref()
                .ok_or_else(|| missing_section(section))?
                .data
                .iter()
                .find(|point| point.time == reference_ts)
                .map(|point| summarize(WeatherRecord::Point(point), query.granularity)),
            WeatherGranularity::Daily => response
                .daily
                .as_ref()
                .ok_or_else(|| missing_section(section))?
                .data
                .iter()
                .find(|day| day.time == reference_ts)
                .map(|day| summarize(WeatherRecord::Aggregate(day), query.granularity)),
        };

        if summary.is_none() {
            debug!(
                reference_ts,
                granularity = ?query.granularity,
                "No entry matches the reference timestamp"
            );
        }
        Ok(summary)
    }
}

fn missing_section(section: DataSection) -> FulfillmentError {
    FulfillmentError::api(format!("weather response has no '{section}' section"))
}
