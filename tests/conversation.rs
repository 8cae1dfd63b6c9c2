//! Multi-turn conversations against in-memory providers

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, TimeZone, Utc};
use rstest::rstest;
use serde_json::{Value, json};

use sam_fulfillment::models::{DataSection, ForecastResponse, WeatherGranularity, WeatherQuery};
use sam_fulfillment::{
    ActionDispatcher, Clock, Coordinates, FulfillmentError, Geocoder, OffsetProvider,
    WeatherHandler, WeatherProvider, WeatherResolver, WebhookRequest,
};

/// 2018-09-04T12:00:00+02:00
fn fixed_now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2018, 9, 4, 10, 0, 0).unwrap()
}

#[derive(Default)]
struct FakeGeocoder {
    places: HashMap<String, Coordinates>,
    queries: Mutex<Vec<String>>,
}

impl FakeGeocoder {
    fn with_place(mut self, name: &str, lat: f64, lng: f64) -> Self {
        self.places.insert(name.to_string(), Coordinates::new(lat, lng));
        self
    }

    fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }
}

#[async_trait]
impl Geocoder for FakeGeocoder {
    async fn coordinates(&self, address: &str) -> sam_fulfillment::Result<Coordinates> {
        self.queries.lock().unwrap().push(address.to_string());
        self.places
            .get(address)
            .copied()
            .ok_or_else(|| FulfillmentError::location_not_found(address))
    }
}

struct FakeWeather {
    forecast: Value,
    requests: Mutex<Vec<Vec<DataSection>>>,
}

impl FakeWeather {
    fn new(forecast: Value) -> Self {
        Self {
            forecast,
            requests: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl WeatherProvider for FakeWeather {
    async fn forecast(
        &self,
        _coordinates: Coordinates,
        include: &[DataSection],
    ) -> sam_fulfillment::Result<ForecastResponse> {
        self.requests.lock().unwrap().push(include.to_vec());
        Ok(serde_json::from_value(self.forecast.clone()).unwrap())
    }
}

struct FixedOffsetProvider {
    offset: FixedOffset,
    calls: AtomicUsize,
}

#[async_trait]
impl OffsetProvider for FixedOffsetProvider {
    async fn utc_offset(
        &self,
        _coordinates: Coordinates,
        _at: DateTime<Utc>,
    ) -> sam_fulfillment::Result<FixedOffset> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.offset)
    }
}

fn forecast() -> Value {
    json!({
        "currently": {"time": 1_536_055_200, "summary": "Clear", "apparentTemperature": 18.0},
        "hourly": {"data": [
            {"time": 1_536_051_600, "summary": "Sunny", "apparentTemperature": 17.2},
            {"time": 1_536_055_200, "summary": "Cloudy", "apparentTemperature": 15.4}
        ]},
        "daily": {"data": [
            {"time": 1_536_012_000, "summary": "Dry all day.",
             "apparentTemperatureMax": 22.0, "apparentTemperatureMin": 13.0},
            {"time": 1_536_098_400, "summary": "Rain",
             "apparentTemperatureMax": 21.0, "apparentTemperatureMin": 12.5},
            {"time": 1_536_073_200, "summary": "Typhoon",
             "apparentTemperatureMax": 30.0, "apparentTemperatureMin": 26.0}
        ]}
    })
}

struct Harness {
    geocoder: Arc<FakeGeocoder>,
    weather: Arc<FakeWeather>,
    dispatcher: ActionDispatcher,
}

impl Harness {
    fn new() -> Self {
        Self::build(None)
    }

    fn build(offsets: Option<Arc<dyn OffsetProvider>>) -> Self {
        let geocoder = Arc::new(
            FakeGeocoder::default()
                .with_place("Amsterdam", 52.37, 4.895)
                .with_place("Rotterdam", 51.9225, 4.4792),
        );
        let weather = Arc::new(FakeWeather::new(forecast()));
        let clock: Arc<dyn Clock> = Arc::new(fixed_now);

        let mut resolver =
            WeatherResolver::new(geocoder.clone(), weather.clone()).with_clock(clock);
        if let Some(offsets) = offsets {
            resolver = resolver.with_offset_provider(offsets);
        }

        let dispatcher =
            ActionDispatcher::new().register("weather", Arc::new(WeatherHandler::new(resolver)));
        Self {
            geocoder,
            weather,
            dispatcher,
        }
    }

    async fn ask(&self, body: Value) -> sam_fulfillment::Result<String> {
        let request: WebhookRequest = serde_json::from_value(body).unwrap();
        self.dispatcher
            .dispatch(&request)
            .await
            .map(|response| response.fulfillment_text)
    }
}

fn weather_query(parameters: Value) -> Value {
    json!({
        "queryResult": {
            "queryText": "what's the weather like",
            "action": "weather.weather",
            "parameters": parameters,
            "outputContexts": []
        }
    })
}

#[tokio::test]
async fn test_current_weather_without_date_time() {
    let harness = Harness::new();
    let text = harness
        .ask(weather_query(json!({"location": "Amsterdam", "date-time": ""})))
        .await
        .unwrap();

    assert_eq!(text, "Clear with a temperature of 18.0 degrees celsius");
    assert_eq!(harness.geocoder.queries(), vec!["Amsterdam"]);
    assert_eq!(
        harness.weather.requests.lock().unwrap().as_slice(),
        &[vec![DataSection::Currently]]
    );
}

#[rstest]
#[case("2018-09-04T12:00:00+02:00")]
#[case("2018-09-04T12:00:45+02:00")]
#[case("2018-09-04T09:59:30Z")]
#[tokio::test]
async fn test_date_time_close_to_now_is_current(#[case] date_time: &str) {
    let harness = Harness::new();
    let text = harness
        .ask(weather_query(json!({"location": "Amsterdam", "date-time": date_time})))
        .await
        .unwrap();
    assert_eq!(text, "Clear with a temperature of 18.0 degrees celsius");
}

#[tokio::test]
async fn test_period_uses_midpoint_hour() {
    let harness = Harness::new();
    let text = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": {
                "startDateTime": "2018-09-04T10:00:00+02:00",
                "endDateTime": "2018-09-04T14:00:00+02:00"
            }
        })))
        .await
        .unwrap();

    assert_eq!(text, "Cloudy with a temperature of 15 degreese Celsius.");
    assert_eq!(
        harness.weather.requests.lock().unwrap().as_slice(),
        &[vec![DataSection::Hourly]]
    );
}

#[tokio::test]
async fn test_future_day_uses_daily_aggregate() {
    let harness = Harness::new();
    let text = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": "2018-09-05T12:00:00+02:00"
        })))
        .await
        .unwrap();
    assert_eq!(text, "Rain with a temperature of 16.75 degrees celsius");
}

#[tokio::test]
async fn test_daily_lookup_follows_location_offset() {
    let offsets = Arc::new(FixedOffsetProvider {
        offset: FixedOffset::east_opt(9 * 3600).unwrap(),
        calls: AtomicUsize::new(0),
    });
    let harness = Harness::build(Some(offsets.clone()));

    let text = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": "2018-09-05T12:00:00+02:00"
        })))
        .await
        .unwrap();

    assert_eq!(text, "Typhoon with a temperature of 28.0 degrees celsius");
    assert_eq!(offsets.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_day_without_forecast_gets_soft_reply() {
    let harness = Harness::new();
    let text = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": "2018-09-06T12:00:00+02:00"
        })))
        .await
        .unwrap();
    assert_eq!(
        text,
        "Specified date-time is invalid: 2018-09-06T12:00:00+02:00"
    );
}

#[tokio::test]
async fn test_period_without_hourly_entry_gets_soft_reply() {
    let harness = Harness::new();
    let text = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": {
                "startDateTime": "2018-09-04T17:30:00+02:00",
                "endDateTime": "2018-09-04T23:30:00+02:00"
            }
        })))
        .await
        .unwrap();
    assert_eq!(
        text,
        "Specified date-time is invalid: 2018-09-04T17:30:00+02:00 - 2018-09-04T23:30:00+02:00"
    );
}

#[tokio::test]
async fn test_period_across_midnight_is_rejected() {
    let harness = Harness::new();
    let result = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": {
                "startDateTime": "2018-09-04T22:00:00+02:00",
                "endDateTime": "2018-09-05T02:00:00+02:00"
            }
        })))
        .await;
    assert!(matches!(result, Err(FulfillmentError::InvalidTemporalRange { .. })));
}

fn hourly_resolver() -> (Arc<FakeWeather>, WeatherResolver) {
    let weather = Arc::new(FakeWeather::new(forecast()));
    let resolver = WeatherResolver::new(Arc::new(FakeGeocoder::default()), weather.clone());
    (weather, resolver)
}

fn at_local(hour: u32, minute: u32) -> DateTime<FixedOffset> {
    FixedOffset::east_opt(2 * 3600)
        .unwrap()
        .with_ymd_and_hms(2018, 9, 4, hour, minute, 0)
        .unwrap()
}

#[tokio::test]
async fn test_hourly_query_summarizes_matching_hour() {
    let (weather, resolver) = hourly_resolver();
    let query = WeatherQuery {
        granularity: WeatherGranularity::Hourly,
        reference: at_local(12, 0),
    };

    let summary = resolver
        .summarize_query(Coordinates::new(52.37, 4.895), query)
        .await
        .unwrap()
        .unwrap();

    assert_eq!(summary.text, "Cloudy with a temperature of 15 degrees Celsius.");
    assert_eq!(summary.granularity, WeatherGranularity::Hourly);
    assert_eq!(
        weather.requests.lock().unwrap().as_slice(),
        &[vec![DataSection::Hourly]]
    );
}

#[tokio::test]
async fn test_hourly_query_without_matching_hour_is_none() {
    let (_, resolver) = hourly_resolver();
    let query = WeatherQuery {
        granularity: WeatherGranularity::Hourly,
        reference: at_local(12, 30),
    };

    let summary = resolver
        .summarize_query(Coordinates::new(52.37, 4.895), query)
        .await
        .unwrap();
    assert!(summary.is_none());
}

#[rstest]
#[case("tomorrow")]
#[case("2018-09-05")]
#[case("2018-09-05T12:00:00")]
#[tokio::test]
async fn test_date_time_without_offset_is_rejected(#[case] date_time: &str) {
    let harness = Harness::new();
    let result = harness
        .ask(weather_query(json!({"location": "Amsterdam", "date-time": date_time})))
        .await;

    assert!(matches!(
        result,
        Err(FulfillmentError::InvalidDateTimeFormat { .. })
    ));
    assert!(harness.geocoder.queries().is_empty());
}

#[tokio::test]
async fn test_past_day_is_rejected() {
    let harness = Harness::new();
    let result = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": "2018-09-03T12:00:00+02:00"
        })))
        .await;
    assert!(matches!(result, Err(FulfillmentError::InvalidDataFormat { .. })));
}

#[tokio::test]
async fn test_backwards_period_is_rejected() {
    let harness = Harness::new();
    let result = harness
        .ask(weather_query(json!({
            "location": "Amsterdam",
            "date-time": {
                "startDateTime": "2018-09-04T14:00:00+02:00",
                "endDateTime": "2018-09-04T10:00:00+02:00"
            }
        })))
        .await;
    assert!(matches!(result, Err(FulfillmentError::InvalidTemporalRange { .. })));
}

#[tokio::test]
async fn test_unknown_location() {
    let harness = Harness::new();
    let result = harness
        .ask(weather_query(json!({"location": "Atlantis"})))
        .await;

    match result {
        Err(FulfillmentError::LocationNotFound { location }) => assert_eq!(location, "Atlantis"),
        other => panic!("expected LocationNotFound, got {other:?}"),
    }
}

#[tokio::test]
async fn test_missing_location_is_invalid_data() {
    let harness = Harness::new();
    let result = harness.ask(weather_query(json!({"location": ""}))).await;
    assert!(matches!(result, Err(FulfillmentError::InvalidDataFormat { .. })));
}

#[tokio::test]
async fn test_time_follow_up_reuses_previous_location() {
    let harness = Harness::new();
    let text = harness
        .ask(json!({
            "queryResult": {
                "action": "weather.time.followup",
                "parameters": {"date-time": "2018-09-05T09:00:00+02:00"},
                "outputContexts": [{
                    "name": "projects/sam/agent/sessions/1/contexts/weather-followup",
                    "lifespanCount": 2,
                    "parameters": {"location": "Amsterdam", "date-time": ""}
                }]
            }
        }))
        .await
        .unwrap();

    assert_eq!(text, "Rain with a temperature of 16.75 degrees celsius");
    assert_eq!(harness.geocoder.queries(), vec!["Amsterdam"]);
}

#[tokio::test]
async fn test_location_follow_up_reuses_previous_time() {
    let harness = Harness::new();
    let text = harness
        .ask(json!({
            "queryResult": {
                "action": "weather.location.followup",
                "parameters": {"location": {"city": "Rotterdam"}},
                "outputContexts": [{
                    "parameters": {
                        "location": "Amsterdam",
                        "date-time": "2018-09-05T09:00:00+02:00"
                    }
                }]
            }
        }))
        .await
        .unwrap();

    assert_eq!(text, "Rain with a temperature of 16.75 degrees celsius");
    assert_eq!(harness.geocoder.queries(), vec!["Rotterdam"]);
}

#[tokio::test]
async fn test_follow_up_without_contexts_is_missing_context() {
    let harness = Harness::new();
    let result = harness
        .ask(json!({
            "queryResult": {
                "action": "weather.followup.time",
                "parameters": {"date-time": "2018-09-05T09:00:00+02:00"},
                "outputContexts": []
            }
        }))
        .await;
    assert!(matches!(result, Err(FulfillmentError::MissingContext { .. })));
}

#[rstest]
#[case("music.play")]
#[case("calendar.events.list")]
#[case("smalltalk.greetings.hello")]
#[tokio::test]
async fn test_other_domains_are_not_implemented(#[case] action: &str) {
    let harness = Harness::new();
    let text = harness
        .ask(json!({"queryResult": {"action": action, "parameters": {}}}))
        .await
        .unwrap();

    assert_eq!(text, "Not yet implemented");
    assert!(harness.geocoder.queries().is_empty());
}

#[tokio::test]
async fn test_repeated_question_gets_same_answer() {
    let harness = Harness::new();
    let body = weather_query(json!({
        "location": "Amsterdam",
        "date-time": "2018-09-05T12:00:00+02:00"
    }));

    let first = harness.ask(body.clone()).await.unwrap();
    let second = harness.ask(body).await.unwrap();
    assert_eq!(first, second);
}
