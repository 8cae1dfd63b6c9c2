//! Action dispatch
//!
//! Routes an incoming intent to the handler registered for its top-level
//! action prefix. Follow-up actions (`weather.location.followup`,
//! `weather.followup.time`, ...) merge the current turn's parameters with
//! those the platform kept from the previous turn.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, error, info, warn};

use crate::error::FulfillmentError;
use crate::models::intent::decode_param;
use crate::models::{
    DATE_TIME_KEY, DateTimeParam, LOCATION_KEY, LocationParam, OutputContext, QueryResult,
    WebhookRequest, WebhookResponse,
};
use crate::resolver::WeatherResolver;

/// Reply for actions nobody handles yet
pub const NOT_IMPLEMENTED: &str = "Not yet implemented";

const FOLLOW_UP_SEGMENT: &str = "followup";

/// Parameters remembered from earlier turns
pub trait ContextStore {
    /// Value stored under `key`; blank values count as absent
    fn get(&self, key: &str) -> Option<Value>;

    /// True when no earlier turn left any context behind
    fn is_empty(&self) -> bool;
}

/// Context store backed by the platform's output contexts, most recent first
pub struct OutputContextStore<'a> {
    latest: Option<&'a OutputContext>,
}

impl<'a> OutputContextStore<'a> {
    #[must_use]
    pub fn new(contexts: &'a [OutputContext]) -> Self {
        Self {
            latest: contexts.first(),
        }
    }
}

impl ContextStore for OutputContextStore<'_> {
    fn get(&self, key: &str) -> Option<Value> {
        self.latest
            .and_then(|context| context.parameters.get(key))
            .cloned()
    }

    fn is_empty(&self) -> bool {
        self.latest.is_none()
    }
}

/// Which parameter a follow-up turn supplies
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowUpKind {
    /// The user changed the location; the time carries over
    Location,
    /// The user changed the time; the location carries over
    Time,
}

impl FollowUpKind {
    /// Detect a follow-up action and its kind from the dot-separated action name
    pub fn from_action(action: &str) -> crate::Result<Option<Self>> {
        let segments: Vec<&str> = action.split('.').skip(1).collect();
        if !segments.contains(&FOLLOW_UP_SEGMENT) {
            return Ok(None);
        }

        match segments.iter().find(|segment| **segment != FOLLOW_UP_SEGMENT) {
            Some(&"location") => Ok(Some(FollowUpKind::Location)),
            Some(&"time") => Ok(Some(FollowUpKind::Time)),
            _ => Err(FulfillmentError::invalid_data(format!(
                "unsupported follow-up action '{action}'"
            ))),
        }
    }
}

/// Parameters of the current turn merged with the previous turn's context
#[derive(Debug, Clone, PartialEq)]
pub struct IntentContext {
    pub action: String,
    pub location: Option<LocationParam>,
    pub date_time: Option<DateTimeParam>,
    pub follow_up: Option<FollowUpKind>,
}

impl IntentContext {
    #[must_use]
    pub fn is_follow_up(&self) -> bool {
        self.follow_up.is_some()
    }
}

fn from_store<T: serde::de::DeserializeOwned>(
    store: &dyn ContextStore,
    key: &str,
) -> crate::Result<Option<T>> {
    store
        .get(key)
        .map(|value| decode_param(key, &value))
        .transpose()
}

/// Build the intent context for a query, pulling carried-over values from `store`
pub fn merge_context(
    query: &QueryResult,
    store: &dyn ContextStore,
) -> crate::Result<IntentContext> {
    let action = query.action.clone();
    let params = &query.parameters;
    let follow_up = FollowUpKind::from_action(&action)?;

    if follow_up.is_some() && store.is_empty() {
        return Err(FulfillmentError::missing_context(format!(
            "follow-up action '{action}' arrived without output contexts"
        )));
    }

    let (location, date_time) = match follow_up {
        None => (
            params.get_as::<LocationParam>(LOCATION_KEY)?,
            params.get_as::<DateTimeParam>(DATE_TIME_KEY)?,
        ),
        Some(FollowUpKind::Location) => (
            params.get_as::<LocationParam>(LOCATION_KEY)?,
            from_store::<DateTimeParam>(store, DATE_TIME_KEY)?,
        ),
        Some(FollowUpKind::Time) => {
            let stored = from_store::<LocationParam>(store, LOCATION_KEY)?
                .filter(|location| !location.is_empty());
            let location = match stored {
                Some(location) => location,
                None => params
                    .get_as::<LocationParam>(LOCATION_KEY)?
                    .filter(|location| !location.is_empty())
                    .ok_or_else(|| {
                        FulfillmentError::missing_context(format!(
                            "follow-up action '{action}' has no location in either turn"
                        ))
                    })?,
            };
            (Some(location), params.get_as::<DateTimeParam>(DATE_TIME_KEY)?)
        }
    };

    debug!(
        action = %action,
        ?follow_up,
        ?location,
        ?date_time,
        "Merged intent context"
    );

    Ok(IntentContext {
        action,
        location,
        date_time,
        follow_up,
    })
}

/// Handler for every action sharing one top-level prefix
#[async_trait]
pub trait ActionHandler: Send + Sync {
    async fn handle(&self, context: &IntentContext) -> crate::Result<String>;
}

/// Answers `weather.*` actions
pub struct WeatherHandler {
    resolver: WeatherResolver,
}

impl WeatherHandler {
    #[must_use]
    pub fn new(resolver: WeatherResolver) -> Self {
        Self { resolver }
    }
}

#[async_trait]
impl ActionHandler for WeatherHandler {
    async fn handle(&self, context: &IntentContext) -> crate::Result<String> {
        let location = context
            .location
            .as_ref()
            .filter(|location| !location.is_empty())
            .ok_or_else(|| FulfillmentError::invalid_data("no location was given"))?;

        let summary = self
            .resolver
            .resolve_weather(location, context.date_time.as_ref())
            .await?;

        match summary {
            Some(summary) => Ok(summary.text),
            None => {
                let date_time = context
                    .date_time
                    .as_ref()
                    .map(ToString::to_string)
                    .unwrap_or_default();
                warn!(%date_time, "No weather data for the requested date-time");
                Ok(format!("Specified date-time is invalid: {date_time}"))
            }
        }
    }
}

/// Routes intents to handlers by action prefix
#[derive(Default)]
pub struct ActionDispatcher {
    handlers: HashMap<String, Arc<dyn ActionHandler>>,
}

impl ActionDispatcher {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `handler` for actions starting with `prefix.`
    #[must_use]
    pub fn register(mut self, prefix: &str, handler: Arc<dyn ActionHandler>) -> Self {
        self.handlers.insert(prefix.to_string(), handler);
        self
    }

    pub async fn dispatch(&self, request: &WebhookRequest) -> crate::Result<WebhookResponse> {
        let query = request.query_result();
        info!(
            action = %query.action,
            query_text = query.query_text.as_deref().unwrap_or_default(),
            "Creating response for query"
        );

        let prefix = query.action.split('.').next().unwrap_or_default();
        let Some(handler) = self.handlers.get(prefix) else {
            debug!(prefix, "No handler registered");
            return Ok(WebhookResponse::new(NOT_IMPLEMENTED));
        };

        let store = OutputContextStore::new(&query.output_contexts);
        let result = match merge_context(query, &store) {
            Ok(context) => handler.handle(&context).await,
            Err(e) => Err(e),
        };

        match result {
            Ok(text) => Ok(WebhookResponse::new(text)),
            Err(e) if e.is_user_error() => {
                warn!(action = %query.action, error = %e, "Rejected intent");
                Err(e)
            }
            Err(e) => {
                error!(action = %query.action, error = %e, "Failed to fulfill intent");
                Err(e)
            }
        }
    }
}
