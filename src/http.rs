//! Shared outgoing HTTP client
//!
//! One client is built at startup and handed to every provider adapter.
//! Transient failures are retried by middleware with exponential backoff;
//! nothing above this layer retries.

use std::time::Duration;

use reqwest_middleware::{ClientBuilder, ClientWithMiddleware};
use reqwest_retry::{RetryTransientMiddleware, policies::ExponentialBackoff};
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::HttpConfig;
use crate::error::FulfillmentError;

/// Build the retrying HTTP client used by all provider adapters
pub fn build_client(config: &HttpConfig) -> crate::Result<ClientWithMiddleware> {
    let client = reqwest::Client::builder()
        .timeout(Duration::from_secs(config.timeout_seconds.into()))
        .user_agent(config.user_agent.as_str())
        .build()
        .map_err(|e| FulfillmentError::config(format!("Failed to create HTTP client: {e}")))?;

    let retry_policy = ExponentialBackoff::builder().build_with_max_retries(config.max_retries);

    Ok(ClientBuilder::new(client)
        .with(RetryTransientMiddleware::new_with_policy(retry_policy))
        .build())
}

/// GET `url` and decode the JSON body; `provider` names the service in errors
pub(crate) async fn get_json<T: DeserializeOwned>(
    client: &ClientWithMiddleware,
    url: &str,
    provider: &str,
) -> crate::Result<T> {
    let response = client.get(url).send().await?;
    let status = response.status();
    debug!(provider, %status, "Provider response received");

    if !status.is_success() {
        warn!(provider, %status, "Provider request failed");
        return Err(FulfillmentError::api(format!(
            "{provider} request failed with status: {status}"
        )));
    }

    response
        .json::<T>()
        .await
        .map_err(|e| FulfillmentError::api(format!("Failed to parse {provider} response: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde::Deserialize;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[derive(Debug, Deserialize)]
    struct Pong {
        ok: bool,
    }

    fn test_client() -> ClientWithMiddleware {
        let config = HttpConfig {
            max_retries: 0,
            ..HttpConfig::default()
        };
        build_client(&config).unwrap()
    }

    #[tokio::test]
    async fn test_get_json_decodes_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/ping"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({"ok": true})))
            .mount(&server)
            .await;

        let pong: Pong = get_json(&test_client(), &format!("{}/ping", server.uri()), "test")
            .await
            .unwrap();
        assert!(pong.ok);
    }

    #[tokio::test]
    async fn test_get_json_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;

        let result: crate::Result<Pong> =
            get_json(&test_client(), &format!("{}/ping", server.uri()), "test").await;
        match result {
            Err(FulfillmentError::Api { message }) => assert!(message.contains("403")),
            other => panic!("expected API error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_get_json_maps_decode_errors() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let result: crate::Result<Pong> =
            get_json(&test_client(), &format!("{}/ping", server.uri()), "test").await;
        assert!(matches!(result, Err(FulfillmentError::Api { .. })));
    }
}
