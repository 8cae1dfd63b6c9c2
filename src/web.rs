use std::sync::Arc;

use axum::{
    Router,
    extract::{State, rejection::JsonRejection},
    response::Json,
    routing::{get, post},
};
use serde_json::{Value, json};
use tower_http::cors::{Any, CorsLayer};
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;

use crate::config::FulfillmentConfig;
use crate::dispatcher::ActionDispatcher;
use crate::error::FulfillmentError;
use crate::models::{WebhookRequest, WebhookResponse};

#[derive(Clone)]
pub struct AppState {
    pub dispatcher: Arc<ActionDispatcher>,
}

pub fn router(dispatcher: Arc<ActionDispatcher>, body_limit_bytes: usize) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .route("/webhook", post(webhook))
        .route("/health", get(health))
        .with_state(AppState { dispatcher })
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
}

async fn webhook(
    State(state): State<AppState>,
    payload: Result<Json<WebhookRequest>, JsonRejection>,
) -> Result<Json<WebhookResponse>, FulfillmentError> {
    let Json(request) = payload.map_err(|rejection| {
        FulfillmentError::invalid_data(format!(
            "unreadable webhook body: {}",
            rejection.body_text()
        ))
    })?;

    let response = state.dispatcher.dispatch(&request).await?;
    Ok(Json(response))
}

async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

pub async fn run(
    config: &FulfillmentConfig,
    dispatcher: Arc<ActionDispatcher>,
) -> anyhow::Result<()> {
    let app = router(dispatcher, config.server.body_limit_kb as usize * 1024);

    let addr = config.listen_addr();
    let listener = tokio::net::TcpListener::bind(&addr).await?;
    tracing::info!("Fulfillment webhook listening on http://{}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("Fulfillment webhook stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::error!("Failed to listen for shutdown signal: {}", e);
    }
}
