// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Gateway HTTP server built on axum.

use std::time::Instant;

use axum::{
    Router,
    extract::DefaultBodyLimit,
    middleware as axum_middleware,
    routing::{get, post},
};
use tokio_util::sync::CancellationToken;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;
use zapflow_campaign::BatchProcessor;
use zapflow_core::ZapflowError;
use zapflow_webhook::WebhookIngestor;

use crate::auth::{AuthConfig, auth_middleware};
use crate::handlers;

/// Largest webhook body accepted.
const MAX_WEBHOOK_BODY: usize = 1024 * 1024;

/// Shared state for axum request handlers.
#[derive(Clone)]
pub struct GatewayState {
    pub processor: BatchProcessor,
    pub ingestor: WebhookIngestor,
    pub auth: AuthConfig,
    pub started: Instant,
}

impl GatewayState {
    pub fn new(processor: BatchProcessor, ingestor: WebhookIngestor, auth: AuthConfig) -> Self {
        Self {
            processor,
            ingestor,
            auth,
            started: Instant::now(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

/// Builds the route table:
/// - GET /health (public)
/// - GET|POST /webhooks/{channel_id} (authenticated by provider signature)
/// - POST /v1/campaigns/process, POST /v1/campaigns/{id}/validate,
///   POST /v1/channels/{id}/test (bearer auth)
pub fn router(state: GatewayState) -> Router {
    let auth_state = state.auth.clone();

    let public_routes = Router::new()
        .route("/health", get(handlers::get_health))
        .route(
            "/webhooks/{channel_id}",
            get(handlers::get_webhook_verify).post(handlers::post_webhook),
        )
        .layer(DefaultBodyLimit::max(MAX_WEBHOOK_BODY))
        .with_state(state.clone());

    let api_routes = Router::new()
        .route("/v1/campaigns/process", post(handlers::post_process))
        .route("/v1/campaigns/{id}/validate", post(handlers::post_validate))
        .route("/v1/channels/{id}/test", post(handlers::post_channel_test))
        .route_layer(axum_middleware::from_fn_with_state(
            auth_state,
            auth_middleware,
        ))
        .with_state(state);

    Router::new()
        .merge(public_routes)
        .merge(api_routes)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
}

/// Serves the gateway until `cancel` fires.
pub async fn start_server(
    config: &ServerConfig,
    state: GatewayState,
    cancel: CancellationToken,
) -> Result<(), ZapflowError> {
    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| ZapflowError::Internal(format!("failed to bind gateway to {addr}: {e}")))?;

    tracing::info!("gateway listening on {addr}");

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { cancel.cancelled().await })
        .await
        .map_err(|e| ZapflowError::Internal(format!("gateway server error: {e}")))?;

    tracing::info!("gateway stopped");
    Ok(())
}
