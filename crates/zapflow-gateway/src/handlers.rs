// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP request handlers.

use axum::{
    Json,
    body::Bytes,
    extract::{Path, Query, State},
    http::{HeaderMap, StatusCode},
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use zapflow_campaign::{BatchError, test_channel, validate_campaign};
use zapflow_core::types::SpeedTier;
use zapflow_webhook::{IngestError, IngestSummary};

use crate::server::GatewayState;

/// Body of `POST /v1/campaigns/process`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessRequest {
    pub campaign_id: String,
    #[serde(default)]
    pub speed: Option<SpeedTier>,
}

/// Query of `POST /v1/campaigns/{id}/validate`.
#[derive(Debug, Default, Deserialize)]
pub struct ValidateQuery {
    #[serde(default)]
    pub speed: Option<SpeedTier>,
}

/// Query of the webhook subscription handshake.
#[derive(Debug, Default, Deserialize)]
pub struct VerifyQuery {
    #[serde(rename = "hub.mode")]
    pub mode: Option<String>,
    #[serde(rename = "hub.verify_token")]
    pub verify_token: Option<String>,
    #[serde(rename = "hub.challenge")]
    pub challenge: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
    pub uptime_secs: u64,
}

/// Answer to an accepted webhook.
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    #[serde(flatten)]
    pub summary: IngestSummary,
}

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorDetail,
}

#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    pub code: String,
    pub message: String,
}

fn error_response(status: StatusCode, code: &str, message: String) -> Response {
    (
        status,
        Json(ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        }),
    )
        .into_response()
}

/// HTTP status of a rejected batch. Nothing was sent in any of these cases.
pub fn batch_error_status(err: &BatchError) -> StatusCode {
    match err {
        BatchError::CampaignNotFound(_) | BatchError::ChannelNotFound(_) => StatusCode::NOT_FOUND,
        BatchError::NotRunnable { .. } => StatusCode::CONFLICT,
        BatchError::MissingToken
        | BatchError::MissingSenderId
        | BatchError::ChannelNotConnected(_)
        | BatchError::ChannelBlocked(_)
        | BatchError::TemplateNotApproved(_)
        | BatchError::UnknownProvider(_) => StatusCode::UNPROCESSABLE_ENTITY,
        BatchError::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

fn batch_error(err: BatchError) -> Response {
    let status = batch_error_status(&err);
    if status.is_server_error() {
        tracing::error!(error = %err, "batch request failed");
    } else {
        tracing::warn!(code = err.code(), error = %err, "batch request rejected");
    }
    error_response(status, err.code(), err.to_string())
}

fn ingest_error(err: IngestError) -> Response {
    let status = err.status();
    if status.is_server_error() {
        tracing::error!(error = %err, "webhook request failed");
    }
    error_response(status, err.code(), err.to_string())
}

/// POST /v1/campaigns/process
pub async fn post_process(
    State(state): State<GatewayState>,
    Json(body): Json<ProcessRequest>,
) -> Response {
    match state.processor.process(&body.campaign_id, body.speed).await {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => batch_error(err),
    }
}

/// POST /v1/campaigns/{id}/validate
pub async fn post_validate(
    State(state): State<GatewayState>,
    Path(campaign_id): Path<String>,
    Query(query): Query<ValidateQuery>,
) -> Response {
    let config = state.processor.config();
    let speed = query.speed.unwrap_or(config.default_speed);
    let result = validate_campaign(
        state.processor.storage(),
        state.processor.resolver(),
        &campaign_id,
        config.max_retries,
        config.tier(speed).batch_size,
    )
    .await;
    match result {
        Ok(report) => (StatusCode::OK, Json(report)).into_response(),
        Err(err) => batch_error(err),
    }
}

/// POST /v1/channels/{id}/test
pub async fn post_channel_test(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
) -> Response {
    let result = test_channel(
        state.processor.storage(),
        state.processor.registry(),
        &channel_id,
    )
    .await;
    match result {
        Ok(test) => (StatusCode::OK, Json(test)).into_response(),
        Err(err) => batch_error(err),
    }
}

/// GET /webhooks/{channel_id}
pub async fn get_webhook_verify(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
    Query(query): Query<VerifyQuery>,
) -> Response {
    let result = state
        .ingestor
        .verify_subscription(
            &channel_id,
            query.mode.as_deref(),
            query.verify_token.as_deref(),
            query.challenge.as_deref(),
        )
        .await;
    match result {
        Ok(challenge) => (StatusCode::OK, challenge).into_response(),
        Err(err) => ingest_error(err),
    }
}

/// POST /webhooks/{channel_id}
pub async fn post_webhook(
    State(state): State<GatewayState>,
    Path(channel_id): Path<String>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    match state.ingestor.ingest(&channel_id, &headers, &body).await {
        Ok(summary) => (
            StatusCode::OK,
            Json(WebhookAck {
                received: true,
                summary,
            }),
        )
            .into_response(),
        Err(err) => ingest_error(err),
    }
}

/// GET /health
///
/// Answers 503 when storage does not respond.
pub async fn get_health(State(state): State<GatewayState>) -> Response {
    let (status, label) = match state.processor.storage().health_check().await {
        Ok(()) => (StatusCode::OK, "ok"),
        Err(err) => {
            tracing::error!(error = %err, "storage health check failed");
            (StatusCode::SERVICE_UNAVAILABLE, "unavailable")
        }
    };
    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
            uptime_secs: state.started.elapsed().as_secs(),
        }),
    )
        .into_response()
}
