// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Route-level tests driven through `tower::ServiceExt::oneshot`.

use std::sync::Arc;

use axum::Router;
use axum::body::Body;
use axum::http::{Request, StatusCode, header};
use serde_json::{Value, json};
use tower::ServiceExt;
use zapflow_campaign::BatchProcessor;
use zapflow_config::model::{StorageConfig, WebhookConfig};
use zapflow_core::StorageAdapter;
use zapflow_core::types::{CampaignStatus, ChannelProviderConfig, ChannelStatus};
use zapflow_gateway::{AuthConfig, GatewayState, router};
use zapflow_inbox::Inbox;
use zapflow_storage::SqliteStorage;
use zapflow_template::Resolver;
use zapflow_test_utils::TestHarness;
use zapflow_test_utils::harness::{CAMPAIGN_ID, CHANNEL_ID};
use zapflow_webhook::WebhookIngestor;

const TOKEN: &str = "gw-token";

fn app(harness: &TestHarness) -> Router {
    app_with_storage(harness, harness.storage())
}

fn app_with_storage(
    harness: &TestHarness,
    storage: Arc<dyn StorageAdapter + Send + Sync>,
) -> Router {
    let inbox = Inbox::new(storage.clone(), &harness.config.inbox);
    let processor = BatchProcessor::new(
        storage.clone(),
        harness.registry(),
        inbox.clone(),
        Resolver::new("cliente"),
        harness.config.campaign.clone(),
    );
    let ingestor = WebhookIngestor::new(
        storage,
        harness.registry(),
        inbox,
        &WebhookConfig::default(),
    );
    router(GatewayState::new(
        processor,
        ingestor,
        AuthConfig {
            bearer_token: Some(TOKEN.to_string()),
        },
    ))
}

fn authed_post(uri: &str, body: Value) -> Request<Body> {
    Request::post(uri)
        .header(header::AUTHORIZATION, format!("Bearer {TOKEN}"))
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from(body.to_string()))
        .unwrap()
}

async fn json_body(response: axum::response::Response) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

#[tokio::test]
async fn health_is_public() {
    let harness = TestHarness::builder().build().await.unwrap();
    let response = app(&harness)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["status"], "ok");
}

#[tokio::test]
async fn health_reports_unreachable_storage() {
    let harness = TestHarness::builder().build().await.unwrap();
    // Never initialized, so every query fails.
    let storage = Arc::new(SqliteStorage::new(StorageConfig {
        database_path: "unused.db".to_string(),
        wal_mode: false,
    }));
    let response = app_with_storage(&harness, storage)
        .oneshot(Request::get("/health").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
    assert_eq!(json_body(response).await["status"], "unavailable");
}

#[tokio::test]
async fn api_requires_bearer_token() {
    let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
    let request = Request::post("/v1/campaigns/process")
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::AUTHORIZATION, "Bearer wrong")
        .body(Body::from(json!({"campaignId": CAMPAIGN_ID}).to_string()))
        .unwrap();
    let response = app(&harness).oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(harness.provider.send_count().await, 0);
}

#[tokio::test]
async fn process_returns_batch_report() {
    let harness = TestHarness::builder().with_recipients(3).build().await.unwrap();
    let response = app(&harness)
        .oneshot(authed_post(
            "/v1/campaigns/process",
            json!({"campaignId": CAMPAIGN_ID, "speed": "fast"}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["campaignId"], CAMPAIGN_ID);
    assert_eq!(report["processed"], 3);
    assert_eq!(report["success"], 3);
    assert_eq!(report["finished"], true);
    assert_eq!(harness.campaign().await.status, CampaignStatus::Done);
}

#[tokio::test]
async fn precondition_failure_is_unprocessable() {
    let harness = TestHarness::builder()
        .with_recipients(1)
        .with_channel_status(ChannelStatus::Error)
        .build()
        .await
        .unwrap();
    let response = app(&harness)
        .oneshot(authed_post(
            "/v1/campaigns/process",
            json!({"campaignId": CAMPAIGN_ID}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(json_body(response).await["error"]["code"], "CHANNEL_NOT_CONNECTED");

    let response = app(&harness)
        .oneshot(authed_post("/v1/campaigns/process", json!({"campaignId": "nope"})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn validate_reports_without_sending() {
    let harness = TestHarness::builder().with_recipients(2).build().await.unwrap();
    let response = app(&harness)
        .oneshot(authed_post(
            &format!("/v1/campaigns/{CAMPAIGN_ID}/validate"),
            json!({}),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let report = json_body(response).await;
    assert_eq!(report["total"], 2);
    assert_eq!(report["valid"], 2);
    assert_eq!(harness.provider.send_count().await, 0);
}

#[tokio::test]
async fn channel_test_updates_status() {
    let harness = TestHarness::builder()
        .with_channel_status(ChannelStatus::Pending)
        .build()
        .await
        .unwrap();
    let response = app(&harness)
        .oneshot(authed_post(&format!("/v1/channels/{CHANNEL_ID}/test"), json!({})))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(json_body(response).await["success"], true);
    assert_eq!(harness.channel().await.status, ChannelStatus::Connected);
}

#[tokio::test]
async fn webhook_accepts_valid_payload_and_rejects_garbage() {
    let harness = TestHarness::builder().build().await.unwrap();
    let payload = json!({"events": [{
        "event": "inbound_message",
        "from": "5511912345678",
        "provider_message_id": "wamid.IN1",
        "timestamp": "2026-01-02T10:00:00.000Z",
        "content": {"type": "text", "body": "oi"},
    }]});

    let response = app(&harness)
        .oneshot(
            Request::post(format!("/webhooks/{CHANNEL_ID}"))
                .body(Body::from(payload.to_string()))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let ack = json_body(response).await;
    assert_eq!(ack["received"], true);
    assert_eq!(ack["messagesReceived"], 1);

    let response = app(&harness)
        .oneshot(
            Request::post(format!("/webhooks/{CHANNEL_ID}"))
                .body(Body::from("not json"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);

    let response = app(&harness)
        .oneshot(
            Request::post("/webhooks/unknown")
                .body(Body::from("{}"))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn webhook_with_bad_signature_is_unauthorized() {
    let harness = TestHarness::builder()
        .with_channel_config(ChannelProviderConfig {
            auth_token: Some("test-token".to_string()),
            phone_number_id: Some("PNID".to_string()),
            webhook_secret: Some("s3cret".to_string()),
            ..Default::default()
        })
        .build()
        .await
        .unwrap();
    let response = app(&harness)
        .oneshot(
            Request::post(format!("/webhooks/{CHANNEL_ID}"))
                .header("x-mock-signature", "wrong")
                .body(Body::from(r#"{"events": []}"#))
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn verification_handshake_echoes_challenge() {
    let harness = TestHarness::builder()
        .with_channel_config(ChannelProviderConfig {
            verify_token: Some("vt-123".to_string()),
            ..Default::default()
        })
        .build()
        .await
        .unwrap();
    let uri = format!(
        "/webhooks/{CHANNEL_ID}?hub.mode=subscribe&hub.verify_token=vt-123&hub.challenge=98765"
    );
    let response = app(&harness)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    assert_eq!(&bytes[..], b"98765");

    let uri = format!("/webhooks/{CHANNEL_ID}?hub.mode=subscribe&hub.verify_token=nope&hub.challenge=1");
    let response = app(&harness)
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::FORBIDDEN);
}
