// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion against temp SQLite and the scripted provider.

use http::{HeaderMap, HeaderValue, StatusCode};
use serde_json::{Value, json};
use zapflow_config::model::WebhookConfig;
use zapflow_core::StorageAdapter;
use zapflow_core::types::{
    ChannelProviderConfig, ConversationStatus, DeliveryStatus, SentUpdate,
};
use zapflow_inbox::{Inbox, OutboundTemplate};
use zapflow_storage::queries::{channels, messages, webhook_events};
use zapflow_test_utils::harness::{CAMPAIGN_ID, CHANNEL_ID, TENANT_ID};
use zapflow_test_utils::mock_provider::MOCK_SIGNATURE_HEADER;
use zapflow_test_utils::TestHarness;
use zapflow_webhook::{IngestError, WebhookIngestor};

fn ingestor(harness: &TestHarness, require_secret: bool) -> WebhookIngestor {
    WebhookIngestor::new(
        harness.storage(),
        harness.registry(),
        Inbox::new(harness.storage(), &harness.config.inbox),
        &WebhookConfig { require_secret },
    )
}

fn status(id: &str, status: &str, at: &str) -> Value {
    json!({
        "event": "status_update",
        "provider_message_id": id,
        "status": status,
        "timestamp": at,
    })
}

fn inbound(id: &str, from: &str, body: &str) -> Value {
    json!({
        "event": "inbound_message",
        "from": from,
        "contact_name": "Maria Silva",
        "provider_message_id": id,
        "timestamp": "2026-01-02T10:00:00.000Z",
        "content": {"type": "text", "body": body},
    })
}

fn body(events: Vec<Value>) -> Vec<u8> {
    serde_json::to_vec(&json!({ "events": events })).unwrap()
}

/// Marks `rcpt-0` sent as `wamid.S1` and mirrors it in the inbox.
async fn seed_sent(harness: &TestHarness) {
    let storage = harness.storage();
    storage
        .mark_recipient_sent(
            "rcpt-0",
            &SentUpdate {
                provider_message_id: "wamid.S1".to_string(),
                correlation_id: "corr-1".to_string(),
                attempts: 1,
                sent_at: "2026-01-02T09:00:00.000Z".to_string(),
            },
        )
        .await
        .unwrap();
    let channel = harness.channel().await;
    let inbox = Inbox::new(storage, &harness.config.inbox);
    inbox
        .record_outbound_template(OutboundTemplate {
            channel: &channel,
            contact_id: "contact-0",
            recipient_id: "rcpt-0",
            provider_message_id: "wamid.S1",
            content: "Olá Maria".to_string(),
            payload: json!({"name": "promo"}),
            sent_at: "2026-01-02T09:00:00.000Z",
        })
        .await
        .expect("outbound copy recorded");
}

#[tokio::test]
async fn receipts_only_move_forward() {
    let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
    seed_sent(&harness).await;
    let ingestor = ingestor(&harness, false);
    let headers = HeaderMap::new();

    let summary = ingestor
        .ingest(
            CHANNEL_ID,
            &headers,
            &body(vec![status("wamid.S1", "delivered", "2026-01-02T09:01:00.000Z")]),
        )
        .await
        .unwrap();
    assert_eq!(summary.statuses_applied, 1);
    assert_eq!(harness.recipient(0).await.status, DeliveryStatus::Delivered);
    assert_eq!(harness.campaign().await.counters.delivered, 1);

    let record = webhook_events::get_webhook_event(harness.db(), &summary.event_id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.processed);
    assert_eq!(record.event_count, 1);
    assert_eq!(record.linked_recipient_id.as_deref(), Some("rcpt-0"));
    assert!(record.linked_message_id.is_some());

    // A late "sent" receipt is stale.
    let stale = ingestor
        .ingest(
            CHANNEL_ID,
            &headers,
            &body(vec![status("wamid.S1", "sent", "2026-01-02T09:00:30.000Z")]),
        )
        .await
        .unwrap();
    assert_eq!(stale.statuses_applied, 0);
    assert_eq!(harness.recipient(0).await.status, DeliveryStatus::Delivered);

    ingestor
        .ingest(
            CHANNEL_ID,
            &headers,
            &body(vec![status("wamid.S1", "read", "2026-01-02T09:02:00.000Z")]),
        )
        .await
        .unwrap();
    let read = harness.recipient(0).await;
    assert_eq!(read.status, DeliveryStatus::Read);
    assert!(read.read_at.is_some());
    let message = harness
        .storage()
        .find_message_by_provider_id(CHANNEL_ID, "wamid.S1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.status, DeliveryStatus::Read);
}

#[tokio::test]
async fn failed_receipt_overrides_read() {
    let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
    seed_sent(&harness).await;
    let ingestor = ingestor(&harness, false);

    let mut failed = status("wamid.S1", "failed", "2026-01-02T09:05:00.000Z");
    failed["error_code"] = json!("131026");
    failed["error_detail"] = json!("Message undeliverable");
    ingestor
        .ingest(
            CHANNEL_ID,
            &HeaderMap::new(),
            &body(vec![
                status("wamid.S1", "read", "2026-01-02T09:02:00.000Z"),
                failed,
            ]),
        )
        .await
        .unwrap();

    let recipient = harness.recipient(0).await;
    assert_eq!(recipient.status, DeliveryStatus::Failed);
    assert_eq!(recipient.last_error_code.as_deref(), Some("131026"));
    assert_eq!(harness.campaign().await.counters.failed, 1);
}

#[tokio::test]
async fn inbound_message_lands_in_conversation_once() {
    let harness = TestHarness::builder().build().await.unwrap();
    let ingestor = ingestor(&harness, false);
    let payload = body(vec![inbound("wamid.IN1", "5511912345678", "quero saber mais")]);

    let first = ingestor.ingest(CHANNEL_ID, &HeaderMap::new(), &payload).await.unwrap();
    assert_eq!(first.messages_received, 1);
    assert_eq!(first.duplicates, 0);

    let storage = harness.storage();
    let contact = storage
        .upsert_contact_by_phone(TENANT_ID, "5511912345678", None)
        .await
        .unwrap();
    assert_eq!(contact.name.as_deref(), Some("Maria Silva"));
    let conversation = storage
        .find_active_conversation(TENANT_ID, CHANNEL_ID, &contact.id)
        .await
        .unwrap()
        .expect("conversation created");
    assert_eq!(conversation.status, ConversationStatus::Open);
    assert_eq!(conversation.last_message_preview.as_deref(), Some("quero saber mais"));
    assert!(conversation.last_inbound_at.is_some());

    let second = ingestor.ingest(CHANNEL_ID, &HeaderMap::new(), &payload).await.unwrap();
    assert_eq!(second.messages_received, 0);
    assert_eq!(second.duplicates, 1);
    let stored = messages::list_messages(harness.db(), &conversation.id).await.unwrap();
    assert_eq!(stored.len(), 1);
}

#[tokio::test]
async fn one_bad_event_does_not_stop_the_rest() {
    let harness = TestHarness::builder().build().await.unwrap();
    let ingestor = ingestor(&harness, false);

    let summary = ingestor
        .ingest(
            CHANNEL_ID,
            &HeaderMap::new(),
            &body(vec![
                inbound("wamid.BAD", "not-a-phone", "oi"),
                inbound("wamid.OK", "5511912345678", "oi"),
            ]),
        )
        .await
        .unwrap();
    assert_eq!(summary.events, 2);
    assert_eq!(summary.messages_received, 1);
    assert_eq!(summary.errors.len(), 1);
    assert!(summary.errors[0].starts_with("wamid.BAD"));

    let record = webhook_events::get_webhook_event(harness.db(), &summary.event_id)
        .await
        .unwrap()
        .unwrap();
    assert!(record.processed);
    assert!(record.error.is_some());
}

#[tokio::test]
async fn signed_channel_rejects_missing_signature() {
    let harness = TestHarness::builder()
        .with_channel_config(ChannelProviderConfig {
            base_url: "https://graph.example.test/v21.0".to_string(),
            auth_token: Some("test-token".to_string()),
            phone_number_id: Some("PNID".to_string()),
            webhook_secret: Some("s3cret".to_string()),
            ..Default::default()
        })
        .build()
        .await
        .unwrap();
    let ingestor = ingestor(&harness, true);
    let payload = body(vec![]);

    let err = ingestor
        .ingest(CHANNEL_ID, &HeaderMap::new(), &payload)
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::Unauthorized(_)));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

    let mut headers = HeaderMap::new();
    headers.insert(MOCK_SIGNATURE_HEADER, HeaderValue::from_static("s3cret"));
    let summary = ingestor.ingest(CHANNEL_ID, &headers, &payload).await.unwrap();
    assert_eq!(summary.events, 0);
}

#[tokio::test]
async fn unsigned_channel_rejected_when_secret_required() {
    let harness = TestHarness::builder().build().await.unwrap();
    let err = ingestor(&harness, true)
        .ingest(CHANNEL_ID, &HeaderMap::new(), &body(vec![]))
        .await
        .unwrap_err();
    assert!(matches!(err, IngestError::SecretRequired));
    assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn malformed_body_and_unknown_channel() {
    let harness = TestHarness::builder().build().await.unwrap();
    let ingestor = ingestor(&harness, false);

    let err = ingestor
        .ingest(CHANNEL_ID, &HeaderMap::new(), b"{not json")
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::BAD_REQUEST);

    let err = ingestor
        .ingest("nope", &HeaderMap::new(), &body(vec![]))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn subscription_handshake_echoes_challenge() {
    let harness = TestHarness::builder()
        .with_channel_config(ChannelProviderConfig {
            verify_token: Some("vt-123".to_string()),
            ..Default::default()
        })
        .build()
        .await
        .unwrap();
    let ingestor = ingestor(&harness, false);

    let challenge = ingestor
        .verify_subscription(CHANNEL_ID, Some("subscribe"), Some("vt-123"), Some("42"))
        .await
        .unwrap();
    assert_eq!(challenge, "42");

    let err = ingestor
        .verify_subscription(CHANNEL_ID, Some("subscribe"), Some("wrong"), Some("42"))
        .await
        .unwrap_err();
    assert_eq!(err.status(), StatusCode::FORBIDDEN);
}

#[tokio::test]
async fn receipt_for_unknown_message_is_harmless() {
    let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
    let summary = ingestor(&harness, false)
        .ingest(
            CHANNEL_ID,
            &HeaderMap::new(),
            &body(vec![status("wamid.GHOST", "delivered", "2026-01-02T09:01:00.000Z")]),
        )
        .await
        .unwrap();
    assert_eq!(summary.statuses_applied, 0);
    assert!(summary.errors.is_empty());
    assert_eq!(harness.campaign().await.id, CAMPAIGN_ID);
    assert_eq!(harness.recipient(0).await.status, DeliveryStatus::Queued);
}

#[tokio::test]
async fn receipt_from_another_channel_leaves_recipient_alone() {
    let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
    seed_sent(&harness).await;

    let mut foreign = harness.channel().await;
    foreign.id = "ch-other".to_string();
    foreign.tenant_id = "tenant-other".to_string();
    foreign.config.webhook_secret = None;
    channels::insert_channel(harness.db(), &foreign).await.unwrap();

    let summary = ingestor(&harness, false)
        .ingest(
            "ch-other",
            &HeaderMap::new(),
            &body(vec![status("wamid.S1", "failed", "2026-01-02T09:05:00.000Z")]),
        )
        .await
        .unwrap();
    assert_eq!(summary.statuses_applied, 0);

    let recipient = harness.recipient(0).await;
    assert_eq!(recipient.status, DeliveryStatus::Sent);
    assert_eq!(harness.campaign().await.counters.failed, 0);
    let message = harness
        .storage()
        .find_message_by_provider_id(CHANNEL_ID, "wamid.S1")
        .await
        .unwrap()
        .unwrap();
    assert_eq!(message.status, DeliveryStatus::Sent);
}
