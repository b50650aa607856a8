// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook signature verification and payload normalization.
//!
//! Payloads have the shape `entry[].changes[].value.{messages, statuses,
//! contacts, metadata}`. Each message or status is mapped by checking the
//! fields it must carry; anything unrecognized is skipped rather than guessed.

use hmac::{Hmac, Mac};
use serde_json::Value;
use sha2::Sha256;
use tracing::{debug, warn};
use zapflow_core::error::codes;
use zapflow_core::events::{InboundContent, InboundMessage, StatusUpdate, WebhookEvent};
use zapflow_core::provider::WebhookAuth;
use zapflow_core::time::{from_unix_secs, now_ts};
use zapflow_core::types::{ChannelProviderConfig, DeliveryStatus};
use zapflow_core::{ErrorCategory, ProviderError};

type HmacSha256 = Hmac<Sha256>;

/// Header carrying `sha256=<hex>` over the raw body.
pub const SIGNATURE_HEADER: &str = "x-hub-signature-256";

fn signature_error(code: &str, message: &str) -> ProviderError {
    ProviderError {
        blocks_channel: false,
        ..ProviderError::new(ErrorCategory::Auth, code, message)
    }
}

/// Verifies the HMAC-SHA256 signature of a webhook body.
///
/// Without a channel secret the request is accepted as unsigned. With a
/// secret, a missing, malformed, or mismatching signature is rejected.
pub fn verify_signature(
    config: &ChannelProviderConfig,
    headers: &http::HeaderMap,
    raw_body: &[u8],
) -> Result<WebhookAuth, ProviderError> {
    let Some(secret) = config.secret() else {
        return Ok(WebhookAuth::Unsigned);
    };

    let header = headers
        .get(SIGNATURE_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| signature_error(codes::MISSING_SIGNATURE, "webhook signature header missing"))?;

    let hex_digest = header.strip_prefix("sha256=").unwrap_or(header);
    let expected = hex::decode(hex_digest)
        .map_err(|_| signature_error(codes::INVALID_SIGNATURE, "webhook signature is not valid hex"))?;

    let mut mac = HmacSha256::new_from_slice(secret.as_bytes())
        .map_err(|_| signature_error(codes::INVALID_SIGNATURE, "webhook secret unusable"))?;
    mac.update(raw_body);
    mac.verify_slice(&expected)
        .map_err(|_| signature_error(codes::INVALID_SIGNATURE, "webhook signature mismatch"))?;
    Ok(WebhookAuth::Verified)
}

/// Computes the signature header value for a body. Used by tests and tooling.
pub fn sign(secret: &str, raw_body: &[u8]) -> Option<String> {
    let mut mac = HmacSha256::new_from_slice(secret.as_bytes()).ok()?;
    mac.update(raw_body);
    Some(format!("sha256={}", hex::encode(mac.finalize().into_bytes())))
}

/// Maps a Cloud API webhook payload into normalized events.
///
/// Changes addressed to a different phone number id than the channel's are ignored.
pub fn parse_payload(config: &ChannelProviderConfig, body: &Value) -> Vec<WebhookEvent> {
    let mut events = Vec::new();
    let Some(entries) = body.get("entry").and_then(Value::as_array) else {
        debug!("webhook payload has no entry array");
        return events;
    };

    for change in entries
        .iter()
        .filter_map(|e| e.get("changes").and_then(Value::as_array))
        .flatten()
    {
        let Some(value) = change.get("value") else {
            continue;
        };
        if let (Some(expected), Some(actual)) = (
            config.sender_id(),
            value.pointer("/metadata/phone_number_id").and_then(Value::as_str),
        ) && expected != actual
        {
            warn!(expected, actual, "skipping webhook change for another phone number id");
            continue;
        }

        let contacts = value.get("contacts").and_then(Value::as_array);
        for message in array(value, "messages") {
            match parse_message(message, contacts) {
                Some(inbound) => events.push(WebhookEvent::InboundMessage(inbound)),
                None => debug!("skipping unrecognized inbound message"),
            }
        }
        for status in array(value, "statuses") {
            match parse_status(status) {
                Some(update) => events.push(WebhookEvent::StatusUpdate(update)),
                None => debug!("skipping unrecognized status entry"),
            }
        }
    }
    events
}

fn array<'a>(value: &'a Value, key: &str) -> impl Iterator<Item = &'a Value> {
    value
        .get(key)
        .and_then(Value::as_array)
        .into_iter()
        .flatten()
}

fn text(value: &Value, key: &str) -> Option<String> {
    value
        .get(key)
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn timestamp(value: &Value) -> String {
    let secs = match value.get("timestamp") {
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(Value::Number(n)) => n.as_i64(),
        _ => None,
    };
    secs.and_then(from_unix_secs).unwrap_or_else(now_ts)
}

fn digits(raw: &str) -> String {
    raw.chars().filter(char::is_ascii_digit).collect()
}

fn profile_name(contacts: Option<&Vec<Value>>, from: &str) -> Option<String> {
    let contacts = contacts?;
    contacts
        .iter()
        .find(|c| c.get("wa_id").and_then(Value::as_str).map(digits).as_deref() == Some(from))
        .or_else(|| contacts.first())
        .and_then(|c| c.pointer("/profile/name"))
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
}

fn parse_message(message: &Value, contacts: Option<&Vec<Value>>) -> Option<InboundMessage> {
    let from = digits(&text(message, "from")?);
    if from.is_empty() {
        return None;
    }
    let provider_message_id = text(message, "id")?;
    let kind = text(message, "type").unwrap_or_else(|| "text".to_string());
    let content = parse_content(&kind, message)?;

    Some(InboundMessage {
        contact_name: profile_name(contacts, &from),
        from,
        provider_message_id,
        timestamp: timestamp(message),
        content,
        context_message_id: message.get("context").and_then(|c| text(c, "id")),
    })
}

fn parse_content(kind: &str, message: &Value) -> Option<InboundContent> {
    let content = match kind {
        "text" => InboundContent::Text {
            body: message
                .pointer("/text/body")
                .and_then(Value::as_str)?
                .to_string(),
        },
        "image" | "video" | "audio" | "document" | "sticker" => {
            let media = message.get(kind)?;
            InboundContent::Media {
                kind: kind.to_string(),
                media_id: text(media, "id")?,
                mime_type: text(media, "mime_type"),
                caption: text(media, "caption"),
                filename: text(media, "filename"),
            }
        }
        "location" => {
            let location = message.get("location")?;
            InboundContent::Location {
                latitude: location.get("latitude").and_then(Value::as_f64)?,
                longitude: location.get("longitude").and_then(Value::as_f64)?,
                name: text(location, "name"),
                address: text(location, "address"),
            }
        }
        "contacts" => InboundContent::Contacts {
            names: array(message, "contacts")
                .filter_map(|c| c.pointer("/name/formatted_name").and_then(Value::as_str))
                .map(str::to_string)
                .collect(),
        },
        "button" => {
            let button = message.get("button")?;
            InboundContent::Reply {
                id: text(button, "payload"),
                title: text(button, "text")?,
            }
        }
        "interactive" => {
            let interactive = message.get("interactive")?;
            let reply = interactive
                .get("button_reply")
                .or_else(|| interactive.get("list_reply"))?;
            InboundContent::Reply {
                id: text(reply, "id"),
                title: text(reply, "title")?,
            }
        }
        "reaction" => {
            let reaction = message.get("reaction")?;
            InboundContent::Reaction {
                emoji: reaction
                    .get("emoji")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string(),
                message_id: text(reaction, "message_id")?,
            }
        }
        other => InboundContent::Unsupported {
            kind: other.to_string(),
        },
    };
    Some(content)
}

fn parse_status(status: &Value) -> Option<StatusUpdate> {
    let provider_message_id = text(status, "id")?;
    let delivery = match text(status, "status")?.as_str() {
        "sent" => DeliveryStatus::Sent,
        "delivered" => DeliveryStatus::Delivered,
        "read" => DeliveryStatus::Read,
        "failed" => DeliveryStatus::Failed,
        _ => return None,
    };
    let first_error = status
        .get("errors")
        .and_then(Value::as_array)
        .and_then(|errors| errors.first());
    let error_code = first_error.and_then(|e| match e.get("code") {
        Some(Value::Number(n)) => Some(n.to_string()),
        Some(Value::String(s)) if !s.is_empty() => Some(s.clone()),
        _ => None,
    });
    let error_detail = first_error.and_then(|e| {
        e.pointer("/error_data/details")
            .and_then(Value::as_str)
            .or_else(|| e.get("message").and_then(Value::as_str))
            .or_else(|| e.get("title").and_then(Value::as_str))
            .map(str::to_string)
    });

    Some(StatusUpdate {
        provider_message_id,
        status: delivery,
        recipient: text(status, "recipient_id").map(|r| digits(&r)),
        error_code,
        error_detail,
        timestamp: timestamp(status),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn config_with_secret(secret: Option<&str>) -> ChannelProviderConfig {
        ChannelProviderConfig {
            webhook_secret: secret.map(str::to_string),
            phone_number_id: Some("PNID".to_string()),
            ..Default::default()
        }
    }

    fn headers_with(signature: &str) -> http::HeaderMap {
        let mut headers = http::HeaderMap::new();
        headers.insert(SIGNATURE_HEADER, signature.parse().unwrap());
        headers
    }

    fn envelope(value: Value) -> Value {
        json!({
            "object": "whatsapp_business_account",
            "entry": [{"id": "WABA", "changes": [{"field": "messages", "value": value}]}]
        })
    }

    #[test]
    fn valid_signature_verifies() {
        let body = br#"{"entry":[]}"#;
        let config = config_with_secret(Some("s3cret"));
        let signature = sign("s3cret", body).unwrap();
        let auth = verify_signature(&config, &headers_with(&signature), body).unwrap();
        assert_eq!(auth, WebhookAuth::Verified);
    }

    #[test]
    fn tampered_body_fails_closed() {
        let config = config_with_secret(Some("s3cret"));
        let signature = sign("s3cret", b"original").unwrap();
        let err = verify_signature(&config, &headers_with(&signature), b"tampered").unwrap_err();
        assert_eq!(err.code, codes::INVALID_SIGNATURE);
        assert_eq!(err.category, ErrorCategory::Auth);
        assert!(!err.blocks_channel);
    }

    #[test]
    fn missing_header_with_secret_fails() {
        let config = config_with_secret(Some("s3cret"));
        let err = verify_signature(&config, &http::HeaderMap::new(), b"{}").unwrap_err();
        assert_eq!(err.code, codes::MISSING_SIGNATURE);

        let err = verify_signature(&config, &headers_with("sha256=zz"), b"{}").unwrap_err();
        assert_eq!(err.code, codes::INVALID_SIGNATURE);
    }

    #[test]
    fn no_secret_is_unsigned() {
        let config = config_with_secret(None);
        let auth = verify_signature(&config, &http::HeaderMap::new(), b"{}").unwrap();
        assert_eq!(auth, WebhookAuth::Unsigned);
    }

    #[test]
    fn parses_text_message_with_profile_and_context() {
        let body = envelope(json!({
            "messaging_product": "whatsapp",
            "metadata": {"display_phone_number": "15550001111", "phone_number_id": "PNID"},
            "contacts": [{"profile": {"name": "Maria Silva"}, "wa_id": "5511987654321"}],
            "messages": [{
                "from": "5511987654321",
                "id": "wamid.IN1",
                "timestamp": "1767225600",
                "type": "text",
                "text": {"body": "Quero saber mais"},
                "context": {"from": "15550001111", "id": "wamid.OUT1"}
            }]
        }));
        let events = parse_payload(&config_with_secret(None), &body);
        assert_eq!(events.len(), 1);
        let WebhookEvent::InboundMessage(msg) = &events[0] else {
            panic!("expected inbound message");
        };
        assert_eq!(msg.from, "5511987654321");
        assert_eq!(msg.contact_name.as_deref(), Some("Maria Silva"));
        assert_eq!(msg.timestamp, "2026-01-01T00:00:00.000Z");
        assert_eq!(msg.context_message_id.as_deref(), Some("wamid.OUT1"));
        assert_eq!(
            msg.content,
            InboundContent::Text {
                body: "Quero saber mais".to_string()
            }
        );
    }

    #[test]
    fn parses_media_location_and_replies() {
        let body = envelope(json!({
            "metadata": {"phone_number_id": "PNID"},
            "messages": [
                {"from": "551100000001", "id": "m1", "type": "image",
                 "image": {"id": "media-1", "mime_type": "image/jpeg", "caption": "foto"}},
                {"from": "551100000001", "id": "m2", "type": "location",
                 "location": {"latitude": -23.5, "longitude": -46.6, "name": "Loja"}},
                {"from": "551100000001", "id": "m3", "type": "interactive",
                 "interactive": {"type": "button_reply", "button_reply": {"id": "yes", "title": "Sim"}}},
                {"from": "551100000001", "id": "m4", "type": "reaction",
                 "reaction": {"message_id": "wamid.OUT1", "emoji": "👍"}},
                {"from": "551100000001", "id": "m5", "type": "ephemeral"}
            ]
        }));
        let events = parse_payload(&config_with_secret(None), &body);
        let kinds: Vec<String> = events
            .iter()
            .map(|e| match e {
                WebhookEvent::InboundMessage(m) => m.content.kind().to_string(),
                WebhookEvent::StatusUpdate(_) => "status".to_string(),
            })
            .collect();
        assert_eq!(kinds, vec!["image", "location", "reply", "reaction", "ephemeral"]);
    }

    #[test]
    fn parses_statuses_with_errors() {
        let body = envelope(json!({
            "metadata": {"phone_number_id": "PNID"},
            "statuses": [
                {"id": "wamid.OUT1", "status": "read", "timestamp": "1767225600",
                 "recipient_id": "5511987654321"},
                {"id": "wamid.OUT2", "status": "failed", "timestamp": 1767225600,
                 "recipient_id": "5511987654322",
                 "errors": [{"code": 131026, "title": "Message undeliverable",
                             "error_data": {"details": "not on WhatsApp"}}]},
                {"id": "wamid.OUT3", "status": "deleted"}
            ]
        }));
        let events = parse_payload(&config_with_secret(None), &body);
        assert_eq!(events.len(), 2);
        let WebhookEvent::StatusUpdate(failed) = &events[1] else {
            panic!("expected status update");
        };
        assert_eq!(failed.status, DeliveryStatus::Failed);
        assert_eq!(failed.error_code.as_deref(), Some("131026"));
        assert_eq!(failed.error_detail.as_deref(), Some("not on WhatsApp"));
    }

    #[test]
    fn malformed_payloads_yield_nothing() {
        let config = config_with_secret(None);
        assert!(parse_payload(&config, &json!({})).is_empty());
        assert!(parse_payload(&config, &json!({"entry": "nope"})).is_empty());
        assert!(parse_payload(&config, &json!({"entry": [{"changes": [{}]}]})).is_empty());
        let missing_id = envelope(json!({"messages": [{"from": "55", "type": "text", "text": {"body": "x"}}]}));
        assert!(parse_payload(&config, &missing_id).is_empty());
    }

    #[test]
    fn other_phone_number_ids_are_ignored() {
        let body = envelope(json!({
            "metadata": {"phone_number_id": "SOMEONE_ELSE"},
            "statuses": [{"id": "wamid.X", "status": "sent"}]
        }));
        assert!(parse_payload(&config_with_secret(None), &body).is_empty());
    }

    proptest::proptest! {
        #[test]
        fn signature_binds_to_body(
            body in proptest::collection::vec(proptest::num::u8::ANY, 0..256),
            flip in 0usize..256,
        ) {
            let config = config_with_secret(Some("s3cret"));
            let signature = sign("s3cret", &body).unwrap();
            let headers = headers_with(&signature);
            proptest::prop_assert_eq!(
                verify_signature(&config, &headers, &body).unwrap(),
                WebhookAuth::Verified
            );

            let mut tampered = body.clone();
            if tampered.is_empty() {
                tampered.push(0);
            } else {
                let i = flip % tampered.len();
                tampered[i] ^= 0x01;
            }
            proptest::prop_assert!(verify_signature(&config, &headers, &tampered).is_err());
        }
    }
}
