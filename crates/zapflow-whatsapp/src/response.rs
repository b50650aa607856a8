// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider message id extraction.
//!
//! Some BSPs relaying the Cloud API wrap or rename the send response. The
//! known shapes are tried in a fixed order and the first non-empty id wins.
//! This is a compatibility shim for those relays, not a general lookup.

use serde_json::Value;

/// JSON pointers tried in priority order.
const MESSAGE_ID_POINTERS: [&str; 6] = [
    "/id",
    "/message_id",
    "/messageId",
    "/messages/0/id",
    "/data/id",
    "/result/id",
];

/// Returns the first non-empty message id found in `body`.
pub fn extract_message_id(body: &Value) -> Option<String> {
    MESSAGE_ID_POINTERS
        .iter()
        .filter_map(|pointer| body.pointer(pointer))
        .find_map(id_text)
}

fn id_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) if !s.trim().is_empty() => Some(s.trim().to_string()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}
