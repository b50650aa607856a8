// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Normalized webhook events produced by provider adapters.

use serde::{Deserialize, Serialize};

use crate::types::DeliveryStatus;

/// A provider webhook mapped onto the generic contract.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum WebhookEvent {
    InboundMessage(InboundMessage),
    StatusUpdate(StatusUpdate),
}

/// A message sent by a contact to the channel.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundMessage {
    /// Sender phone as reported by the provider (digits only).
    pub from: String,
    /// Profile name when the provider sends one.
    pub contact_name: Option<String>,
    pub provider_message_id: String,
    /// UTC timestamp string.
    pub timestamp: String,
    pub content: InboundContent,
    /// Provider id of the message this one replies to.
    pub context_message_id: Option<String>,
}

/// Typed payload of an inbound message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InboundContent {
    Text {
        body: String,
    },
    Media {
        /// `image`, `video`, `audio`, `document`, or `sticker`.
        kind: String,
        media_id: String,
        mime_type: Option<String>,
        caption: Option<String>,
        filename: Option<String>,
    },
    Location {
        latitude: f64,
        longitude: f64,
        name: Option<String>,
        address: Option<String>,
    },
    Contacts {
        names: Vec<String>,
    },
    /// Quick-reply button or interactive list/button reply.
    Reply {
        id: Option<String>,
        title: String,
    },
    Reaction {
        emoji: String,
        message_id: String,
    },
    Unsupported {
        kind: String,
    },
}

impl InboundContent {
    /// Message kind stored on the inbox row.
    pub fn kind(&self) -> &str {
        match self {
            Self::Text { .. } => "text",
            Self::Media { kind, .. } => kind,
            Self::Location { .. } => "location",
            Self::Contacts { .. } => "contacts",
            Self::Reply { .. } => "reply",
            Self::Reaction { .. } => "reaction",
            Self::Unsupported { kind } => kind,
        }
    }

    /// Short human-readable text for conversation previews and message content.
    pub fn preview(&self) -> String {
        match self {
            Self::Text { body } => body.clone(),
            Self::Media { kind, caption, .. } => match caption {
                Some(caption) if !caption.is_empty() => caption.clone(),
                _ => format!("[{kind}]"),
            },
            Self::Location { name, .. } => match name {
                Some(name) => format!("[location] {name}"),
                None => "[location]".to_string(),
            },
            Self::Contacts { names } => format!("[contacts] {}", names.join(", ")),
            Self::Reply { title, .. } => title.clone(),
            Self::Reaction { emoji, .. } => emoji.clone(),
            Self::Unsupported { kind } => format!("[{kind}]"),
        }
    }
}

/// A delivery receipt for a previously sent message.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusUpdate {
    pub provider_message_id: String,
    pub status: DeliveryStatus,
    pub recipient: Option<String>,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
    pub timestamp: String,
}
