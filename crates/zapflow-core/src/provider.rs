// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request and result types exchanged with provider adapters.

use serde::{Deserialize, Serialize};

use crate::error::ProviderError;

/// Outcome of a send call.
///
/// Failures travel in `error`; adapters do not return `Err` for a rejected send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SendResult {
    pub success: bool,
    pub provider_message_id: Option<String>,
    pub raw_response: serde_json::Value,
    pub error: Option<ProviderError>,
}

impl SendResult {
    pub fn sent(provider_message_id: impl Into<String>, raw_response: serde_json::Value) -> Self {
        Self {
            success: true,
            provider_message_id: Some(provider_message_id.into()),
            raw_response,
            error: None,
        }
    }

    pub fn failed(error: ProviderError, raw_response: serde_json::Value) -> Self {
        Self {
            success: false,
            provider_message_id: None,
            raw_response,
            error: Some(error),
        }
    }

    /// The provider message id of a confirmed send.
    ///
    /// A send counts as confirmed only with `success` and a non-empty id.
    pub fn confirmed_id(&self) -> Option<&str> {
        if !self.success {
            return None;
        }
        self.provider_message_id
            .as_deref()
            .filter(|id| !id.trim().is_empty())
    }

    /// The failure to record for an unconfirmed send.
    pub fn failure(&self) -> ProviderError {
        match &self.error {
            Some(err) => err.clone(),
            None => ProviderError::no_message_id(),
        }
    }
}

/// Outcome of a media upload.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadResult {
    pub success: bool,
    pub media_id: Option<String>,
    pub error: Option<ProviderError>,
}

/// Outcome of a channel connection test.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectionTest {
    pub success: bool,
    pub error: Option<String>,
    pub details: Option<serde_json::Value>,
}

/// Media kind of a header parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MediaKind {
    Image,
    Video,
    Document,
}

/// Link for a media header.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HeaderMedia {
    pub kind: MediaKind,
    pub link: String,
}

/// Resolved values for one dynamic button.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ButtonParameters {
    pub index: usize,
    pub values: Vec<String>,
}

/// Already-resolved template values, in placeholder order per section.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateParameters {
    pub header: Vec<String>,
    pub header_media: Option<HeaderMedia>,
    pub body: Vec<String>,
    pub buttons: Vec<ButtonParameters>,
}

/// A template send request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateMessage {
    pub name: String,
    pub language: String,
    pub parameters: TemplateParameters,
}

/// Input of a media upload.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaSource {
    /// Remote file fetched by the adapter before upload.
    Url(String),
    Bytes(Vec<u8>),
}

/// Result of webhook authentication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WebhookAuth {
    /// Signature present and valid.
    Verified,
    /// No secret configured for the channel; accepted without verification.
    Unsigned,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::codes;

    #[test]
    fn success_without_id_is_not_confirmed() {
        let result = SendResult {
            success: true,
            provider_message_id: Some("  ".into()),
            raw_response: serde_json::json!({}),
            error: None,
        };
        assert_eq!(result.confirmed_id(), None);
        assert_eq!(result.failure().code, codes::NO_MESSAGE_ID);
    }

    #[test]
    fn confirmed_send_exposes_id() {
        let result = SendResult::sent("wamid.1", serde_json::json!({"id": "wamid.1"}));
        assert_eq!(result.confirmed_id(), Some("wamid.1"));
    }
}
