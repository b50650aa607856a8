// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! WhatsApp Cloud API provider adapter for the Zapflow campaign engine.
//!
//! Implements [`ProviderAdapter`] against `POST {base}/{phone_number_id}/messages`,
//! `POST {base}/{phone_number_id}/media`, and `GET {base}/{phone_number_id}`.
//! All endpoints and credentials come from the channel's
//! [`ChannelProviderConfig`]; the adapter itself holds only a pooled HTTP client.

pub mod client;
pub mod errors;
pub mod payload;
pub mod response;
pub mod webhook;

use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use tracing::{debug, info, warn};
use zapflow_core::error::codes;
use zapflow_core::events::WebhookEvent;
use zapflow_core::provider::{
    ConnectionTest, MediaSource, SendResult, TemplateMessage, UploadResult, WebhookAuth,
};
use zapflow_core::types::ChannelProviderConfig;
use zapflow_core::{ErrorCategory, PluginAdapter, ProviderAdapter, ProviderError, ZapflowError};

use crate::client::{DEFAULT_TIMEOUT, authorize, endpoint, execute, missing_credentials};
use crate::payload::OutboundMessage;
use crate::response::extract_message_id;

/// Registry name of this adapter, matched against `channel.provider`.
pub const PROVIDER_NAME: &str = "whatsapp_cloud";

/// Fields requested by the connection test.
const PHONE_FIELDS: &str = "display_phone_number,verified_name,quality_rating";

/// WhatsApp Cloud API provider implementing [`ProviderAdapter`].
#[derive(Debug, Clone)]
pub struct WhatsAppCloudProvider {
    client: reqwest::Client,
    default_timeout: Duration,
}

impl WhatsAppCloudProvider {
    /// Creates the adapter with a pooled HTTP client.
    pub fn new() -> Result<Self, ZapflowError> {
        let client = reqwest::Client::builder()
            .user_agent(concat!("zapflow/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| ZapflowError::Provider {
                message: format!("failed to build HTTP client: {e}"),
                source: Some(Box::new(e)),
            })?;
        Ok(Self {
            client,
            default_timeout: DEFAULT_TIMEOUT,
        })
    }

    /// Overrides the timeout used when a channel does not set one.
    pub fn with_default_timeout(mut self, timeout: Duration) -> Self {
        self.default_timeout = timeout;
        self
    }

    async fn post_message(
        &self,
        config: &ChannelProviderConfig,
        message: &OutboundMessage<'_>,
    ) -> SendResult {
        if config.token().is_none() {
            return SendResult::failed(missing_credentials("auth token"), Value::Null);
        }
        let Some(sender) = config.sender_id() else {
            return SendResult::failed(missing_credentials("phone number id"), Value::Null);
        };

        let url = endpoint(config, &format!("{sender}/messages"));
        let request = authorize(self.client.post(url).json(message), config, self.default_timeout);
        match execute(request).await {
            Ok(response) => {
                let result = response.into_send_result();
                match (&result.provider_message_id, &result.error) {
                    (Some(id), _) => debug!(provider_message_id = %id, "message accepted"),
                    (None, Some(err)) => warn!(code = %err.code, category = %err.category, "send rejected"),
                    (None, None) => {}
                }
                result
            }
            Err(err) => {
                warn!(code = %err.code, error = %err.message, "send transport failure");
                SendResult::failed(err, Value::Null)
            }
        }
    }

    async fn fetch_media(
        &self,
        config: &ChannelProviderConfig,
        url: &str,
    ) -> Result<Vec<u8>, ProviderError> {
        let timeout = client::timeout_for(config, self.default_timeout);
        let response = self
            .client
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(client::transport_error)?;
        let status = response.status();
        if !status.is_success() {
            return Err(ProviderError::new(
                ErrorCategory::InvalidRequest,
                codes::MEDIA_FETCH_FAILED,
                format!("media URL returned HTTP {status}"),
            )
            .with_status(status.as_u16()));
        }
        let bytes = response.bytes().await.map_err(client::transport_error)?;
        Ok(bytes.to_vec())
    }
}

fn upload_failed(error: ProviderError) -> UploadResult {
    UploadResult {
        success: false,
        media_id: None,
        error: Some(error),
    }
}

impl PluginAdapter for WhatsAppCloudProvider {
    fn name(&self) -> &str {
        PROVIDER_NAME
    }
}

#[async_trait]
impl ProviderAdapter for WhatsAppCloudProvider {
    async fn send_text(
        &self,
        config: &ChannelProviderConfig,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> SendResult {
        self.post_message(config, &OutboundMessage::text(to, text, reply_to))
            .await
    }

    async fn send_template(
        &self,
        config: &ChannelProviderConfig,
        to: &str,
        message: &TemplateMessage,
    ) -> SendResult {
        debug!(template = %message.name, language = %message.language, "sending template");
        self.post_message(config, &OutboundMessage::template(to, message))
            .await
    }

    async fn upload_media(
        &self,
        config: &ChannelProviderConfig,
        source: MediaSource,
        mime_type: &str,
        filename: Option<&str>,
    ) -> UploadResult {
        if config.token().is_none() {
            return upload_failed(missing_credentials("auth token"));
        }
        let Some(sender) = config.sender_id() else {
            return upload_failed(missing_credentials("phone number id"));
        };

        let bytes = match source {
            MediaSource::Bytes(bytes) => bytes,
            MediaSource::Url(url) => match self.fetch_media(config, &url).await {
                Ok(bytes) => bytes,
                Err(err) => return upload_failed(err),
            },
        };

        let part = reqwest::multipart::Part::bytes(bytes)
            .file_name(filename.unwrap_or("upload").to_string());
        let part = match part.mime_str(mime_type) {
            Ok(part) => part,
            Err(e) => {
                return upload_failed(ProviderError::new(
                    ErrorCategory::InvalidRequest,
                    "INVALID_MIME_TYPE",
                    format!("invalid mime type {mime_type}: {e}"),
                ));
            }
        };
        let form = reqwest::multipart::Form::new()
            .text("messaging_product", "whatsapp")
            .text("type", mime_type.to_string())
            .part("file", part);

        let url = endpoint(config, &format!("{sender}/media"));
        let request = authorize(self.client.post(url).multipart(form), config, self.default_timeout);
        let response = match execute(request).await {
            Ok(response) => response,
            Err(err) => return upload_failed(err),
        };
        if let Some(err) = response.failure() {
            return upload_failed(err);
        }
        match extract_message_id(&response.body) {
            Some(media_id) => {
                info!(media_id = %media_id, "media uploaded");
                UploadResult {
                    success: true,
                    media_id: Some(media_id),
                    error: None,
                }
            }
            None => upload_failed(ProviderError::no_message_id()),
        }
    }

    fn validate_webhook(
        &self,
        config: &ChannelProviderConfig,
        headers: &http::HeaderMap,
        raw_body: &[u8],
    ) -> Result<WebhookAuth, ProviderError> {
        webhook::verify_signature(config, headers, raw_body)
    }

    fn parse_webhook(&self, config: &ChannelProviderConfig, body: &Value) -> Vec<WebhookEvent> {
        webhook::parse_payload(config, body)
    }

    async fn test_connection(&self, config: &ChannelProviderConfig) -> ConnectionTest {
        let failed = |error: String| ConnectionTest {
            success: false,
            error: Some(error),
            details: None,
        };
        if config.token().is_none() {
            return failed("channel has no auth token configured".to_string());
        }
        let Some(sender) = config.sender_id() else {
            return failed("channel has no phone number id configured".to_string());
        };

        let url = endpoint(config, &format!("{sender}?fields={PHONE_FIELDS}"));
        let request = authorize(self.client.get(url), config, self.default_timeout);
        match execute(request).await {
            Ok(response) => match response.failure() {
                None => ConnectionTest {
                    success: true,
                    error: None,
                    details: Some(response.body),
                },
                Some(err) => ConnectionTest {
                    success: false,
                    error: Some(err.to_string()),
                    details: Some(response.body),
                },
            },
            Err(err) => failed(err.to_string()),
        }
    }
}
