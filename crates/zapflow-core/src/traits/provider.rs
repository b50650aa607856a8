// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Provider adapter trait for Business Solution Provider integrations.

use async_trait::async_trait;

use crate::error::ProviderError;
use crate::events::WebhookEvent;
use crate::provider::{
    ConnectionTest, MediaSource, SendResult, TemplateMessage, UploadResult, WebhookAuth,
};
use crate::traits::adapter::PluginAdapter;
use crate::types::ChannelProviderConfig;

/// Adapter translating the generic messaging contract into one BSP's HTTP protocol.
///
/// Every call receives the channel's [`ChannelProviderConfig`] explicitly.
/// Send and upload failures are reported inside the returned result, never as
/// a panic or `Err`, so the batch loop can classify them.
#[async_trait]
pub trait ProviderAdapter: PluginAdapter {
    /// Sends a free-form text message. Callers enforce the messaging window.
    async fn send_text(
        &self,
        config: &ChannelProviderConfig,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> SendResult;

    /// Sends a template message with already-resolved parameters.
    async fn send_template(
        &self,
        config: &ChannelProviderConfig,
        to: &str,
        message: &TemplateMessage,
    ) -> SendResult;

    /// Uploads media and returns the provider's media id.
    async fn upload_media(
        &self,
        config: &ChannelProviderConfig,
        source: MediaSource,
        mime_type: &str,
        filename: Option<&str>,
    ) -> UploadResult;

    /// Verifies webhook authenticity over the raw request body.
    ///
    /// Fails closed when a secret is configured and the signature is missing
    /// or wrong. Without a secret the request is accepted as
    /// [`WebhookAuth::Unsigned`].
    fn validate_webhook(
        &self,
        config: &ChannelProviderConfig,
        headers: &http::HeaderMap,
        raw_body: &[u8],
    ) -> Result<WebhookAuth, ProviderError>;

    /// Maps a provider payload into normalized events.
    ///
    /// Unknown or malformed shapes produce no events.
    fn parse_webhook(
        &self,
        config: &ChannelProviderConfig,
        body: &serde_json::Value,
    ) -> Vec<WebhookEvent>;

    /// Checks that the configured credentials reach the provider.
    async fn test_connection(&self, config: &ChannelProviderConfig) -> ConnectionTest;
}
