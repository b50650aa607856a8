// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Webhook ingestion for the Zapflow campaign engine.
//!
//! A request is authenticated by the channel's provider adapter, persisted
//! raw for audit, normalized into events, and then each event is applied on
//! its own: delivery receipts update recipients and inbox messages, inbound
//! messages land in the contact's conversation. One failing event never
//! stops the others.

pub mod error;
pub mod status;

use std::sync::Arc;

use serde::Serialize;
use tracing::{Instrument, debug, info, info_span, warn};
use zapflow_config::model::WebhookConfig;
use zapflow_core::events::WebhookEvent;
use zapflow_core::provider::WebhookAuth;
use zapflow_core::types::{Channel, WebhookEventLink};
use zapflow_core::{ProviderAdapter, ProviderRegistry, StorageAdapter};
use zapflow_inbox::Inbox;

pub use error::IngestError;
pub use status::{StatusOutcome, apply_status};

/// What one webhook request did.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestSummary {
    pub event_id: String,
    pub events: usize,
    pub statuses_applied: usize,
    pub messages_received: usize,
    pub duplicates: usize,
    /// One entry per event that failed.
    pub errors: Vec<String>,
}

#[derive(Clone)]
pub struct WebhookIngestor {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    registry: ProviderRegistry,
    inbox: Inbox,
    require_secret: bool,
}

impl WebhookIngestor {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        registry: ProviderRegistry,
        inbox: Inbox,
        config: &WebhookConfig,
    ) -> Self {
        Self {
            storage,
            registry,
            inbox,
            require_secret: config.require_secret,
        }
    }

    async fn channel_and_provider(
        &self,
        channel_id: &str,
    ) -> Result<(Channel, Arc<dyn ProviderAdapter>), IngestError> {
        let channel = self
            .storage
            .get_channel(channel_id)
            .await?
            .ok_or_else(|| IngestError::ChannelNotFound(channel_id.to_string()))?;
        let provider = self
            .registry
            .get(&channel.provider)
            .ok_or_else(|| IngestError::UnknownProvider(channel.provider.clone()))?;
        Ok((channel, provider))
    }

    /// Answers the provider's subscription handshake with the challenge when
    /// the mode is `subscribe` and the token matches the channel's.
    pub async fn verify_subscription(
        &self,
        channel_id: &str,
        mode: Option<&str>,
        verify_token: Option<&str>,
        challenge: Option<&str>,
    ) -> Result<String, IngestError> {
        let (channel, _) = self.channel_and_provider(channel_id).await?;
        let expected = channel
            .config
            .verify_token
            .as_deref()
            .map(str::trim)
            .filter(|t| !t.is_empty());
        match (mode, expected, verify_token.map(str::trim)) {
            (Some("subscribe"), Some(expected), Some(observed)) if expected == observed => {
                info!(channel_id, "webhook subscription verified");
                Ok(challenge.unwrap_or_default().to_string())
            }
            _ => {
                warn!(channel_id, "webhook subscription verification failed");
                Err(IngestError::VerificationFailed)
            }
        }
    }

    /// Handles one webhook request for a channel.
    pub async fn ingest(
        &self,
        channel_id: &str,
        headers: &http::HeaderMap,
        raw_body: &[u8],
    ) -> Result<IngestSummary, IngestError> {
        let span = info_span!("webhook", channel_id, bytes = raw_body.len());
        self.ingest_inner(channel_id, headers, raw_body)
            .instrument(span)
            .await
    }

    async fn ingest_inner(
        &self,
        channel_id: &str,
        headers: &http::HeaderMap,
        raw_body: &[u8],
    ) -> Result<IngestSummary, IngestError> {
        let (channel, provider) = self.channel_and_provider(channel_id).await?;

        if channel.config.secret().is_none() && self.require_secret {
            warn!("rejecting webhook for channel without a secret");
            return Err(IngestError::SecretRequired);
        }
        match provider.validate_webhook(&channel.config, headers, raw_body) {
            Ok(WebhookAuth::Verified) => debug!("webhook signature verified"),
            Ok(WebhookAuth::Unsigned) => warn!("accepting unsigned webhook, channel has no secret"),
            Err(err) => {
                warn!(code = %err.code, "webhook authentication failed");
                return Err(IngestError::Unauthorized(err));
            }
        }

        let payload = String::from_utf8_lossy(raw_body);
        let event_id = self
            .storage
            .record_webhook_event(&channel.id, &channel.provider, &payload)
            .await?;

        let body: serde_json::Value = match serde_json::from_slice(raw_body) {
            Ok(body) => body,
            Err(err) => {
                let link = WebhookEventLink {
                    error: Some(format!("malformed JSON: {err}")),
                    ..Default::default()
                };
                self.storage.mark_webhook_event_processed(&event_id, &link).await?;
                warn!(event_id = %event_id, error = %err, "malformed webhook body");
                return Err(IngestError::Malformed(err.to_string()));
            }
        };

        let events = provider.parse_webhook(&channel.config, &body);
        let mut summary = IngestSummary {
            event_id: event_id.clone(),
            events: events.len(),
            ..Default::default()
        };
        let mut link = WebhookEventLink {
            event_count: events.len() as i64,
            ..Default::default()
        };

        for event in &events {
            match event {
                WebhookEvent::StatusUpdate(update) => {
                    match apply_status(self.storage.as_ref(), &channel.id, update).await {
                        Ok(outcome) => {
                            if outcome.applied {
                                summary.statuses_applied += 1;
                            }
                            if link.linked_recipient_id.is_none() {
                                link.linked_recipient_id = outcome.recipient_id;
                            }
                            if link.linked_message_id.is_none() {
                                link.linked_message_id = outcome.message_id;
                            }
                        }
                        Err(err) => {
                            warn!(
                                provider_message_id = %update.provider_message_id,
                                error = %err,
                                "status update failed"
                            );
                            summary.errors.push(format!("{}: {err}", update.provider_message_id));
                        }
                    }
                }
                WebhookEvent::InboundMessage(message) => {
                    match self.inbox.receive(&channel, message).await {
                        Ok(outcome) => {
                            if outcome.is_duplicate() {
                                summary.duplicates += 1;
                            } else {
                                summary.messages_received += 1;
                            }
                            if link.linked_message_id.is_none() {
                                link.linked_message_id = Some(outcome.message_id);
                            }
                        }
                        Err(err) => {
                            warn!(
                                provider_message_id = %message.provider_message_id,
                                code = err.code(),
                                error = %err,
                                "inbound message failed"
                            );
                            summary.errors.push(format!("{}: {err}", message.provider_message_id));
                        }
                    }
                }
            }
        }

        if !summary.errors.is_empty() {
            link.error = Some(summary.errors.join("; "));
        }
        if let Err(err) = self.storage.mark_webhook_event_processed(&event_id, &link).await {
            warn!(event_id = %event_id, error = %err, "failed to mark webhook event processed");
        }
        info!(
            event_id = %event_id,
            events = summary.events,
            statuses = summary.statuses_applied,
            messages = summary.messages_received,
            failed = summary.errors.len(),
            "webhook processed"
        );
        Ok(summary)
    }
}

impl std::fmt::Debug for WebhookIngestor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WebhookIngestor")
            .field("registry", &self.registry)
            .field("require_secret", &self.require_secret)
            .finish()
    }
}
