// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Free-form replies inside the messaging window.

use chrono::{DateTime, Utc};
use tracing::{info, warn};
use zapflow_core::ProviderAdapter;
use zapflow_core::time::{now_ts, parse_ts};
use zapflow_core::types::{DeliveryStatus, InboxMessage, MessageDirection};

use crate::Inbox;
use crate::error::InboxError;

/// True when the last inbound message is no older than `window`.
pub fn within_window(
    last_inbound: Option<&str>,
    now: DateTime<Utc>,
    window: chrono::Duration,
) -> bool {
    last_inbound
        .and_then(parse_ts)
        .is_some_and(|at| now.signed_duration_since(at) <= window)
}

impl Inbox {
    /// Sends a text reply in a conversation and records it.
    ///
    /// Refused with [`InboxError::WindowClosed`] unless the contact wrote
    /// within the messaging window. A channel-blocking provider failure
    /// also blocks the channel.
    pub async fn send_reply(
        &self,
        provider: &dyn ProviderAdapter,
        conversation_id: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> Result<InboxMessage, InboxError> {
        let conversation = self
            .storage()
            .get_conversation(conversation_id)
            .await?
            .ok_or_else(|| InboxError::NotFound {
                entity: "conversation",
                id: conversation_id.to_string(),
            })?;
        if conversation.deleted_at.is_some() {
            return Err(InboxError::Deleted(conversation.id));
        }
        if !within_window(conversation.last_inbound_at.as_deref(), Utc::now(), self.window) {
            return Err(InboxError::WindowClosed {
                last_inbound: conversation.last_inbound_at,
            });
        }

        let channel = self
            .storage()
            .get_channel(&conversation.channel_id)
            .await?
            .ok_or_else(|| InboxError::NotFound {
                entity: "channel",
                id: conversation.channel_id.clone(),
            })?;
        let contact = self
            .storage()
            .get_contact(&conversation.contact_id)
            .await?
            .ok_or_else(|| InboxError::NotFound {
                entity: "contact",
                id: conversation.contact_id.clone(),
            })?;

        let result = provider
            .send_text(&channel.config, &contact.phone, text, reply_to)
            .await;
        let Some(provider_message_id) = result.confirmed_id() else {
            let err = result.failure();
            warn!(conversation_id, code = %err.code, "reply rejected by provider");
            if err.blocks_channel {
                self.storage()
                    .block_channel(&channel.id, &err.code, &err.message)
                    .await?;
            }
            return Err(InboxError::Send(err));
        };

        let now = now_ts();
        let message = InboxMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            tenant_id: conversation.tenant_id.clone(),
            channel_id: channel.id.clone(),
            direction: MessageDirection::Outbound,
            kind: "text".to_string(),
            content: text.to_string(),
            payload: None,
            provider_message_id: Some(provider_message_id.to_string()),
            status: DeliveryStatus::Sent,
            error_code: None,
            error_detail: None,
            campaign_recipient_id: None,
            reply_to: reply_to.map(str::to_string),
            created_at: now.clone(),
            updated_at: now.clone(),
        };
        self.storage().insert_message(&message).await?;
        self.storage()
            .touch_conversation(&conversation.id, text, &now, false)
            .await?;
        info!(conversation_id, provider_message_id, "reply sent");
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn window_boundaries() {
        let now = Utc.with_ymd_and_hms(2026, 1, 2, 12, 0, 0).unwrap();
        let day = chrono::Duration::hours(24);
        assert!(within_window(Some("2026-01-01T12:00:00.000Z"), now, day));
        assert!(within_window(Some("2026-01-02T11:59:00.000Z"), now, day));
        assert!(!within_window(Some("2026-01-01T11:59:59.000Z"), now, day));
        assert!(!within_window(None, now, day));
        assert!(!within_window(Some("garbage"), now, day));
    }
}
