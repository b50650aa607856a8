// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Inbound webhook messages: contact upsert, dedup, and conversation attribution.

use tracing::{debug, info};
use zapflow_core::events::InboundMessage;
use zapflow_core::phone::normalize_international;
use zapflow_core::time::now_ts;
use zapflow_core::types::{Channel, DeliveryStatus, InboxMessage, MessageDirection};

use crate::error::InboxError;
use crate::lifecycle::{ConversationOrigin, resolve_conversation};
use crate::Inbox;

/// Result of handling one inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct InboundOutcome {
    pub message_id: String,
    pub conversation_id: String,
    pub contact_id: String,
    /// `None` for a duplicate delivery of an already stored message.
    pub origin: Option<ConversationOrigin>,
}

impl InboundOutcome {
    pub fn is_duplicate(&self) -> bool {
        self.origin.is_none()
    }
}

impl Inbox {
    /// Stores an inbound message in its contact's conversation.
    ///
    /// Redelivered messages (same provider id on the same channel) are
    /// reported as duplicates without writing a second message.
    pub async fn receive(
        &self,
        channel: &Channel,
        inbound: &InboundMessage,
    ) -> Result<InboundOutcome, InboxError> {
        let phone = normalize_international(&inbound.from)
            .ok_or_else(|| InboxError::InvalidPhone(inbound.from.clone()))?;

        let contact = self
            .storage()
            .upsert_contact_by_phone(&channel.tenant_id, &phone, inbound.contact_name.as_deref())
            .await?;

        if let Some(existing) = self
            .storage()
            .find_message_by_provider_id(&channel.id, &inbound.provider_message_id)
            .await?
        {
            debug!(provider_message_id = %inbound.provider_message_id, "duplicate inbound message");
            return Ok(duplicate(existing, contact.id));
        }
        let (conversation, origin) =
            resolve_conversation(self.storage(), &channel.tenant_id, &channel.id, &contact.id)
                .await?;

        let preview = inbound.content.preview();
        let message = InboxMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            tenant_id: channel.tenant_id.clone(),
            channel_id: channel.id.clone(),
            direction: MessageDirection::Inbound,
            kind: inbound.content.kind().to_string(),
            content: preview.clone(),
            payload: serde_json::to_value(&inbound.content).ok(),
            provider_message_id: Some(inbound.provider_message_id.clone()),
            status: DeliveryStatus::Delivered,
            error_code: None,
            error_detail: None,
            campaign_recipient_id: None,
            reply_to: inbound.context_message_id.clone(),
            created_at: inbound.timestamp.clone(),
            updated_at: now_ts(),
        };

        if let Err(err) = self.storage().insert_message(&message).await {
            // A concurrent delivery of the same message won the unique index.
            return match self
                .storage()
                .find_message_by_provider_id(&channel.id, &inbound.provider_message_id)
                .await?
            {
                Some(existing) => Ok(duplicate(existing, contact.id)),
                None => Err(err.into()),
            };
        }
        self.storage()
            .touch_conversation(&conversation.id, &preview, &inbound.timestamp, true)
            .await?;

        info!(
            channel_id = %channel.id,
            conversation_id = %conversation.id,
            kind = %message.kind,
            "inbound message stored"
        );
        Ok(InboundOutcome {
            message_id: message.id,
            conversation_id: conversation.id,
            contact_id: contact.id,
            origin: Some(origin),
        })
    }
}

fn duplicate(existing: InboxMessage, contact_id: String) -> InboundOutcome {
    InboundOutcome {
        message_id: existing.id,
        conversation_id: existing.conversation_id,
        contact_id,
        origin: None,
    }
}
