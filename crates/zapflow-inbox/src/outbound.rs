// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Materialization of confirmed campaign sends in the inbox.

use tracing::{debug, warn};
use zapflow_core::ZapflowError;
use zapflow_core::time::now_ts;
use zapflow_core::types::{Channel, DeliveryStatus, InboxMessage, MessageDirection};

use crate::Inbox;
use crate::lifecycle::resolve_conversation;

/// A confirmed template send to copy into the contact's conversation.
#[derive(Debug, Clone)]
pub struct OutboundTemplate<'a> {
    pub channel: &'a Channel,
    pub contact_id: &'a str,
    pub recipient_id: &'a str,
    pub provider_message_id: &'a str,
    /// Rendered header and body text.
    pub content: String,
    /// Template name, language, and resolved parameters.
    pub payload: serde_json::Value,
    pub sent_at: &'a str,
}

impl Inbox {
    /// Records an outbound template message.
    ///
    /// Failures are logged and swallowed: the send itself already happened.
    pub async fn record_outbound_template(&self, out: OutboundTemplate<'_>) -> Option<InboxMessage> {
        match self.try_record_outbound(&out).await {
            Ok(message) => {
                debug!(
                    message_id = %message.id,
                    conversation_id = %message.conversation_id,
                    "outbound template recorded"
                );
                Some(message)
            }
            Err(err) => {
                warn!(
                    recipient_id = out.recipient_id,
                    provider_message_id = out.provider_message_id,
                    error = %err,
                    "failed to record outbound template in inbox"
                );
                None
            }
        }
    }

    async fn try_record_outbound(
        &self,
        out: &OutboundTemplate<'_>,
    ) -> Result<InboxMessage, ZapflowError> {
        let channel = out.channel;
        let (conversation, _) =
            resolve_conversation(self.storage(), &channel.tenant_id, &channel.id, out.contact_id)
                .await?;

        let message = InboxMessage {
            id: uuid::Uuid::new_v4().to_string(),
            conversation_id: conversation.id.clone(),
            tenant_id: channel.tenant_id.clone(),
            channel_id: channel.id.clone(),
            direction: MessageDirection::Outbound,
            kind: "template".to_string(),
            content: out.content.clone(),
            payload: Some(out.payload.clone()),
            provider_message_id: Some(out.provider_message_id.to_string()),
            status: DeliveryStatus::Sent,
            error_code: None,
            error_detail: None,
            campaign_recipient_id: Some(out.recipient_id.to_string()),
            reply_to: None,
            created_at: out.sent_at.to_string(),
            updated_at: now_ts(),
        };
        self.storage().insert_message(&message).await?;
        self.storage()
            .touch_conversation(&conversation.id, &message.content, out.sent_at, false)
            .await?;
        Ok(message)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_config::model::InboxConfig;
    use zapflow_core::types::DeletedReason;
    use zapflow_storage::queries::conversations::soft_delete_conversation;
    use zapflow_storage::queries::messages::list_messages;
    use zapflow_test_utils::TestHarness;

    fn out<'a>(channel: &'a Channel, pid: &'a str) -> OutboundTemplate<'a> {
        OutboundTemplate {
            channel,
            contact_id: "contact-0",
            recipient_id: "rcpt-0",
            provider_message_id: pid,
            content: "Olá Maria".to_string(),
            payload: serde_json::json!({"name": "welcome"}),
            sent_at: "2026-01-02T10:00:00.000Z",
        }
    }

    #[tokio::test]
    async fn outbound_lands_in_conversation() {
        let h = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let inbox = Inbox::new(h.storage(), &InboxConfig::default());
        let channel = h.channel().await;

        let message = inbox
            .record_outbound_template(out(&channel, "wamid.1"))
            .await
            .unwrap();
        assert_eq!(message.campaign_recipient_id.as_deref(), Some("rcpt-0"));

        let conv = h
            .storage()
            .get_conversation(&message.conversation_id)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(conv.last_message_preview.as_deref(), Some("Olá Maria"));
        assert!(conv.last_inbound_at.is_none());
    }

    #[tokio::test]
    async fn outbound_after_user_delete_opens_new_thread() {
        let h = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let inbox = Inbox::new(h.storage(), &InboxConfig::default());
        let channel = h.channel().await;

        let first = inbox
            .record_outbound_template(out(&channel, "wamid.1"))
            .await
            .unwrap();
        soft_delete_conversation(h.db(), &first.conversation_id, DeletedReason::UserDeleted, &now_ts())
            .await
            .unwrap();
        let second = inbox
            .record_outbound_template(out(&channel, "wamid.2"))
            .await
            .unwrap();

        assert_ne!(second.conversation_id, first.conversation_id);
        let old = list_messages(h.db(), &first.conversation_id).await.unwrap();
        assert_eq!(old.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_provider_id_is_swallowed() {
        let h = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let inbox = Inbox::new(h.storage(), &InboxConfig::default());
        let channel = h.channel().await;

        assert!(inbox.record_outbound_template(out(&channel, "wamid.1")).await.is_some());
        assert!(inbox.record_outbound_template(out(&channel, "wamid.1")).await.is_none());
    }
}
