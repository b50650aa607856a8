// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation resolution for a (tenant, channel, contact) triple.
//!
//! The same rule serves inbound webhooks and outbound sends: use the live
//! conversation, else reactivate the latest soft-deleted one unless it is a
//! `user_deleted` tombstone, else create a fresh one. A tombstone is never
//! reopened and the new thread carries no link to it.

use tracing::{debug, info};
use zapflow_core::time::now_ts;
use zapflow_core::types::{Conversation, ConversationStatus};
use zapflow_core::{StorageAdapter, ZapflowError};

/// How the conversation returned by [`resolve_conversation`] was obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConversationOrigin {
    Existing,
    Reactivated,
    /// `tombstoned` is set when a `user_deleted` thread was skipped.
    Created { tombstoned: bool },
}

/// Finds, reactivates, or creates the conversation for a triple.
pub async fn resolve_conversation(
    storage: &dyn StorageAdapter,
    tenant_id: &str,
    channel_id: &str,
    contact_id: &str,
) -> Result<(Conversation, ConversationOrigin), ZapflowError> {
    if let Some(active) = storage
        .find_active_conversation(tenant_id, channel_id, contact_id)
        .await?
    {
        return Ok((active, ConversationOrigin::Existing));
    }

    let deleted = storage
        .find_latest_deleted_conversation(tenant_id, channel_id, contact_id)
        .await?;
    let tombstoned = match deleted {
        Some(previous) if !previous.is_tombstone() => {
            match storage.reactivate_conversation(&previous.id).await {
                Ok(conversation) => {
                    info!(conversation_id = %conversation.id, "conversation reactivated");
                    return Ok((conversation, ConversationOrigin::Reactivated));
                }
                Err(err) => return lost_race(storage, tenant_id, channel_id, contact_id, err).await,
            }
        }
        Some(previous) => {
            debug!(conversation_id = %previous.id, "skipping user-deleted conversation");
            true
        }
        None => false,
    };

    let now = now_ts();
    let conversation = Conversation {
        id: uuid::Uuid::new_v4().to_string(),
        tenant_id: tenant_id.to_string(),
        channel_id: channel_id.to_string(),
        contact_id: contact_id.to_string(),
        status: ConversationStatus::Open,
        deleted_at: None,
        deleted_reason: None,
        last_message_preview: None,
        last_message_at: None,
        last_inbound_at: None,
        created_at: now.clone(),
        updated_at: now,
    };
    match storage.insert_conversation(&conversation).await {
        Ok(()) => {
            info!(conversation_id = %conversation.id, tombstoned, "conversation created");
            Ok((conversation, ConversationOrigin::Created { tombstoned }))
        }
        Err(err) => lost_race(storage, tenant_id, channel_id, contact_id, err).await,
    }
}

/// A concurrent writer may have opened the live conversation first.
async fn lost_race(
    storage: &dyn StorageAdapter,
    tenant_id: &str,
    channel_id: &str,
    contact_id: &str,
    err: ZapflowError,
) -> Result<(Conversation, ConversationOrigin), ZapflowError> {
    match storage
        .find_active_conversation(tenant_id, channel_id, contact_id)
        .await?
    {
        Some(active) => Ok((active, ConversationOrigin::Existing)),
        None => Err(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_core::types::DeletedReason;
    use zapflow_storage::queries::conversations::soft_delete_conversation;
    use zapflow_test_utils::TestHarness;
    use zapflow_test_utils::harness::{CHANNEL_ID, TENANT_ID};

    #[tokio::test]
    async fn creates_then_reuses() {
        let h = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let storage = h.storage();
        let (first, origin) = resolve_conversation(storage.as_ref(), TENANT_ID, CHANNEL_ID, "contact-0")
            .await
            .unwrap();
        assert_eq!(origin, ConversationOrigin::Created { tombstoned: false });
        let (again, origin) = resolve_conversation(storage.as_ref(), TENANT_ID, CHANNEL_ID, "contact-0")
            .await
            .unwrap();
        assert_eq!(origin, ConversationOrigin::Existing);
        assert_eq!(again.id, first.id);
    }

    #[tokio::test]
    async fn system_deleted_is_reactivated() {
        let h = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let storage = h.storage();
        let (conv, _) = resolve_conversation(storage.as_ref(), TENANT_ID, CHANNEL_ID, "contact-0")
            .await
            .unwrap();
        soft_delete_conversation(h.db(), &conv.id, DeletedReason::SystemDeleted, &now_ts())
            .await
            .unwrap();

        let (back, origin) = resolve_conversation(storage.as_ref(), TENANT_ID, CHANNEL_ID, "contact-0")
            .await
            .unwrap();
        assert_eq!(origin, ConversationOrigin::Reactivated);
        assert_eq!(back.id, conv.id);
        assert!(back.deleted_at.is_none());
        assert_eq!(back.status, ConversationStatus::Open);
    }

    #[tokio::test]
    async fn tombstone_is_never_reactivated() {
        let h = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let storage = h.storage();
        let (conv, _) = resolve_conversation(storage.as_ref(), TENANT_ID, CHANNEL_ID, "contact-0")
            .await
            .unwrap();
        soft_delete_conversation(h.db(), &conv.id, DeletedReason::UserDeleted, &now_ts())
            .await
            .unwrap();

        let (fresh, origin) = resolve_conversation(storage.as_ref(), TENANT_ID, CHANNEL_ID, "contact-0")
            .await
            .unwrap();
        assert_eq!(origin, ConversationOrigin::Created { tombstoned: true });
        assert_ne!(fresh.id, conv.id);

        let old = storage.get_conversation(&conv.id).await.unwrap().unwrap();
        assert!(old.is_tombstone());
    }
}
