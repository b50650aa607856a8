// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Storage adapter trait for persistence backends (SQLite, etc.).

use async_trait::async_trait;

use crate::error::ZapflowError;
use crate::traits::adapter::PluginAdapter;
use crate::types::{
    CampaignContext, CampaignCounters, CampaignRecipient, CampaignStatus, Channel, ChannelStatus,
    Contact, Conversation, DueRecipient, FailureUpdate, InboxMessage, SentUpdate, StatusChange,
    WebhookEventLink,
};

/// Adapter for storage and persistence backends.
///
/// Exposes the logical read/write operations the campaign pipeline, webhook
/// ingestion, and conversation lifecycle need. Status updates coming from
/// webhooks are guarded by the forward-only delivery ordering so that
/// duplicated or reordered deliveries never regress a row.
#[async_trait]
pub trait StorageAdapter: PluginAdapter {
    /// Initializes the storage backend (migrations, connection, etc.).
    async fn initialize(&self) -> Result<(), ZapflowError>;

    /// Closes the storage backend, flushing pending writes and releasing connections.
    async fn close(&self) -> Result<(), ZapflowError>;

    /// Round-trips a trivial query through the backend.
    async fn health_check(&self) -> Result<(), ZapflowError>;

    // --- Channels ---

    async fn get_channel(&self, id: &str) -> Result<Option<Channel>, ZapflowError>;

    async fn update_channel_status(
        &self,
        id: &str,
        status: ChannelStatus,
    ) -> Result<(), ZapflowError>;

    /// Sets `blocked_by_provider` with the provider code and reason.
    async fn block_channel(&self, id: &str, code: &str, reason: &str)
        -> Result<(), ZapflowError>;

    // --- Campaigns ---

    /// Loads a campaign joined with its template and channel.
    async fn load_campaign_context(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignContext>, ZapflowError>;

    async fn get_campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignStatus>, ZapflowError>;

    /// Updates the campaign status.
    ///
    /// `running` stamps `started_at` once, `done` stamps `completed_at`.
    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
        paused_reason: Option<&str>,
    ) -> Result<(), ZapflowError>;

    /// Recomputes counters from recipient rows and stores them on the campaign.
    async fn refresh_campaign_counters(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignCounters, ZapflowError>;

    async fn list_campaigns_by_status(
        &self,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<String>, ZapflowError>;

    // --- Recipients ---

    /// Queued rows plus failed rows whose retry is due, oldest first.
    async fn select_due_recipients(
        &self,
        campaign_id: &str,
        now: &str,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<DueRecipient>, ZapflowError>;

    async fn mark_recipient_sent(
        &self,
        recipient_id: &str,
        update: &SentUpdate,
    ) -> Result<(), ZapflowError>;

    async fn mark_recipient_failed(
        &self,
        recipient_id: &str,
        update: &FailureUpdate,
    ) -> Result<(), ZapflowError>;

    /// Finds the recipient of a campaign sent through `channel_id` that
    /// produced `provider_message_id`.
    async fn find_recipient_by_provider_message_id(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<Option<CampaignRecipient>, ZapflowError>;

    /// Applies a webhook status change; returns whether the row changed.
    async fn apply_recipient_status(
        &self,
        recipient_id: &str,
        change: &StatusChange,
    ) -> Result<bool, ZapflowError>;

    // --- Contacts ---

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, ZapflowError>;

    /// Finds the contact by normalized phone or creates it. A missing name is filled in.
    async fn upsert_contact_by_phone(
        &self,
        tenant_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Contact, ZapflowError>;

    // --- Conversations ---

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ZapflowError>;

    /// The non-deleted conversation for the triple, if any.
    async fn find_active_conversation(
        &self,
        tenant_id: &str,
        channel_id: &str,
        contact_id: &str,
    ) -> Result<Option<Conversation>, ZapflowError>;

    /// The most recently soft-deleted conversation for the triple.
    async fn find_latest_deleted_conversation(
        &self,
        tenant_id: &str,
        channel_id: &str,
        contact_id: &str,
    ) -> Result<Option<Conversation>, ZapflowError>;

    /// Clears deletion markers and reopens the conversation.
    async fn reactivate_conversation(&self, id: &str) -> Result<Conversation, ZapflowError>;

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ZapflowError>;

    /// Updates the last-message preview. Inbound traffic also stamps
    /// `last_inbound_at` and reopens a resolved conversation.
    async fn touch_conversation(
        &self,
        id: &str,
        preview: &str,
        at: &str,
        inbound: bool,
    ) -> Result<(), ZapflowError>;

    // --- Messages ---

    async fn insert_message(&self, message: &InboxMessage) -> Result<(), ZapflowError>;

    async fn find_message_by_provider_id(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<Option<InboxMessage>, ZapflowError>;

    /// Applies a webhook status change; returns whether the row changed.
    async fn apply_message_status(
        &self,
        message_id: &str,
        change: &StatusChange,
    ) -> Result<bool, ZapflowError>;

    // --- Webhook audit ---

    /// Persists a raw payload with `processed = false`; returns its id.
    async fn record_webhook_event(
        &self,
        channel_id: &str,
        provider: &str,
        payload: &str,
    ) -> Result<String, ZapflowError>;

    async fn mark_webhook_event_processed(
        &self,
        id: &str,
        link: &WebhookEventLink,
    ) -> Result<(), ZapflowError>;
}
