// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! SQLite implementation of the StorageAdapter trait.

use async_trait::async_trait;
use tokio::sync::OnceCell;
use tracing::debug;

use zapflow_config::model::StorageConfig;
use zapflow_core::types::{
    CampaignContext, CampaignCounters, CampaignRecipient, CampaignStatus, Channel, ChannelStatus,
    Contact, Conversation, DueRecipient, FailureUpdate, InboxMessage, SentUpdate, StatusChange,
    WebhookEventLink,
};
use zapflow_core::{PluginAdapter, StorageAdapter, ZapflowError};

use crate::database::{Database, checkpoint, map_tr_err};
use crate::queries;

/// SQLite-backed storage adapter.
///
/// Wraps a [`Database`] handle and delegates all query operations to the
/// typed query modules. The database is lazily initialized on the first
/// call to [`StorageAdapter::initialize`].
pub struct SqliteStorage {
    config: StorageConfig,
    db: OnceCell<Database>,
}

impl SqliteStorage {
    /// Create a new SqliteStorage with the given configuration.
    ///
    /// The database connection is not opened until [`StorageAdapter::initialize`] is called.
    pub fn new(config: StorageConfig) -> Self {
        Self {
            config,
            db: OnceCell::new(),
        }
    }

    /// Returns a reference to the underlying Database, or an error if not initialized.
    pub fn db(&self) -> Result<&Database, ZapflowError> {
        self.db
            .get()
            .ok_or_else(|| ZapflowError::storage("storage not initialized -- call initialize() first"))
    }
}

impl PluginAdapter for SqliteStorage {
    fn name(&self) -> &str {
        "sqlite"
    }
}

#[async_trait]
impl StorageAdapter for SqliteStorage {
    async fn health_check(&self) -> Result<(), ZapflowError> {
        let db = self.db()?;
        db.connection()
            .call(|conn| -> Result<(), rusqlite::Error> {
                conn.execute_batch("SELECT 1;")?;
                Ok(())
            })
            .await
            .map_err(map_tr_err)
    }

    async fn initialize(&self) -> Result<(), ZapflowError> {
        let path = self.config.database_path.clone();
        let db = Database::open_with(&path, self.config.wal_mode).await?;
        self.db
            .set(db)
            .map_err(|_| ZapflowError::storage("storage already initialized"))?;
        debug!(path = %self.config.database_path, "SQLite storage initialized");
        Ok(())
    }

    async fn close(&self) -> Result<(), ZapflowError> {
        let db = self.db()?;
        checkpoint(db.connection()).await?;
        debug!("WAL checkpoint complete");
        Ok(())
    }

    // --- Channels ---

    async fn get_channel(&self, id: &str) -> Result<Option<Channel>, ZapflowError> {
        queries::channels::get_channel(self.db()?, id).await
    }

    async fn update_channel_status(
        &self,
        id: &str,
        status: ChannelStatus,
    ) -> Result<(), ZapflowError> {
        queries::channels::update_channel_status(self.db()?, id, status).await
    }

    async fn block_channel(&self, id: &str, code: &str, reason: &str) -> Result<(), ZapflowError> {
        queries::channels::block_channel(self.db()?, id, code, reason).await
    }

    // --- Campaigns ---

    async fn load_campaign_context(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignContext>, ZapflowError> {
        queries::campaigns::load_campaign_context(self.db()?, campaign_id).await
    }

    async fn get_campaign_status(
        &self,
        campaign_id: &str,
    ) -> Result<Option<CampaignStatus>, ZapflowError> {
        queries::campaigns::get_campaign_status(self.db()?, campaign_id).await
    }

    async fn set_campaign_status(
        &self,
        campaign_id: &str,
        status: CampaignStatus,
        paused_reason: Option<&str>,
    ) -> Result<(), ZapflowError> {
        queries::campaigns::set_campaign_status(self.db()?, campaign_id, status, paused_reason).await
    }

    async fn refresh_campaign_counters(
        &self,
        campaign_id: &str,
    ) -> Result<CampaignCounters, ZapflowError> {
        queries::campaigns::refresh_campaign_counters(self.db()?, campaign_id).await
    }

    async fn list_campaigns_by_status(
        &self,
        statuses: &[CampaignStatus],
    ) -> Result<Vec<String>, ZapflowError> {
        queries::campaigns::list_campaigns_by_status(self.db()?, statuses).await
    }

    // --- Recipients ---

    async fn select_due_recipients(
        &self,
        campaign_id: &str,
        now: &str,
        max_retries: u32,
        limit: usize,
    ) -> Result<Vec<DueRecipient>, ZapflowError> {
        queries::recipients::select_due_recipients(self.db()?, campaign_id, now, max_retries, limit)
            .await
    }

    async fn mark_recipient_sent(
        &self,
        recipient_id: &str,
        update: &SentUpdate,
    ) -> Result<(), ZapflowError> {
        queries::recipients::mark_recipient_sent(self.db()?, recipient_id, update).await
    }

    async fn mark_recipient_failed(
        &self,
        recipient_id: &str,
        update: &FailureUpdate,
    ) -> Result<(), ZapflowError> {
        queries::recipients::mark_recipient_failed(self.db()?, recipient_id, update).await
    }

    async fn find_recipient_by_provider_message_id(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<Option<CampaignRecipient>, ZapflowError> {
        queries::recipients::find_recipient_by_provider_message_id(
            self.db()?,
            channel_id,
            provider_message_id,
        )
        .await
    }

    async fn apply_recipient_status(
        &self,
        recipient_id: &str,
        change: &StatusChange,
    ) -> Result<bool, ZapflowError> {
        queries::recipients::apply_recipient_status(self.db()?, recipient_id, change).await
    }

    // --- Contacts ---

    async fn get_contact(&self, id: &str) -> Result<Option<Contact>, ZapflowError> {
        queries::contacts::get_contact(self.db()?, id).await
    }

    async fn upsert_contact_by_phone(
        &self,
        tenant_id: &str,
        phone: &str,
        name: Option<&str>,
    ) -> Result<Contact, ZapflowError> {
        queries::contacts::upsert_contact_by_phone(self.db()?, tenant_id, phone, name).await
    }

    // --- Conversations ---

    async fn get_conversation(&self, id: &str) -> Result<Option<Conversation>, ZapflowError> {
        queries::conversations::get_conversation(self.db()?, id).await
    }

    async fn find_active_conversation(
        &self,
        tenant_id: &str,
        channel_id: &str,
        contact_id: &str,
    ) -> Result<Option<Conversation>, ZapflowError> {
        queries::conversations::find_active_conversation(self.db()?, tenant_id, channel_id, contact_id)
            .await
    }

    async fn find_latest_deleted_conversation(
        &self,
        tenant_id: &str,
        channel_id: &str,
        contact_id: &str,
    ) -> Result<Option<Conversation>, ZapflowError> {
        queries::conversations::find_latest_deleted_conversation(
            self.db()?,
            tenant_id,
            channel_id,
            contact_id,
        )
        .await
    }

    async fn reactivate_conversation(&self, id: &str) -> Result<Conversation, ZapflowError> {
        queries::conversations::reactivate_conversation(self.db()?, id).await
    }

    async fn insert_conversation(&self, conversation: &Conversation) -> Result<(), ZapflowError> {
        queries::conversations::insert_conversation(self.db()?, conversation).await
    }

    async fn touch_conversation(
        &self,
        id: &str,
        preview: &str,
        at: &str,
        inbound: bool,
    ) -> Result<(), ZapflowError> {
        queries::conversations::touch_conversation(self.db()?, id, preview, at, inbound).await
    }

    // --- Messages ---

    async fn insert_message(&self, message: &InboxMessage) -> Result<(), ZapflowError> {
        queries::messages::insert_message(self.db()?, message).await
    }

    async fn find_message_by_provider_id(
        &self,
        channel_id: &str,
        provider_message_id: &str,
    ) -> Result<Option<InboxMessage>, ZapflowError> {
        queries::messages::find_message_by_provider_id(self.db()?, channel_id, provider_message_id)
            .await
    }

    async fn apply_message_status(
        &self,
        message_id: &str,
        change: &StatusChange,
    ) -> Result<bool, ZapflowError> {
        queries::messages::apply_message_status(self.db()?, message_id, change).await
    }

    // --- Webhook audit ---

    async fn record_webhook_event(
        &self,
        channel_id: &str,
        provider: &str,
        payload: &str,
    ) -> Result<String, ZapflowError> {
        queries::webhook_events::record_webhook_event(self.db()?, channel_id, provider, payload)
            .await
    }

    async fn mark_webhook_event_processed(
        &self,
        id: &str,
        link: &WebhookEventLink,
    ) -> Result<(), ZapflowError> {
        queries::webhook_events::mark_webhook_event_processed(self.db()?, id, link).await
    }
}
