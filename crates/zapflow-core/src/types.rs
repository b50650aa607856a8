// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Domain types shared by storage, adapters, and the campaign pipeline.
//!
//! Row types mirror the logical tables the engine reads and writes. Timestamps
//! are UTC strings produced by [`crate::time`], which keeps them comparable
//! as plain text both in Rust and in SQL.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};

use crate::template::{TemplateComponent, VariableMapping};

/// Connection state of a tenant's messaging channel.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ChannelStatus {
    Connected,
    Disconnected,
    Error,
    Pending,
}

/// Lifecycle state of a campaign.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum CampaignStatus {
    Draft,
    Queued,
    Running,
    Paused,
    Done,
    Failed,
    Cancelled,
}

/// Delivery state shared by campaign recipients and inbox messages.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeliveryStatus {
    Queued,
    Sent,
    Delivered,
    Read,
    Failed,
}

impl DeliveryStatus {
    /// Position in the forward-only delivery ordering.
    ///
    /// `Failed` has no rank: it overrides any prior state.
    pub fn rank(self) -> Option<u8> {
        match self {
            Self::Queued => Some(0),
            Self::Sent => Some(1),
            Self::Delivered => Some(2),
            Self::Read => Some(3),
            Self::Failed => None,
        }
    }

    /// Whether a webhook-reported `self` may replace `current`.
    ///
    /// Ranked states only move forward. `Failed` overrides any ranked state
    /// and is terminal, so nothing replaces it.
    pub fn supersedes(self, current: DeliveryStatus) -> bool {
        match (self.rank(), current.rank()) {
            (_, None) => false,
            (None, Some(_)) => true,
            (Some(new), Some(old)) => new > old,
        }
    }
}

/// Approval state of a message template.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum TemplateStatus {
    Pending,
    Approved,
    Rejected,
    Paused,
    Disabled,
}

/// Open/resolved state of an inbox conversation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ConversationStatus {
    Open,
    Resolved,
}

/// Why a conversation was soft-deleted.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum DeletedReason {
    /// Tombstone: the thread must never be reactivated.
    UserDeleted,
    SystemDeleted,
}

/// Direction of an inbox message relative to the tenant.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum MessageDirection {
    Inbound,
    Outbound,
}

/// Caller-selected pacing for a batch invocation.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum SpeedTier {
    Slow,
    #[default]
    Normal,
    Fast,
}

/// Provider-specific connection settings of a channel.
///
/// Passed explicitly into every provider call; adapters never read process
/// environment for endpoints or credentials.
#[derive(Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelProviderConfig {
    /// API base URL, e.g. `https://graph.facebook.com/v21.0`.
    pub base_url: String,
    /// Bearer token for the provider API.
    pub auth_token: Option<String>,
    /// Sender identifier at the provider (phone number id / subscription id).
    pub phone_number_id: Option<String>,
    /// Business account identifier, informational.
    pub business_account_id: Option<String>,
    /// Secret for webhook HMAC verification.
    pub webhook_secret: Option<String>,
    /// Token echoed back during webhook subscription verification.
    pub verify_token: Option<String>,
    /// Extra headers sent with every provider request.
    pub custom_headers: BTreeMap<String, String>,
    /// Per-request timeout in seconds. Zero means the adapter default.
    pub timeout_secs: u64,
}

impl ChannelProviderConfig {
    /// Returns the auth token when present and non-blank.
    pub fn token(&self) -> Option<&str> {
        self.auth_token.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Returns the sender identifier when present and non-blank.
    pub fn sender_id(&self) -> Option<&str> {
        self.phone_number_id.as_deref().filter(|t| !t.trim().is_empty())
    }

    /// Returns the webhook secret when present and non-blank.
    pub fn secret(&self) -> Option<&str> {
        self.webhook_secret.as_deref().filter(|t| !t.is_empty())
    }
}

impl std::fmt::Debug for ChannelProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelProviderConfig")
            .field("base_url", &self.base_url)
            .field("auth_token", &self.auth_token.as_ref().map(|_| "[redacted]"))
            .field("phone_number_id", &self.phone_number_id)
            .field("business_account_id", &self.business_account_id)
            .field(
                "webhook_secret",
                &self.webhook_secret.as_ref().map(|_| "[redacted]"),
            )
            .field("verify_token", &self.verify_token.as_ref().map(|_| "[redacted]"))
            .field("custom_headers", &self.custom_headers.keys().collect::<Vec<_>>())
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

/// A tenant's configured messaging endpoint.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Channel {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    /// Registry name of the provider adapter, e.g. `whatsapp_cloud`.
    pub provider: String,
    pub status: ChannelStatus,
    pub config: ChannelProviderConfig,
    pub blocked_by_provider: bool,
    pub blocked_reason: Option<String>,
    pub blocked_code: Option<String>,
    pub blocked_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// An approved (or pending) message template with its variable mapping table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TemplateRecord {
    pub id: String,
    pub tenant_id: String,
    pub name: String,
    pub language: String,
    pub status: TemplateStatus,
    pub components: Vec<TemplateComponent>,
    pub variable_mappings: Vec<VariableMapping>,
    /// Default media link for media headers.
    pub header_media_url: Option<String>,
    pub created_at: String,
}

/// Per-status recipient counts of a campaign.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CampaignCounters {
    pub queued: i64,
    pub sent: i64,
    pub delivered: i64,
    pub read: i64,
    pub failed: i64,
    /// Failed rows still scheduled for an automatic retry.
    pub pending_retry: i64,
}

impl CampaignCounters {
    /// True when nothing is left for a future invocation.
    pub fn is_settled(&self) -> bool {
        self.queued == 0 && self.pending_retry == 0
    }
}

/// A batch send job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub tenant_id: String,
    pub channel_id: String,
    pub template_id: String,
    pub name: String,
    pub status: CampaignStatus,
    pub counters: CampaignCounters,
    /// Campaign-level template variables.
    pub variables: BTreeMap<String, String>,
    pub paused_reason: Option<String>,
    pub started_at: Option<String>,
    pub completed_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A campaign joined with its template and channel.
#[derive(Debug, Clone, PartialEq)]
pub struct CampaignContext {
    pub campaign: Campaign,
    pub template: TemplateRecord,
    pub channel: Channel,
}

/// An addressable person within a tenant.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contact {
    pub id: String,
    pub tenant_id: String,
    pub phone: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub metadata: BTreeMap<String, serde_json::Value>,
    pub created_at: String,
}

/// One planned delivery of a campaign.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CampaignRecipient {
    pub id: String,
    pub campaign_id: String,
    pub contact_id: String,
    pub status: DeliveryStatus,
    pub attempts: u32,
    pub last_error_code: Option<String>,
    pub last_error: Option<String>,
    pub next_retry_at: Option<String>,
    pub provider_message_id: Option<String>,
    pub correlation_id: Option<String>,
    /// Per-recipient variable overrides.
    pub variables: BTreeMap<String, String>,
    pub sent_at: Option<String>,
    pub delivered_at: Option<String>,
    pub read_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A recipient selected for sending, together with its contact.
#[derive(Debug, Clone, PartialEq)]
pub struct DueRecipient {
    pub recipient: CampaignRecipient,
    pub contact: Contact,
}

/// Fields written when a send is confirmed.
#[derive(Debug, Clone, PartialEq)]
pub struct SentUpdate {
    pub provider_message_id: String,
    pub correlation_id: String,
    pub attempts: u32,
    pub sent_at: String,
}

/// Fields written when a send fails.
#[derive(Debug, Clone, PartialEq)]
pub struct FailureUpdate {
    pub attempts: u32,
    pub correlation_id: Option<String>,
    pub error_code: String,
    pub error_detail: String,
    /// `None` marks the failure permanent.
    pub next_retry_at: Option<String>,
}

/// A delivery status change arriving from a webhook.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub status: DeliveryStatus,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
    pub at: String,
}

/// A contact-channel inbox thread.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: String,
    pub tenant_id: String,
    pub channel_id: String,
    pub contact_id: String,
    pub status: ConversationStatus,
    pub deleted_at: Option<String>,
    pub deleted_reason: Option<DeletedReason>,
    pub last_message_preview: Option<String>,
    pub last_message_at: Option<String>,
    pub last_inbound_at: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

impl Conversation {
    /// A deleted conversation that must never be reused.
    pub fn is_tombstone(&self) -> bool {
        self.deleted_at.is_some() && self.deleted_reason == Some(DeletedReason::UserDeleted)
    }
}

/// A message stored in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboxMessage {
    pub id: String,
    pub conversation_id: String,
    pub tenant_id: String,
    pub channel_id: String,
    pub direction: MessageDirection,
    /// `text`, `template`, `image`, `location`, ...
    pub kind: String,
    pub content: String,
    pub payload: Option<serde_json::Value>,
    pub provider_message_id: Option<String>,
    pub status: DeliveryStatus,
    pub error_code: Option<String>,
    pub error_detail: Option<String>,
    pub campaign_recipient_id: Option<String>,
    pub reply_to: Option<String>,
    pub created_at: String,
    pub updated_at: String,
}

/// A raw webhook payload kept for audit.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WebhookEventRecord {
    pub id: String,
    pub channel_id: String,
    pub provider: String,
    pub payload: String,
    pub processed: bool,
    pub event_count: i64,
    pub linked_message_id: Option<String>,
    pub linked_recipient_id: Option<String>,
    pub error: Option<String>,
    pub received_at: String,
    pub processed_at: Option<String>,
}

/// Outcome written back onto a persisted webhook event.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WebhookEventLink {
    pub event_count: i64,
    pub linked_message_id: Option<String>,
    pub linked_recipient_id: Option<String>,
    pub error: Option<String>,
}
