// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Delivery receipts applied to campaign recipients and inbox messages.
//!
//! Rows only move forward along `queued < sent < delivered < read`; `failed`
//! overrides any state. Out-of-order and duplicate receipts are no-ops.

use tracing::{debug, info};
use zapflow_core::events::StatusUpdate;
use zapflow_core::types::StatusChange;
use zapflow_core::{StorageAdapter, ZapflowError};

/// Rows a receipt touched.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StatusOutcome {
    pub recipient_id: Option<String>,
    pub message_id: Option<String>,
    /// At least one row changed.
    pub applied: bool,
}

/// Applies one receipt to the recipient and the inbox message carrying its
/// provider message id. Counters of the owning campaign are refreshed when
/// the recipient changed.
pub async fn apply_status(
    storage: &dyn StorageAdapter,
    channel_id: &str,
    update: &StatusUpdate,
) -> Result<StatusOutcome, ZapflowError> {
    let change = StatusChange {
        status: update.status,
        error_code: update.error_code.clone(),
        error_detail: update.error_detail.clone(),
        at: update.timestamp.clone(),
    };
    let mut outcome = StatusOutcome::default();

    if let Some(recipient) = storage
        .find_recipient_by_provider_message_id(channel_id, &update.provider_message_id)
        .await?
    {
        let changed = storage.apply_recipient_status(&recipient.id, &change).await?;
        if changed {
            storage.refresh_campaign_counters(&recipient.campaign_id).await?;
            info!(
                recipient_id = %recipient.id,
                campaign_id = %recipient.campaign_id,
                status = %update.status,
                "recipient status updated"
            );
        }
        outcome.applied |= changed;
        outcome.recipient_id = Some(recipient.id);
    }

    if let Some(message) = storage
        .find_message_by_provider_id(channel_id, &update.provider_message_id)
        .await?
    {
        outcome.applied |= storage.apply_message_status(&message.id, &change).await?;
        outcome.message_id = Some(message.id);
    }

    if outcome.recipient_id.is_none() && outcome.message_id.is_none() {
        debug!(
            provider_message_id = %update.provider_message_id,
            "status for unknown message ignored"
        );
    }
    Ok(outcome)
}
