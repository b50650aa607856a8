// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Batch precondition failures. Nothing was sent when one of these is returned.

use zapflow_core::ZapflowError;
use zapflow_core::error::codes;
use zapflow_core::types::{CampaignStatus, ChannelStatus, TemplateStatus};

#[derive(Debug, thiserror::Error)]
pub enum BatchError {
    #[error("campaign not found: {0}")]
    CampaignNotFound(String),

    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("campaign {id} is {status} and cannot be processed")]
    NotRunnable { id: String, status: CampaignStatus },

    #[error("channel has no auth token configured")]
    MissingToken,

    #[error("channel has no phone number id configured")]
    MissingSenderId,

    #[error("channel is {0}, not connected")]
    ChannelNotConnected(ChannelStatus),

    #[error("channel is blocked by the provider: {0}")]
    ChannelBlocked(String),

    #[error("template is {0}, not approved")]
    TemplateNotApproved(TemplateStatus),

    #[error("no provider adapter registered as {0}")]
    UnknownProvider(String),

    #[error(transparent)]
    Storage(#[from] ZapflowError),
}

impl BatchError {
    pub fn code(&self) -> &'static str {
        match self {
            Self::CampaignNotFound(_) | Self::ChannelNotFound(_) => "NOT_FOUND",
            Self::NotRunnable { .. } => "CAMPAIGN_NOT_RUNNABLE",
            Self::MissingToken | Self::MissingSenderId => codes::MISSING_CREDENTIALS,
            Self::ChannelNotConnected(_) => "CHANNEL_NOT_CONNECTED",
            Self::ChannelBlocked(_) => "CHANNEL_BLOCKED",
            Self::TemplateNotApproved(_) => "TEMPLATE_NOT_APPROVED",
            Self::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            Self::Storage(_) => codes::STORAGE_ERROR,
        }
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::CampaignNotFound(_) | Self::ChannelNotFound(_))
    }
}
