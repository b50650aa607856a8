// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Result of one batch invocation.

use serde::{Deserialize, Serialize};

/// Why a batch ended before its selection was exhausted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    BudgetExhausted,
    CampaignNotRunning,
}

/// One failed recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecipientError {
    pub phone: String,
    pub error: String,
    pub code: String,
}

/// Counters of one invocation.
///
/// `failed` counts permanent failures and `retry_scheduled` counts failures
/// left eligible for a later invocation; both appear in `errors`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub campaign_id: String,
    pub processed: usize,
    pub success: usize,
    pub failed: usize,
    pub retry_scheduled: usize,
    /// The campaign reached `done` in this invocation.
    pub finished: bool,
    pub rate_limited: bool,
    pub errors: Vec<RecipientError>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub paused_reason: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stopped: Option<StopReason>,
}

impl BatchReport {
    pub fn new(campaign_id: impl Into<String>) -> Self {
        Self {
            campaign_id: campaign_id.into(),
            ..Default::default()
        }
    }

    pub(crate) fn push_error(&mut self, phone: &str, error: impl Into<String>, code: impl Into<String>) {
        self.errors.push(RecipientError {
            phone: phone.to_string(),
            error: error.into(),
            code: code.into(),
        });
    }
}
