// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error type for inbox operations.

use zapflow_core::error::codes;
use zapflow_core::{ProviderError, ZapflowError};

#[derive(Debug, thiserror::Error)]
pub enum InboxError {
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    #[error("conversation {0} is deleted")]
    Deleted(String),

    /// Free-form text outside the messaging window; a template is required.
    #[error("messaging window is closed (last inbound: {})", last_inbound.as_deref().unwrap_or("never"))]
    WindowClosed { last_inbound: Option<String> },

    #[error("inbound sender phone is invalid: {0}")]
    InvalidPhone(String),

    #[error("send failed: {0}")]
    Send(#[source] ProviderError),

    #[error(transparent)]
    Storage(#[from] ZapflowError),
}

impl InboxError {
    /// Machine-readable code for API responses.
    pub fn code(&self) -> &str {
        match self {
            Self::NotFound { .. } => "NOT_FOUND",
            Self::Deleted(_) => "CONVERSATION_DELETED",
            Self::WindowClosed { .. } => codes::WINDOW_CLOSED,
            Self::InvalidPhone(_) => codes::INVALID_PHONE,
            Self::Send(err) => &err.code,
            Self::Storage(_) => codes::STORAGE_ERROR,
        }
    }
}
