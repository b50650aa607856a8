// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Request-level webhook failures. Per-event failures never surface here.

use zapflow_core::error::codes;
use zapflow_core::{ProviderError, ZapflowError};

#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    #[error("channel not found: {0}")]
    ChannelNotFound(String),

    #[error("no provider adapter registered as {0}")]
    UnknownProvider(String),

    #[error("webhook authentication failed: {0}")]
    Unauthorized(ProviderError),

    #[error("channel has no webhook secret and unsigned webhooks are rejected")]
    SecretRequired,

    #[error("malformed webhook payload: {0}")]
    Malformed(String),

    #[error("webhook subscription verification failed")]
    VerificationFailed,

    #[error(transparent)]
    Storage(#[from] ZapflowError),
}

impl IngestError {
    /// HTTP status the gateway answers with.
    pub fn status(&self) -> http::StatusCode {
        use http::StatusCode;
        match self {
            Self::ChannelNotFound(_) | Self::UnknownProvider(_) => StatusCode::NOT_FOUND,
            Self::Unauthorized(_) | Self::SecretRequired => StatusCode::UNAUTHORIZED,
            Self::Malformed(_) => StatusCode::BAD_REQUEST,
            Self::VerificationFailed => StatusCode::FORBIDDEN,
            Self::Storage(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    pub fn code(&self) -> &str {
        match self {
            Self::ChannelNotFound(_) => "NOT_FOUND",
            Self::UnknownProvider(_) => "UNKNOWN_PROVIDER",
            Self::Unauthorized(err) => &err.code,
            Self::SecretRequired => codes::SECRET_REQUIRED,
            Self::Malformed(_) => "MALFORMED_PAYLOAD",
            Self::VerificationFailed => "VERIFICATION_FAILED",
            Self::Storage(_) => codes::STORAGE_ERROR,
        }
    }
}
