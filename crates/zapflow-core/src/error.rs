// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Error types for the Zapflow campaign engine.
//!
//! [`ZapflowError`] is the infrastructure error returned by adapters and
//! storage. [`ProviderError`] is the normalized failure a BSP adapter reports
//! for a single request; it never escapes as an `Err` from a send but travels
//! inside [`SendResult`](crate::provider::SendResult).

use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use thiserror::Error;

/// The primary error type used across Zapflow adapter traits and core operations.
#[derive(Debug, Error)]
pub enum ZapflowError {
    /// Configuration errors (invalid TOML, missing required fields, bad channel setup).
    #[error("configuration error: {0}")]
    Config(String),

    /// Storage backend errors (database connection, query failure, serialization).
    #[error("storage error: {source}")]
    Storage {
        source: Box<dyn std::error::Error + Send + Sync>,
    },

    /// Provider transport or protocol errors outside a single send.
    #[error("provider error: {message}")]
    Provider {
        message: String,
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },

    /// A referenced row does not exist.
    #[error("{entity} not found: {id}")]
    NotFound { entity: &'static str, id: String },

    /// Input rejected before any side effect.
    #[error("validation error: {0}")]
    Validation(String),

    /// Operation timed out.
    #[error("operation timed out after {duration:?}")]
    Timeout { duration: std::time::Duration },

    /// Internal or unexpected errors.
    #[error("internal error: {0}")]
    Internal(String),
}

impl ZapflowError {
    /// Wraps any error as a storage failure.
    pub fn storage(source: impl Into<Box<dyn std::error::Error + Send + Sync>>) -> Self {
        Self::Storage {
            source: source.into(),
        }
    }
}

/// Classification of a provider failure.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Display, EnumString, Serialize, Deserialize,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    Auth,
    RateLimit,
    InvalidRequest,
    TemplateError,
    RecipientError,
    PaymentError,
    Temporary,
    Unknown,
}

impl ErrorCategory {
    /// Whether failures of this category may be retried automatically.
    pub fn is_retryable(self) -> bool {
        matches!(self, Self::RateLimit | Self::Temporary | Self::Unknown)
    }

    /// Whether failures of this category reject the whole channel.
    pub fn blocks_channel(self) -> bool {
        matches!(self, Self::Auth | Self::PaymentError)
    }
}

/// Error codes produced locally rather than by a provider.
pub mod codes {
    /// 2xx response without an extractable provider message id.
    pub const NO_MESSAGE_ID: &str = "NO_MESSAGE_ID";
    /// Produced template values differ from the placeholder count.
    pub const PARAM_COUNT_MISMATCH: &str = "PARAM_COUNT_MISMATCH";
    /// A slot marked required resolved to an empty value.
    pub const MISSING_REQUIRED_VARIABLE: &str = "MISSING_REQUIRED_VARIABLE";
    /// The contact phone could not be normalized.
    pub const INVALID_PHONE: &str = "INVALID_PHONE";
    /// Connection or I/O failure talking to the provider.
    pub const NETWORK_ERROR: &str = "NETWORK_ERROR";
    /// The provider call exceeded its timeout.
    pub const TIMEOUT: &str = "TIMEOUT";
    /// A webhook secret is configured but no signature header was sent.
    pub const MISSING_SIGNATURE: &str = "MISSING_SIGNATURE";
    /// The webhook signature did not match the body.
    pub const INVALID_SIGNATURE: &str = "INVALID_SIGNATURE";
    /// The channel has no webhook secret while secrets are mandatory.
    pub const SECRET_REQUIRED: &str = "SECRET_REQUIRED";
    /// Persisting a recipient update failed.
    pub const STORAGE_ERROR: &str = "STORAGE_ERROR";
    /// HTTP 401/403 without a more specific provider code.
    pub const UNAUTHORIZED: &str = "UNAUTHORIZED";
    /// HTTP 429 without a more specific provider code.
    pub const RATE_LIMITED: &str = "RATE_LIMITED";
    /// The channel lacks the token or sender id a request needs.
    pub const MISSING_CREDENTIALS: &str = "MISSING_CREDENTIALS";
    /// A free-form reply was attempted outside the messaging window.
    pub const WINDOW_CLOSED: &str = "WINDOW_CLOSED";
    /// Fetching a media URL before upload failed.
    pub const MEDIA_FETCH_FAILED: &str = "MEDIA_FETCH_FAILED";
}

/// A normalized provider failure.
#[derive(Debug, Clone, PartialEq, Eq, Error, Serialize, Deserialize)]
#[error("{category} error ({code}): {message}")]
pub struct ProviderError {
    pub category: ErrorCategory,
    pub code: String,
    pub message: String,
    pub http_status: Option<u16>,
    pub retryable: bool,
    pub blocks_channel: bool,
}

impl ProviderError {
    /// Creates an error whose flags follow the category defaults.
    pub fn new(category: ErrorCategory, code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            category,
            code: code.into(),
            message: message.into(),
            http_status: None,
            retryable: category.is_retryable(),
            blocks_channel: category.blocks_channel(),
        }
    }

    /// Transport failures (timeouts, connection resets) are always temporary.
    pub fn transport(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::new(ErrorCategory::Temporary, code, message)
    }

    /// A 2xx response that carried no message id.
    pub fn no_message_id() -> Self {
        Self::new(
            ErrorCategory::Unknown,
            codes::NO_MESSAGE_ID,
            "provider accepted the request but returned no message id",
        )
    }

    pub fn with_status(mut self, status: u16) -> Self {
        self.http_status = Some(status);
        self
    }

    /// Marks the failure as rejecting the whole channel (account locked, policy block).
    pub fn blocking(mut self) -> Self {
        self.blocks_channel = true;
        self.retryable = false;
        self
    }

    pub fn is_rate_limit(&self) -> bool {
        self.category == ErrorCategory::RateLimit
    }
}
