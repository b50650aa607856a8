// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP plumbing shared by the Cloud API operations.
//!
//! Every request carries the channel's bearer token, custom headers, and a
//! timeout. Transport failures become `temporary` provider errors.

use std::time::Duration;

use reqwest::header::{HeaderName, HeaderValue};
use reqwest::{RequestBuilder, StatusCode};
use serde_json::Value;
use tracing::{debug, warn};
use zapflow_core::error::codes;
use zapflow_core::provider::SendResult;
use zapflow_core::types::ChannelProviderConfig;
use zapflow_core::{ErrorCategory, ProviderError};

use crate::errors::{classify, cloud_error};
use crate::response::extract_message_id;

/// Timeout applied when the channel does not set one.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// A completed HTTP exchange with its decoded body.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub status: StatusCode,
    pub body: Value,
}

impl ApiResponse {
    /// The failure carried by this response: a non-2xx status, or an
    /// `error` object embedded in a 2xx body.
    pub fn failure(&self) -> Option<ProviderError> {
        let embedded = cloud_error(&self.body);
        if self.status.is_success() && embedded.is_none() {
            return None;
        }
        Some(classify(self.status.as_u16(), embedded.as_ref()))
    }

    /// Interprets the response of a send.
    ///
    /// A send is confirmed only when it succeeded and a message id was found.
    pub fn into_send_result(self) -> SendResult {
        if let Some(error) = self.failure() {
            return SendResult::failed(error, self.body);
        }
        match extract_message_id(&self.body) {
            Some(id) => SendResult::sent(id, self.body),
            None => SendResult::failed(
                ProviderError::no_message_id().with_status(self.status.as_u16()),
                self.body,
            ),
        }
    }
}

/// Joins the channel base URL with a path.
pub fn endpoint(config: &ChannelProviderConfig, path: &str) -> String {
    format!(
        "{}/{}",
        config.base_url.trim_end_matches('/'),
        path.trim_start_matches('/')
    )
}

/// Per-request timeout for a channel.
pub fn timeout_for(config: &ChannelProviderConfig, default: Duration) -> Duration {
    if config.timeout_secs == 0 {
        default
    } else {
        Duration::from_secs(config.timeout_secs)
    }
}

/// Applies bearer auth, custom headers, and the timeout to a request.
pub fn authorize(
    builder: RequestBuilder,
    config: &ChannelProviderConfig,
    default_timeout: Duration,
) -> RequestBuilder {
    let mut builder = builder.timeout(timeout_for(config, default_timeout));
    if let Some(token) = config.token() {
        builder = builder.bearer_auth(token);
    }
    for (name, value) in &config.custom_headers {
        match (
            HeaderName::from_bytes(name.as_bytes()),
            HeaderValue::from_str(value),
        ) {
            (Ok(name), Ok(value)) => builder = builder.header(name, value),
            _ => warn!(header = %name, "skipping invalid custom header"),
        }
    }
    builder
}

/// Sends a request and decodes the body.
///
/// Non-JSON bodies are kept as a JSON string; empty bodies become `null`.
pub async fn execute(builder: RequestBuilder) -> Result<ApiResponse, ProviderError> {
    let response = builder.send().await.map_err(transport_error)?;
    let status = response.status();
    let text = response.text().await.map_err(transport_error)?;
    debug!(status = %status, bytes = text.len(), "provider response received");
    Ok(ApiResponse {
        status,
        body: parse_body(&text),
    })
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

/// Maps a reqwest failure onto a temporary provider error.
pub fn transport_error(e: reqwest::Error) -> ProviderError {
    if e.is_timeout() {
        ProviderError::transport(codes::TIMEOUT, format!("provider request timed out: {e}"))
    } else {
        ProviderError::transport(codes::NETWORK_ERROR, format!("provider request failed: {e}"))
    }
}

/// Error for a channel missing the token or sender id.
pub fn missing_credentials(what: &str) -> ProviderError {
    ProviderError::new(
        ErrorCategory::InvalidRequest,
        codes::MISSING_CREDENTIALS,
        format!("channel has no {what} configured"),
    )
}
