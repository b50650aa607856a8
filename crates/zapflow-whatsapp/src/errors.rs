// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Classification of Cloud API failures into normalized provider errors.

use serde_json::Value;
use zapflow_core::error::codes;
use zapflow_core::{ErrorCategory, ProviderError};

/// The `error` object of a Cloud API response body.
#[derive(Debug, Clone, PartialEq)]
pub struct CloudError {
    pub code: Option<i64>,
    pub message: String,
}

/// Reads the `error` object embedded in a response body, if any.
///
/// The most specific text wins: `error_data.details`, then `message`, then `title`.
pub fn cloud_error(body: &Value) -> Option<CloudError> {
    let error = body.get("error")?;
    if let Some(text) = error.as_str() {
        return Some(CloudError {
            code: None,
            message: text.to_string(),
        });
    }
    if !error.is_object() {
        return None;
    }
    let code = error.get("code").and_then(|c| {
        c.as_i64()
            .or_else(|| c.as_str().and_then(|s| s.trim().parse().ok()))
    });
    let message = error
        .pointer("/error_data/details")
        .and_then(Value::as_str)
        .or_else(|| error.get("message").and_then(Value::as_str))
        .or_else(|| error.get("title").and_then(Value::as_str))
        .unwrap_or("provider error")
        .to_string();
    Some(CloudError { code, message })
}

/// Category and channel-blocking flag for a known Cloud error code.
pub fn category_for_code(code: i64) -> Option<(ErrorCategory, bool)> {
    use ErrorCategory::*;
    let entry = match code {
        0 | 10 | 190 | 200..=299 => (Auth, false),
        4 | 80007 | 130429 | 131048 | 131056 => (RateLimit, false),
        131042 => (PaymentError, false),
        // Account locked or restricted for policy violations.
        131031 | 368 => (InvalidRequest, true),
        132000..=132016 => (TemplateError, false),
        131026 | 131021 | 131051 => (RecipientError, false),
        1 | 2 | 131000 | 131016 | 133004 => (Temporary, false),
        _ => return None,
    };
    Some(entry)
}

fn category_for_status(status: u16) -> ErrorCategory {
    match status {
        401 | 403 => ErrorCategory::Auth,
        429 => ErrorCategory::RateLimit,
        500..=599 => ErrorCategory::Temporary,
        400..=499 => ErrorCategory::InvalidRequest,
        _ => ErrorCategory::Unknown,
    }
}

fn code_for_status(status: u16) -> String {
    match status {
        401 | 403 => codes::UNAUTHORIZED.to_string(),
        429 => codes::RATE_LIMITED.to_string(),
        other => format!("HTTP_{other}"),
    }
}

/// Classifies a failed response.
///
/// A known provider code decides the category; otherwise the HTTP status does.
/// The provider code is kept as the error code whenever one was sent.
pub fn classify(status: u16, error: Option<&CloudError>) -> ProviderError {
    let message = error
        .map(|e| e.message.clone())
        .unwrap_or_else(|| format!("provider returned HTTP {status}"));

    let classified = match error.and_then(|e| e.code) {
        Some(code) => match category_for_code(code) {
            Some((category, true)) => ProviderError::new(category, code.to_string(), message).blocking(),
            Some((category, false)) => ProviderError::new(category, code.to_string(), message),
            None => ProviderError::new(category_for_status(status), code.to_string(), message),
        },
        None => ProviderError::new(category_for_status(status), code_for_status(status), message),
    };
    classified.with_status(status)
}
