// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! UTC timestamp helpers.
//!
//! Every persisted timestamp uses the fixed-width `YYYY-MM-DDTHH:MM:SS.mmmZ`
//! form so string comparison matches chronological order.

use chrono::{DateTime, SecondsFormat, TimeZone, Utc};

/// Formats an instant in the persisted timestamp form.
pub fn format_ts(at: DateTime<Utc>) -> String {
    at.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Current time in the persisted timestamp form.
pub fn now_ts() -> String {
    format_ts(Utc::now())
}

/// Parses a persisted (or any RFC 3339) timestamp.
pub fn parse_ts(value: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Converts unix seconds (as sent in provider webhooks) to the persisted form.
pub fn from_unix_secs(secs: i64) -> Option<String> {
    Utc.timestamp_opt(secs, 0).single().map(format_ts)
}
