// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Plain-text rendering of a resolved template, used for the inbox copy.

use zapflow_core::provider::TemplateParameters;

use crate::schema::{PLACEHOLDER, Section, TemplateSchema};

/// Substitutes `{{N}}` with the N-th value; unknown positions render empty.
fn substitute(text: &str, positions: &[usize], values: &[String]) -> String {
    PLACEHOLDER
        .replace_all(text, |caps: &regex::Captures<'_>| {
            caps.get(1)
                .and_then(|m| m.as_str().parse::<usize>().ok())
                .and_then(|n| positions.iter().position(|p| *p == n))
                .and_then(|i| values.get(i))
                .cloned()
                .unwrap_or_default()
        })
        .into_owned()
}

/// Header text and body joined by a blank line.
pub fn render_text(schema: &TemplateSchema, parameters: &TemplateParameters) -> String {
    let mut parts = Vec::new();
    if let Some(header) = &schema.header_text {
        let positions = schema.positions(Section::Header);
        parts.push(substitute(header, positions, &parameters.header));
    }
    if let Some(body) = &schema.body_text {
        let positions = schema.positions(Section::Body);
        parts.push(substitute(body, positions, &parameters.body));
    }
    parts.retain(|p| !p.trim().is_empty());
    parts.join("\n\n")
}
