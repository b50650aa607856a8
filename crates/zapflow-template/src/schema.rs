// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Expected variable slots of a template, scanned from its components.

use std::collections::BTreeSet;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use zapflow_core::template::{ButtonKind, HeaderFormat, TemplateComponent};

/// `{{N}}` with optional inner whitespace.
pub(crate) static PLACEHOLDER: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\{\{\s*(\d+)\s*\}\}").expect("placeholder pattern is valid"));

/// Distinct placeholder positions in `text`, ascending.
pub fn scan_placeholders(text: &str) -> Vec<usize> {
    PLACEHOLDER
        .captures_iter(text)
        .filter_map(|c| c.get(1)?.as_str().parse::<usize>().ok())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// A template section that takes parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Section {
    Header,
    Body,
    Button { index: usize },
}

impl fmt::Display for Section {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Header => f.write_str("header"),
            Self::Body => f.write_str("body"),
            Self::Button { index } => write!(f, "button.{index}"),
        }
    }
}

/// One placeholder position of a section: `header.1`, `body.2`, `button.0.1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SlotKey {
    pub section: Section,
    pub position: usize,
}

impl SlotKey {
    pub fn new(section: Section, position: usize) -> Self {
        Self { section, position }
    }
}

impl fmt::Display for SlotKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.section, self.position)
    }
}

/// Error for a slot key that does not follow `header.N`, `body.N`, or `button.I.N`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("invalid slot key: {0}")]
pub struct InvalidSlotKey(pub String);

impl FromStr for SlotKey {
    type Err = InvalidSlotKey;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || InvalidSlotKey(s.to_string());
        let parts: Vec<&str> = s.trim().split('.').collect();
        let number = |p: &str| p.parse::<usize>().map_err(|_| invalid());
        let key = match parts.as_slice() {
            ["header", n] => SlotKey::new(Section::Header, number(*n)?),
            ["body", n] => SlotKey::new(Section::Body, number(*n)?),
            ["button", i, n] => SlotKey::new(Section::Button { index: number(*i)? }, number(*n)?),
            _ => return Err(invalid()),
        };
        if key.position == 0 {
            return Err(invalid());
        }
        Ok(key)
    }
}

/// Expected slots per section of one template.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TemplateSchema {
    pub header_format: HeaderFormat,
    pub header_text: Option<String>,
    pub body_text: Option<String>,
    /// Placeholder positions by section; sections without placeholders are absent.
    pub sections: Vec<(Section, Vec<usize>)>,
}

impl TemplateSchema {
    /// Scans header text, body text, and URL button patterns.
    ///
    /// Buttons are indexed by their position in the `buttons` component; only
    /// URL buttons take parameters.
    pub fn from_components(components: &[TemplateComponent]) -> Self {
        let mut schema = Self::default();
        for component in components {
            match component {
                TemplateComponent::Header { format, text } => {
                    schema.header_format = *format;
                    if !format.is_media()
                        && let Some(text) = text
                    {
                        schema.header_text = Some(text.clone());
                        schema.push(Section::Header, scan_placeholders(text));
                    }
                }
                TemplateComponent::Body { text } => {
                    schema.body_text = Some(text.clone());
                    schema.push(Section::Body, scan_placeholders(text));
                }
                TemplateComponent::Footer { .. } => {}
                TemplateComponent::Buttons { buttons } => {
                    for (index, button) in buttons.iter().enumerate() {
                        if button.kind != ButtonKind::Url {
                            continue;
                        }
                        if let Some(url) = &button.url {
                            schema.push(Section::Button { index }, scan_placeholders(url));
                        }
                    }
                }
            }
        }
        schema
    }

    fn push(&mut self, section: Section, positions: Vec<usize>) {
        if !positions.is_empty() {
            self.sections.push((section, positions));
        }
    }

    /// Expected positions of a section (empty when it takes no parameters).
    pub fn positions(&self, section: Section) -> &[usize] {
        self.sections
            .iter()
            .find(|(s, _)| *s == section)
            .map(|(_, p)| p.as_slice())
            .unwrap_or(&[])
    }

    /// Number of values a section expects.
    pub fn expected_count(&self, section: Section) -> usize {
        self.positions(section).len()
    }

    /// Every expected slot, in section order.
    pub fn slots(&self) -> Vec<SlotKey> {
        self.sections
            .iter()
            .flat_map(|(section, positions)| positions.iter().map(|p| SlotKey::new(*section, *p)))
            .collect()
    }

    pub fn contains(&self, slot: SlotKey) -> bool {
        self.positions(slot.section).contains(&slot.position)
    }
}
