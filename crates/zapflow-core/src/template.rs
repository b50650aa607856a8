// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Stored shape of message templates and their variable mapping tables.

use serde::{Deserialize, Serialize};

/// Format of a template header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HeaderFormat {
    #[default]
    Text,
    Image,
    Video,
    Document,
}

impl HeaderFormat {
    /// True for headers that carry a media link instead of text values.
    pub fn is_media(self) -> bool {
        !matches!(self, Self::Text)
    }
}

/// Kind of a template button.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ButtonKind {
    QuickReply,
    Url,
    PhoneNumber,
}

/// One button of a `buttons` component.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TemplateButton {
    pub kind: ButtonKind,
    pub text: String,
    /// URL pattern; may contain `{{n}}` placeholders for dynamic suffixes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// One section of an approved template.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TemplateComponent {
    Header {
        #[serde(default)]
        format: HeaderFormat,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        text: Option<String>,
    },
    Body {
        text: String,
    },
    Footer {
        text: String,
    },
    Buttons {
        buttons: Vec<TemplateButton>,
    },
}

/// Where a slot's raw value comes from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MappingSource {
    /// `first_name`, `name`, `phone`, `email`, or a contact metadata key.
    ContactField { field: String },
    FixedValue { value: String },
    /// Recipient override first, then campaign variable, by key.
    Variable { key: String },
}

/// Binds one template slot (`header.1`, `body.2`, `button.0.1`) to a source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VariableMapping {
    pub slot: String,
    pub source: MappingSource,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fallback: Option<String>,
    #[serde(default)]
    pub required: bool,
}
