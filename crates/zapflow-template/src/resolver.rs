// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Binding of contact and campaign data onto a template's placeholder slots.
//!
//! Every expected slot gets exactly one value: the mapped source when it
//! yields something non-blank, else the mapping's fallback, else a default.
//! Mappings that point at slots the template does not have inflate the
//! produced count, so stale mapping tables fail validation instead of
//! silently shifting values.

use std::collections::{BTreeMap, BTreeSet};

use serde::Serialize;
use serde_json::Value;
use zapflow_core::error::codes;
use zapflow_core::provider::{ButtonParameters, HeaderMedia, MediaKind, TemplateParameters};
use zapflow_core::template::{HeaderFormat, MappingSource, VariableMapping};
use zapflow_core::types::{Contact, TemplateRecord};
use zapflow_core::{ErrorCategory, ProviderError};

use crate::schema::{Section, SlotKey, TemplateSchema};

/// Variable key that overrides the template's stored header media link.
pub const HEADER_MEDIA_VARIABLE: &str = "header_media_url";

/// Why a resolution cannot be sent.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[serde(tag = "issue", rename_all = "snake_case")]
pub enum ResolveIssue {
    #[error("{section} expects {expected} parameters but {actual} were produced")]
    CountMismatch {
        section: String,
        expected: usize,
        actual: usize,
    },
    #[error("required variable {slot} resolved to an empty value")]
    MissingRequired { slot: String },
    #[error("mapping targets unknown slot {slot}")]
    UnknownSlot { slot: String },
    #[error("media header has no link")]
    MissingHeaderMedia,
}

impl ResolveIssue {
    pub fn code(&self) -> &'static str {
        match self {
            Self::MissingRequired { .. } => codes::MISSING_REQUIRED_VARIABLE,
            Self::CountMismatch { .. } | Self::UnknownSlot { .. } | Self::MissingHeaderMedia => {
                codes::PARAM_COUNT_MISMATCH
            }
        }
    }
}

/// How one slot was filled.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SlotDiagnostic {
    pub slot: String,
    /// Value produced by the mapped source before fallback.
    pub raw: Option<String>,
    pub value: String,
    pub used_fallback: bool,
}

/// Outcome of resolving one contact against one template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub parameters: TemplateParameters,
    pub slots: Vec<SlotDiagnostic>,
    pub issues: Vec<ResolveIssue>,
}

impl Resolution {
    /// True when the parameters may be sent.
    pub fn success(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn used_fallback(&self) -> bool {
        self.slots.iter().any(|s| s.used_fallback)
    }

    /// The first issue as a `template_error`, or `None` on success.
    pub fn error(&self) -> Option<ProviderError> {
        let issue = self.issues.first()?;
        Some(ProviderError::new(
            ErrorCategory::TemplateError,
            issue.code(),
            issue.to_string(),
        ))
    }
}

/// Data a resolution draws from.
#[derive(Debug, Clone, Copy)]
pub struct ResolveInput<'a> {
    pub template: &'a TemplateRecord,
    pub contact: &'a Contact,
    pub campaign_variables: &'a BTreeMap<String, String>,
    pub recipient_variables: &'a BTreeMap<String, String>,
}

impl ResolveInput<'_> {
    /// Recipient override first, then campaign variable.
    fn variable(&self, key: &str) -> Option<String> {
        self.recipient_variables
            .get(key)
            .and_then(|v| normalize(Some(v.as_str())))
            .or_else(|| self.campaign_variables.get(key).and_then(|v| normalize(Some(v))))
    }
}

/// Template parameter resolver.
#[derive(Debug, Clone)]
pub struct Resolver {
    default_greeting: String,
}

impl Resolver {
    pub fn new(default_greeting: impl Into<String>) -> Self {
        Self {
            default_greeting: default_greeting.into(),
        }
    }

    /// Resolves every slot of the template for one contact.
    pub fn resolve(&self, input: &ResolveInput<'_>) -> Resolution {
        let schema = TemplateSchema::from_components(&input.template.components);
        let mut issues = Vec::new();
        let mut mapped: BTreeMap<SlotKey, &VariableMapping> = BTreeMap::new();

        for mapping in &input.template.variable_mappings {
            match mapping.slot.parse::<SlotKey>() {
                Ok(key) => {
                    mapped.insert(key, mapping);
                }
                Err(_) => issues.push(ResolveIssue::UnknownSlot {
                    slot: mapping.slot.clone(),
                }),
            }
        }

        // Expected slots plus any mapped slot the template lacks.
        let mut produced: BTreeMap<Section, BTreeSet<usize>> = BTreeMap::new();
        for slot in schema.slots().into_iter().chain(mapped.keys().copied()) {
            produced.entry(slot.section).or_default().insert(slot.position);
        }
        for key in mapped.keys().filter(|k| !schema.contains(**k)) {
            issues.push(ResolveIssue::UnknownSlot {
                slot: key.to_string(),
            });
        }

        let mut parameters = TemplateParameters::default();
        let mut slots = Vec::new();
        for (section, positions) in &produced {
            let expected = schema.expected_count(*section);
            if positions.len() != expected {
                issues.push(ResolveIssue::CountMismatch {
                    section: section.to_string(),
                    expected,
                    actual: positions.len(),
                });
            }

            let mut values = Vec::with_capacity(positions.len());
            for position in positions {
                let key = SlotKey::new(*section, *position);
                let diagnostic = self.resolve_slot(key, mapped.get(&key).copied(), input);
                if diagnostic.value.is_empty()
                    && mapped.get(&key).is_some_and(|m| m.required)
                {
                    issues.push(ResolveIssue::MissingRequired {
                        slot: key.to_string(),
                    });
                }
                values.push(diagnostic.value.clone());
                slots.push(diagnostic);
            }

            match section {
                Section::Header => parameters.header = values,
                Section::Body => parameters.body = values,
                Section::Button { index } => parameters.buttons.push(ButtonParameters {
                    index: *index,
                    values,
                }),
            }
        }

        if let Some(kind) = media_kind(schema.header_format) {
            let link = input
                .variable(HEADER_MEDIA_VARIABLE)
                .or_else(|| normalize(input.template.header_media_url.as_deref()));
            match link {
                Some(link) => parameters.header_media = Some(HeaderMedia { kind, link }),
                None => issues.push(ResolveIssue::MissingHeaderMedia),
            }
        }

        Resolution {
            parameters,
            slots,
            issues,
        }
    }

    fn resolve_slot(
        &self,
        key: SlotKey,
        mapping: Option<&VariableMapping>,
        input: &ResolveInput<'_>,
    ) -> SlotDiagnostic {
        let Some(mapping) = mapping else {
            let value = if key == SlotKey::new(Section::Body, 1) {
                first_name(input.contact).unwrap_or_else(|| self.default_greeting.clone())
            } else {
                String::new()
            };
            return SlotDiagnostic {
                slot: key.to_string(),
                raw: None,
                value,
                used_fallback: true,
            };
        };

        let raw = match &mapping.source {
            MappingSource::ContactField { field } => contact_field(input.contact, field),
            MappingSource::FixedValue { value } => normalize(Some(value)),
            MappingSource::Variable { key } => input.variable(key),
        };
        let (value, used_fallback) = match &raw {
            Some(value) => (value.clone(), false),
            None => (
                normalize(mapping.fallback.as_deref()).unwrap_or_default(),
                true,
            ),
        };
        SlotDiagnostic {
            slot: key.to_string(),
            raw,
            value,
            used_fallback,
        }
    }
}

fn media_kind(format: HeaderFormat) -> Option<MediaKind> {
    match format {
        HeaderFormat::Text => None,
        HeaderFormat::Image => Some(MediaKind::Image),
        HeaderFormat::Video => Some(MediaKind::Video),
        HeaderFormat::Document => Some(MediaKind::Document),
    }
}

/// Trims; blank counts as missing.
pub fn normalize(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// First whitespace-delimited token of the contact name with its first
/// letter uppercased. The rest of the token keeps its casing.
pub fn first_name(contact: &Contact) -> Option<String> {
    let token = contact.name.as_deref()?.split_whitespace().next()?;
    let mut chars = token.chars();
    let first = chars.next()?;
    Some(first.to_uppercase().chain(chars).collect())
}

/// Looks up a contact field or metadata key.
pub fn contact_field(contact: &Contact, field: &str) -> Option<String> {
    match field {
        "first_name" => first_name(contact),
        "name" => normalize(contact.name.as_deref()),
        "phone" => normalize(Some(&contact.phone)),
        "email" => normalize(contact.email.as_deref()),
        key => match contact.metadata.get(key)? {
            Value::Null => None,
            Value::String(s) => normalize(Some(s)),
            other => normalize(Some(&other.to_string())),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_core::template::{ButtonKind, TemplateButton, TemplateComponent};
    use zapflow_core::types::TemplateStatus;

    fn contact(name: Option<&str>) -> Contact {
        let mut metadata = BTreeMap::new();
        metadata.insert("city".to_string(), Value::String(" Campinas ".to_string()));
        metadata.insert("points".to_string(), serde_json::json!(120));
        Contact {
            id: "contact-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            phone: "5511987654321".to_string(),
            name: name.map(str::to_string),
            email: None,
            metadata,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn template(components: Vec<TemplateComponent>, mappings: Vec<VariableMapping>) -> TemplateRecord {
        TemplateRecord {
            id: "tpl-1".to_string(),
            tenant_id: "tenant-1".to_string(),
            name: "promo".to_string(),
            language: "pt_BR".to_string(),
            status: TemplateStatus::Approved,
            components,
            variable_mappings: mappings,
            header_media_url: None,
            created_at: "2026-01-01T00:00:00.000Z".to_string(),
        }
    }

    fn body(text: &str) -> TemplateComponent {
        TemplateComponent::Body {
            text: text.to_string(),
        }
    }

    fn mapping(slot: &str, source: MappingSource, fallback: Option<&str>) -> VariableMapping {
        VariableMapping {
            slot: slot.to_string(),
            source,
            fallback: fallback.map(str::to_string),
            required: false,
        }
    }

    fn resolve(tpl: &TemplateRecord, contact: &Contact, campaign: &[(&str, &str)], recipient: &[(&str, &str)]) -> Resolution {
        let to_map = |pairs: &[(&str, &str)]| {
            pairs
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect::<BTreeMap<_, _>>()
        };
        let campaign = to_map(campaign);
        let recipient = to_map(recipient);
        Resolver::new("Cliente").resolve(&ResolveInput {
            template: tpl,
            contact,
            campaign_variables: &campaign,
            recipient_variables: &recipient,
        })
    }

    #[test]
    fn first_name_capitalizes_first_token() {
        assert_eq!(first_name(&contact(Some("  maria da silva"))).as_deref(), Some("Maria"));
        assert_eq!(first_name(&contact(Some("McDonald Jr"))).as_deref(), Some("McDonald"));
        assert_eq!(first_name(&contact(Some("ÉMILE"))).as_deref(), Some("ÉMILE"));
        assert_eq!(first_name(&contact(Some("   "))), None);
        assert_eq!(first_name(&contact(None)), None);
    }

    #[test]
    fn body_one_defaults_to_first_name_then_greeting() {
        let tpl = template(vec![body("Olá {{1}}!")], vec![]);
        let named = resolve(&tpl, &contact(Some("joão pedro")), &[], &[]);
        assert!(named.success());
        assert_eq!(named.parameters.body, vec!["João"]);
        assert!(named.used_fallback());

        let anonymous = resolve(&tpl, &contact(None), &[], &[]);
        assert_eq!(anonymous.parameters.body, vec!["Cliente"]);
    }

    #[test]
    fn unmapped_positions_beyond_first_are_empty() {
        let tpl = template(vec![body("{{1}} {{2}}")], vec![]);
        let res = resolve(&tpl, &contact(Some("Ana")), &[], &[]);
        assert!(res.success());
        assert_eq!(res.parameters.body, vec!["Ana", ""]);
    }

    #[test]
    fn recipient_overrides_campaign_variables() {
        let tpl = template(
            vec![body("{{1}} use {{2}}")],
            vec![
                mapping("body.1", MappingSource::ContactField { field: "city".into() }, None),
                mapping("body.2", MappingSource::Variable { key: "coupon".into() }, Some("BEMVINDO")),
            ],
        );
        let c = contact(Some("Ana"));
        let both = resolve(&tpl, &c, &[("coupon", "CAMP10")], &[("coupon", "VIP20")]);
        assert_eq!(both.parameters.body, vec!["Campinas", "VIP20"]);

        let campaign_only = resolve(&tpl, &c, &[("coupon", "CAMP10")], &[("coupon", "  ")]);
        assert_eq!(campaign_only.parameters.body[1], "CAMP10");

        let neither = resolve(&tpl, &c, &[], &[]);
        assert_eq!(neither.parameters.body[1], "BEMVINDO");
        assert!(neither.slots[1].used_fallback);
        assert_eq!(neither.slots[1].raw, None);
    }

    #[test]
    fn metadata_values_are_stringified() {
        let tpl = template(
            vec![body("{{1}}")],
            vec![mapping("body.1", MappingSource::ContactField { field: "points".into() }, None)],
        );
        let res = resolve(&tpl, &contact(None), &[], &[]);
        assert_eq!(res.parameters.body, vec!["120"]);
    }

    #[test]
    fn stale_mapping_is_a_count_mismatch() {
        let tpl = template(
            vec![body("Olá {{1}}")],
            vec![
                mapping("body.1", MappingSource::FixedValue { value: "Ana".into() }, None),
                mapping("body.2", MappingSource::FixedValue { value: "extra".into() }, None),
            ],
        );
        let res = resolve(&tpl, &contact(None), &[], &[]);
        assert!(!res.success());
        assert!(res.issues.contains(&ResolveIssue::CountMismatch {
            section: "body".into(),
            expected: 1,
            actual: 2
        }));
        let err = res.error().unwrap();
        assert_eq!(err.category, ErrorCategory::TemplateError);
        assert_eq!(err.code, codes::PARAM_COUNT_MISMATCH);
        assert!(!err.retryable);
    }

    #[test]
    fn required_slot_without_value_fails() {
        let mut required = mapping("body.1", MappingSource::Variable { key: "code".into() }, None);
        required.required = true;
        let tpl = template(vec![body("Código {{1}}")], vec![required]);
        let res = resolve(&tpl, &contact(Some("Ana")), &[], &[]);
        assert_eq!(res.error().unwrap().code, codes::MISSING_REQUIRED_VARIABLE);
    }

    #[test]
    fn media_header_and_url_button() {
        let tpl = template(
            vec![
                TemplateComponent::Header {
                    format: HeaderFormat::Image,
                    text: None,
                },
                body("Oi {{1}}"),
                TemplateComponent::Buttons {
                    buttons: vec![TemplateButton {
                        kind: ButtonKind::Url,
                        text: "Ver".into(),
                        url: Some("https://loja.test/{{1}}".into()),
                    }],
                },
            ],
            vec![mapping("button.0.1", MappingSource::Variable { key: "slug".into() }, None)],
        );
        let missing = resolve(&tpl, &contact(Some("Ana")), &[("slug", "abc")], &[]);
        assert_eq!(missing.issues, vec![ResolveIssue::MissingHeaderMedia]);

        let res = resolve(
            &tpl,
            &contact(Some("Ana")),
            &[("slug", "abc"), (HEADER_MEDIA_VARIABLE, "https://cdn.test/a.png")],
            &[],
        );
        assert!(res.success());
        assert_eq!(res.parameters.header_media.unwrap().link, "https://cdn.test/a.png");
        assert_eq!(res.parameters.buttons, vec![ButtonParameters { index: 0, values: vec!["abc".into()] }]);
    }

    proptest::proptest! {
        #[test]
        fn produces_exactly_one_value_per_body_placeholder(n in 1usize..12) {
            let text: String = (1..=n).map(|i| format!("{{{{{i}}}}} ")).collect();
            let tpl = template(vec![body(&text)], vec![]);
            let res = resolve(&tpl, &contact(Some("Ana")), &[], &[]);
            proptest::prop_assert!(res.success());
            proptest::prop_assert_eq!(res.parameters.body.len(), n);
        }
    }
}
