// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Pre-send validation of a template against a batch of recipients.

use std::collections::BTreeMap;

use serde::Serialize;
use zapflow_core::types::{DueRecipient, TemplateRecord};

use crate::resolver::{ResolveInput, ResolveIssue, Resolver, SlotDiagnostic};

/// Resolution outcome of one recipient.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactReport {
    pub recipient_id: String,
    pub contact_id: String,
    pub phone: String,
    pub valid: bool,
    pub used_fallback: bool,
    pub slots: Vec<SlotDiagnostic>,
    pub issues: Vec<ResolveIssue>,
}

/// Aggregate over a batch: valid, valid-but-using-fallback, invalid.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidationReport {
    pub total: usize,
    pub valid: usize,
    pub using_fallback: usize,
    pub invalid: usize,
    pub contacts: Vec<ContactReport>,
}

/// Resolves every recipient without sending anything.
pub fn validate_contacts(
    resolver: &Resolver,
    template: &TemplateRecord,
    campaign_variables: &BTreeMap<String, String>,
    recipients: &[DueRecipient],
) -> ValidationReport {
    let mut report = ValidationReport::default();
    for due in recipients {
        let resolution = resolver.resolve(&ResolveInput {
            template,
            contact: &due.contact,
            campaign_variables,
            recipient_variables: &due.recipient.variables,
        });
        let valid = resolution.success();
        let used_fallback = resolution.used_fallback();

        report.total += 1;
        if !valid {
            report.invalid += 1;
        } else if used_fallback {
            report.using_fallback += 1;
        } else {
            report.valid += 1;
        }
        report.contacts.push(ContactReport {
            recipient_id: due.recipient.id.clone(),
            contact_id: due.contact.id.clone(),
            phone: due.contact.phone.clone(),
            valid,
            used_fallback,
            slots: resolution.slots,
            issues: resolution.issues,
        });
    }
    report
}
