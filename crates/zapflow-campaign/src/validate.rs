// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Dry-run resolution of a campaign's due recipients.

use tracing::debug;
use zapflow_core::StorageAdapter;
use zapflow_core::time::now_ts;
use zapflow_template::{Resolver, ValidationReport, validate_contacts};

use crate::error::BatchError;

/// Resolves every recipient the next invocations would send to, without
/// sending or writing anything.
pub async fn validate_campaign(
    storage: &dyn StorageAdapter,
    resolver: &Resolver,
    campaign_id: &str,
    max_retries: u32,
    limit: usize,
) -> Result<ValidationReport, BatchError> {
    let ctx = storage
        .load_campaign_context(campaign_id)
        .await?
        .ok_or_else(|| BatchError::CampaignNotFound(campaign_id.to_string()))?;
    let due = storage
        .select_due_recipients(campaign_id, &now_ts(), max_retries, limit)
        .await?;
    let report = validate_contacts(resolver, &ctx.template, &ctx.campaign.variables, &due);
    debug!(
        campaign_id,
        total = report.total,
        invalid = report.invalid,
        "campaign validated"
    );
    Ok(report)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_core::template::{MappingSource, TemplateComponent, VariableMapping};
    use zapflow_test_utils::TestHarness;
    use zapflow_test_utils::harness::CAMPAIGN_ID;

    #[tokio::test]
    async fn reports_missing_required_without_sending() {
        let harness = TestHarness::builder()
            .with_template(
                vec![TemplateComponent::Body {
                    text: "Olá {{1}}, seu cupom é {{2}}".to_string(),
                }],
                vec![
                    VariableMapping {
                        slot: "body.1".to_string(),
                        source: MappingSource::ContactField {
                            field: "first_name".to_string(),
                        },
                        fallback: Some("cliente".to_string()),
                        required: false,
                    },
                    VariableMapping {
                        slot: "body.2".to_string(),
                        source: MappingSource::Variable {
                            key: "coupon".to_string(),
                        },
                        fallback: None,
                        required: true,
                    },
                ],
            )
            .with_recipients(2)
            .build()
            .await
            .unwrap();
        let mut vars = std::collections::BTreeMap::new();
        vars.insert("coupon".to_string(), "PROMO10".to_string());
        harness
            .add_recipient(3, Some("Ana Souza"), vars.clone())
            .await
            .unwrap();
        harness.add_recipient(4, None, vars).await.unwrap();

        let resolver = Resolver::new("cliente");
        let report = validate_campaign(harness.storage().as_ref(), &resolver, CAMPAIGN_ID, 3, 100)
            .await
            .unwrap();
        assert_eq!(report.total, 4);
        assert_eq!(report.valid, 1);
        assert_eq!(report.using_fallback, 1);
        assert_eq!(report.invalid, 2);
        assert_eq!(report.contacts[0].recipient_id, "rcpt-0");
        assert!(!report.contacts[0].issues.is_empty());
        assert_eq!(harness.provider.send_count().await, 0);
    }

    #[tokio::test]
    async fn unknown_campaign_is_not_found() {
        let harness = TestHarness::builder().build().await.unwrap();
        let err = validate_campaign(harness.storage().as_ref(), &Resolver::new("x"), "nope", 3, 10)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
