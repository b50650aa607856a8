// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Query modules for CRUD operations on storage entities.

pub mod campaigns;
pub mod channels;
pub mod contacts;
pub mod conversations;
pub mod messages;
pub mod recipients;
pub mod templates;
pub mod webhook_events;

#[cfg(test)]
pub(crate) mod fixtures {
    use std::collections::BTreeMap;

    use tempfile::{TempDir, tempdir};
    use zapflow_core::template::TemplateComponent;
    use zapflow_core::types::{
        Campaign, CampaignCounters, CampaignRecipient, CampaignStatus, Channel,
        ChannelProviderConfig, ChannelStatus, Contact, DeliveryStatus, TemplateRecord,
        TemplateStatus,
    };

    use crate::database::Database;

    const T0: &str = "2026-01-01T00:00:00.000Z";

    pub(crate) async fn setup_db() -> (Database, TempDir) {
        let dir = tempdir().unwrap();
        let db_path = dir.path().join("test.db");
        let db = Database::open(db_path.to_str().unwrap()).await.unwrap();
        (db, dir)
    }

    /// Channel `ch-1`, template `tpl-1`, queued campaign `camp-1`, and `n`
    /// contacts `contact-i` each with a queued recipient `rcpt-i`.
    pub(crate) async fn seed_basic(db: &Database, n: usize) {
        super::channels::insert_channel(
            db,
            &Channel {
                id: "ch-1".to_string(),
                tenant_id: "tenant-1".to_string(),
                name: "Main line".to_string(),
                provider: "whatsapp_cloud".to_string(),
                status: ChannelStatus::Connected,
                config: ChannelProviderConfig {
                    base_url: "https://graph.example.test/v21.0".to_string(),
                    auth_token: Some("token".to_string()),
                    phone_number_id: Some("1234".to_string()),
                    ..Default::default()
                },
                blocked_by_provider: false,
                blocked_reason: None,
                blocked_code: None,
                blocked_at: None,
                created_at: T0.to_string(),
                updated_at: T0.to_string(),
            },
        )
        .await
        .unwrap();

        super::templates::insert_template(
            db,
            &TemplateRecord {
                id: "tpl-1".to_string(),
                tenant_id: "tenant-1".to_string(),
                name: "welcome".to_string(),
                language: "pt_BR".to_string(),
                status: TemplateStatus::Approved,
                components: vec![TemplateComponent::Body {
                    text: "Olá {{1}}".to_string(),
                }],
                variable_mappings: Vec::new(),
                header_media_url: None,
                created_at: T0.to_string(),
            },
        )
        .await
        .unwrap();

        super::campaigns::insert_campaign(
            db,
            &Campaign {
                id: "camp-1".to_string(),
                tenant_id: "tenant-1".to_string(),
                channel_id: "ch-1".to_string(),
                template_id: "tpl-1".to_string(),
                name: "Launch".to_string(),
                status: CampaignStatus::Queued,
                counters: CampaignCounters::default(),
                variables: BTreeMap::new(),
                paused_reason: None,
                started_at: None,
                completed_at: None,
                created_at: T0.to_string(),
                updated_at: T0.to_string(),
            },
        )
        .await
        .unwrap();

        for i in 0..n {
            super::contacts::insert_contact(
                db,
                &Contact {
                    id: format!("contact-{i}"),
                    tenant_id: "tenant-1".to_string(),
                    phone: format!("55119876543{i:02}"),
                    name: Some(format!("maria {i}")),
                    email: None,
                    metadata: BTreeMap::new(),
                    created_at: T0.to_string(),
                },
            )
            .await
            .unwrap();
            let created = format!("2026-01-01T00:00:00.{i:03}Z");
            super::recipients::insert_recipient(
                db,
                &CampaignRecipient {
                    id: format!("rcpt-{i}"),
                    campaign_id: "camp-1".to_string(),
                    contact_id: format!("contact-{i}"),
                    status: DeliveryStatus::Queued,
                    attempts: 0,
                    last_error_code: None,
                    last_error: None,
                    next_retry_at: None,
                    provider_message_id: None,
                    correlation_id: None,
                    variables: BTreeMap::new(),
                    sent_at: None,
                    delivered_at: None,
                    read_at: None,
                    created_at: created.clone(),
                    updated_at: created,
                },
            )
            .await
            .unwrap();
        }
    }
}
