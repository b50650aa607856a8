// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test harness with a temp SQLite database and a seeded campaign.
//!
//! The default seed is a connected channel `ch-1` backed by [`MockProvider`],
//! an approved template `tpl-1` with body `Olá {{1}}`, a queued campaign
//! `camp-1`, and N contacts `contact-i` (`maria i`) with queued recipients
//! `rcpt-i` created in index order.

use std::collections::BTreeMap;
use std::sync::Arc;

use zapflow_config::ZapflowConfig;
use zapflow_config::model::StorageConfig;
use zapflow_core::template::{TemplateComponent, VariableMapping};
use zapflow_core::types::{
    Campaign, CampaignCounters, CampaignRecipient, CampaignStatus, Channel, ChannelProviderConfig,
    ChannelStatus, Contact, DeliveryStatus, TemplateRecord, TemplateStatus,
};
use zapflow_core::{ProviderRegistry, StorageAdapter, ZapflowError};
use zapflow_storage::queries::{campaigns, channels, contacts, recipients, templates};
use zapflow_storage::{Database, SqliteStorage};

use crate::mock_provider::{MOCK_PROVIDER_NAME, MockProvider};

pub const TENANT_ID: &str = "tenant-1";
pub const CHANNEL_ID: &str = "ch-1";
pub const TEMPLATE_ID: &str = "tpl-1";
pub const CAMPAIGN_ID: &str = "camp-1";

const T0: &str = "2026-01-01T00:00:00.000Z";

/// Builder for creating test environments with configurable options.
pub struct TestHarnessBuilder {
    recipients: usize,
    channel_status: ChannelStatus,
    channel_config: ChannelProviderConfig,
    template_status: TemplateStatus,
    components: Vec<TemplateComponent>,
    mappings: Vec<VariableMapping>,
    campaign_status: CampaignStatus,
    campaign_variables: BTreeMap<String, String>,
    config: ZapflowConfig,
    provider: MockProvider,
}

impl TestHarnessBuilder {
    fn new() -> Self {
        let mut config = ZapflowConfig::default();
        for tier in [
            &mut config.campaign.speed.slow,
            &mut config.campaign.speed.normal,
            &mut config.campaign.speed.fast,
        ] {
            tier.delay_ms = 0;
        }
        config.campaign.backoff_base_ms = 5;
        config.campaign.backoff_cap_ms = 50;
        Self {
            recipients: 0,
            channel_status: ChannelStatus::Connected,
            channel_config: ChannelProviderConfig {
                base_url: "https://graph.example.test/v21.0".to_string(),
                auth_token: Some("test-token".to_string()),
                phone_number_id: Some("PNID".to_string()),
                ..Default::default()
            },
            template_status: TemplateStatus::Approved,
            components: vec![TemplateComponent::Body {
                text: "Olá {{1}}".to_string(),
            }],
            mappings: Vec::new(),
            campaign_status: CampaignStatus::Queued,
            campaign_variables: BTreeMap::new(),
            config,
            provider: MockProvider::new(),
        }
    }

    /// Number of seeded contacts and queued recipients.
    pub fn with_recipients(mut self, n: usize) -> Self {
        self.recipients = n;
        self
    }

    pub fn with_channel_status(mut self, status: ChannelStatus) -> Self {
        self.channel_status = status;
        self
    }

    pub fn with_channel_config(mut self, config: ChannelProviderConfig) -> Self {
        self.channel_config = config;
        self
    }

    pub fn with_template_status(mut self, status: TemplateStatus) -> Self {
        self.template_status = status;
        self
    }

    pub fn with_template(
        mut self,
        components: Vec<TemplateComponent>,
        mappings: Vec<VariableMapping>,
    ) -> Self {
        self.components = components;
        self.mappings = mappings;
        self
    }

    pub fn with_campaign_status(mut self, status: CampaignStatus) -> Self {
        self.campaign_status = status;
        self
    }

    pub fn with_campaign_variable(mut self, key: &str, value: &str) -> Self {
        self.campaign_variables.insert(key.to_string(), value.to_string());
        self
    }

    /// Replace the whole config; speed delays are not zeroed afterwards.
    pub fn with_config(mut self, config: ZapflowConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_provider(mut self, provider: MockProvider) -> Self {
        self.provider = provider;
        self
    }

    /// Build the harness, creating and seeding the temp database.
    pub async fn build(self) -> Result<TestHarness, ZapflowError> {
        let temp_dir = tempfile::TempDir::new().map_err(ZapflowError::storage)?;
        let db_path = temp_dir.path().join("test.db");

        let mut config = self.config;
        config.storage = StorageConfig {
            database_path: db_path.to_string_lossy().into_owned(),
            wal_mode: true,
        };
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage = Arc::new(storage);
        let db = storage.db()?;

        channels::insert_channel(
            db,
            &Channel {
                id: CHANNEL_ID.to_string(),
                tenant_id: TENANT_ID.to_string(),
                name: "Main line".to_string(),
                provider: MOCK_PROVIDER_NAME.to_string(),
                status: self.channel_status,
                config: self.channel_config,
                blocked_by_provider: false,
                blocked_reason: None,
                blocked_code: None,
                blocked_at: None,
                created_at: T0.to_string(),
                updated_at: T0.to_string(),
            },
        )
        .await?;

        templates::insert_template(
            db,
            &TemplateRecord {
                id: TEMPLATE_ID.to_string(),
                tenant_id: TENANT_ID.to_string(),
                name: "welcome".to_string(),
                language: "pt_BR".to_string(),
                status: self.template_status,
                components: self.components,
                variable_mappings: self.mappings,
                header_media_url: None,
                created_at: T0.to_string(),
            },
        )
        .await?;

        campaigns::insert_campaign(
            db,
            &Campaign {
                id: CAMPAIGN_ID.to_string(),
                tenant_id: TENANT_ID.to_string(),
                channel_id: CHANNEL_ID.to_string(),
                template_id: TEMPLATE_ID.to_string(),
                name: "Launch".to_string(),
                status: self.campaign_status,
                counters: CampaignCounters {
                    queued: self.recipients as i64,
                    ..Default::default()
                },
                variables: self.campaign_variables,
                paused_reason: None,
                started_at: None,
                completed_at: None,
                created_at: T0.to_string(),
                updated_at: T0.to_string(),
            },
        )
        .await?;

        let harness = TestHarness {
            provider: Arc::new(self.provider),
            storage,
            config,
            _temp_dir: temp_dir,
        };
        for i in 0..self.recipients {
            harness
                .add_recipient(i, Some(&format!("maria {i}")), BTreeMap::new())
                .await?;
        }
        Ok(harness)
    }
}

/// A seeded temp database with a mock provider.
pub struct TestHarness {
    pub provider: Arc<MockProvider>,
    pub storage: Arc<SqliteStorage>,
    pub config: ZapflowConfig,
    _temp_dir: tempfile::TempDir,
}

impl TestHarness {
    pub fn builder() -> TestHarnessBuilder {
        TestHarnessBuilder::new()
    }

    /// Storage as the trait object the engine consumes.
    pub fn storage(&self) -> Arc<dyn StorageAdapter + Send + Sync> {
        self.storage.clone()
    }

    /// Registry with the mock provider under its channel name.
    pub fn registry(&self) -> ProviderRegistry {
        ProviderRegistry::new().with(self.provider.clone())
    }

    pub fn db(&self) -> &Database {
        self.storage.db().expect("harness storage is initialized")
    }

    /// Phone of the i-th seeded contact.
    pub fn phone(i: usize) -> String {
        format!("55119876543{i:02}")
    }

    /// Seed contact `contact-i` with a queued recipient `rcpt-i`.
    pub async fn add_recipient(
        &self,
        i: usize,
        name: Option<&str>,
        variables: BTreeMap<String, String>,
    ) -> Result<(), ZapflowError> {
        contacts::insert_contact(
            self.db(),
            &Contact {
                id: format!("contact-{i}"),
                tenant_id: TENANT_ID.to_string(),
                phone: Self::phone(i),
                name: name.map(str::to_string),
                email: None,
                metadata: BTreeMap::new(),
                created_at: T0.to_string(),
            },
        )
        .await?;
        let created = format!("2026-01-01T00:00:00.{i:03}Z");
        recipients::insert_recipient(
            self.db(),
            &CampaignRecipient {
                id: format!("rcpt-{i}"),
                campaign_id: CAMPAIGN_ID.to_string(),
                contact_id: format!("contact-{i}"),
                status: DeliveryStatus::Queued,
                attempts: 0,
                last_error_code: None,
                last_error: None,
                next_retry_at: None,
                provider_message_id: None,
                correlation_id: None,
                variables,
                sent_at: None,
                delivered_at: None,
                read_at: None,
                created_at: created.clone(),
                updated_at: created,
            },
        )
        .await
    }

    pub async fn recipient(&self, i: usize) -> CampaignRecipient {
        recipients::get_recipient(self.db(), &format!("rcpt-{i}"))
            .await
            .expect("recipient query")
            .expect("recipient exists")
    }

    pub async fn campaign(&self) -> Campaign {
        campaigns::get_campaign(self.db(), CAMPAIGN_ID)
            .await
            .expect("campaign query")
            .expect("campaign exists")
    }

    pub async fn channel(&self) -> Channel {
        channels::get_channel(self.db(), CHANNEL_ID)
            .await
            .expect("channel query")
            .expect("channel exists")
    }
}
