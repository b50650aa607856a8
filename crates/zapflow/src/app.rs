// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Wiring shared by `serve` and `process`.

use std::sync::Arc;
use std::time::Duration;

use tracing::info;
use zapflow_campaign::BatchProcessor;
use zapflow_config::ZapflowConfig;
use zapflow_core::{ProviderRegistry, StorageAdapter, ZapflowError};
use zapflow_inbox::Inbox;
use zapflow_storage::SqliteStorage;
use zapflow_template::Resolver;
use zapflow_webhook::WebhookIngestor;
use zapflow_whatsapp::WhatsAppCloudProvider;

/// Initialized runtime components.
pub struct Components {
    pub storage: Arc<dyn StorageAdapter + Send + Sync>,
    pub processor: BatchProcessor,
    pub ingestor: WebhookIngestor,
}

impl Components {
    /// Opens storage, registers the compiled-in providers and builds the
    /// batch processor and webhook ingestor on top of them.
    pub async fn build(config: &ZapflowConfig) -> Result<Self, ZapflowError> {
        let storage = SqliteStorage::new(config.storage.clone());
        storage.initialize().await?;
        let storage: Arc<dyn StorageAdapter + Send + Sync> = Arc::new(storage);
        info!(path = %config.storage.database_path, "storage initialized");

        let registry = provider_registry(config)?;
        let inbox = Inbox::new(storage.clone(), &config.inbox);
        let resolver = Resolver::new(config.template.default_greeting.clone());

        let processor = BatchProcessor::new(
            storage.clone(),
            registry.clone(),
            inbox.clone(),
            resolver,
            config.campaign.clone(),
        );
        let ingestor = WebhookIngestor::new(storage.clone(), registry, inbox, &config.webhook);

        Ok(Self {
            storage,
            processor,
            ingestor,
        })
    }

    /// Checkpoints and closes storage.
    pub async fn close(&self) -> Result<(), ZapflowError> {
        self.storage.close().await
    }
}

fn provider_registry(config: &ZapflowConfig) -> Result<ProviderRegistry, ZapflowError> {
    let whatsapp = WhatsAppCloudProvider::new()?
        .with_default_timeout(Duration::from_secs(config.campaign.send_timeout_secs));
    let registry = ProviderRegistry::new().with(Arc::new(whatsapp));
    info!(providers = ?registry.names(), "provider registry initialized");
    Ok(registry)
}
