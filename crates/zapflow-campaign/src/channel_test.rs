// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Channel connection test.

use tracing::{info, warn};
use zapflow_core::provider::ConnectionTest;
use zapflow_core::types::ChannelStatus;
use zapflow_core::{ProviderRegistry, StorageAdapter};

use crate::error::BatchError;

/// Asks the channel's provider to verify its credentials and records the
/// outcome as the channel status (`connected` or `error`).
pub async fn test_channel(
    storage: &dyn StorageAdapter,
    registry: &ProviderRegistry,
    channel_id: &str,
) -> Result<ConnectionTest, BatchError> {
    let channel = storage
        .get_channel(channel_id)
        .await?
        .ok_or_else(|| BatchError::ChannelNotFound(channel_id.to_string()))?;
    let provider = registry
        .get(&channel.provider)
        .ok_or_else(|| BatchError::UnknownProvider(channel.provider.clone()))?;

    let result = provider.test_connection(&channel.config).await;
    let status = if result.success {
        info!(channel_id, "channel connection verified");
        ChannelStatus::Connected
    } else {
        warn!(channel_id, error = result.error.as_deref(), "channel connection test failed");
        ChannelStatus::Error
    };
    storage.update_channel_status(channel_id, status).await?;
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_test_utils::TestHarness;
    use zapflow_test_utils::harness::CHANNEL_ID;

    #[tokio::test]
    async fn success_marks_channel_connected() {
        let harness = TestHarness::builder()
            .with_channel_status(ChannelStatus::Disconnected)
            .build()
            .await
            .unwrap();
        let result = test_channel(harness.storage().as_ref(), &harness.registry(), CHANNEL_ID)
            .await
            .unwrap();
        assert!(result.success);
        assert_eq!(harness.channel().await.status, ChannelStatus::Connected);
    }

    #[tokio::test]
    async fn failure_marks_channel_error() {
        let harness = TestHarness::builder().build().await.unwrap();
        harness.provider.set_connection(ConnectionTest {
            success: false,
            error: Some("token expired".to_string()),
            details: None,
        })
        .await;
        let result = test_channel(harness.storage().as_ref(), &harness.registry(), CHANNEL_ID)
            .await
            .unwrap();
        assert!(!result.success);
        assert_eq!(harness.channel().await.status, ChannelStatus::Error);
    }

    #[tokio::test]
    async fn unknown_channel_is_not_found() {
        let harness = TestHarness::builder().build().await.unwrap();
        let err = test_channel(harness.storage().as_ref(), &harness.registry(), "nope")
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }
}
