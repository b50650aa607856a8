// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `zapflow process` command implementation.

use zapflow_campaign::BatchError;
use zapflow_config::ZapflowConfig;
use zapflow_core::ZapflowError;
use zapflow_core::types::SpeedTier;

use crate::app::Components;

/// Runs one batch of `campaign_id` and prints the report as JSON on stdout.
pub async fn run_process(
    config: ZapflowConfig,
    campaign_id: &str,
    speed: Option<SpeedTier>,
) -> Result<(), ZapflowError> {
    let components = Components::build(&config).await?;
    let outcome = components.processor.process(campaign_id, speed).await;
    components.close().await?;

    let report = outcome.map_err(|e| match e {
        BatchError::Storage(e) => e,
        other => ZapflowError::Validation(format!("{}: {other}", other.code())),
    })?;
    let json = serde_json::to_string_pretty(&report)
        .map_err(|e| ZapflowError::Internal(format!("failed to encode report: {e}")))?;
    println!("{json}");
    Ok(())
}
