// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Post-deserialization validation for configuration values.
//!
//! Validates semantic constraints that cannot be expressed via serde attributes,
//! such as non-empty paths, positive batch sizes, and a coherent backoff range.

use std::net::IpAddr;

use crate::diagnostic::ConfigError;
use crate::model::{SpeedTierConfig, ZapflowConfig};

/// Validate a deserialized configuration for semantic correctness.
///
/// Returns `Ok(())` if all validations pass, or `Err(Vec<ConfigError>)` with
/// all collected validation errors (does not fail fast).
pub fn validate_config(config: &ZapflowConfig) -> Result<(), Vec<ConfigError>> {
    let mut errors = Vec::new();
    let mut fail = |message: String| errors.push(ConfigError::Validation { message });

    if config.storage.database_path.trim().is_empty() {
        fail("storage.database_path must not be empty".to_string());
    }

    let host = config.gateway.host.trim();
    if host.is_empty() {
        fail("gateway.host must not be empty".to_string());
    } else if !is_loopback(host) && config.gateway.bearer_token.as_deref().is_none_or(str::is_empty)
    {
        fail(format!(
            "gateway.bearer_token is required when gateway.host `{host}` is not a loopback address"
        ));
    }

    let campaign = &config.campaign;
    if campaign.max_retries < 1 {
        fail("campaign.max_retries must be at least 1".to_string());
    }
    if campaign.execution_budget_secs == 0 {
        fail("campaign.execution_budget_secs must be positive".to_string());
    }
    if campaign.status_check_interval == 0 {
        fail("campaign.status_check_interval must be positive".to_string());
    }
    if campaign.send_timeout_secs == 0 {
        fail("campaign.send_timeout_secs must be positive".to_string());
    }
    if !(0.0..=1.0).contains(&campaign.backoff_jitter) {
        fail(format!(
            "campaign.backoff_jitter must be between 0.0 and 1.0, got {}",
            campaign.backoff_jitter
        ));
    }
    if campaign.backoff_base_ms > campaign.backoff_cap_ms {
        fail(format!(
            "campaign.backoff_base_ms ({}) must not exceed campaign.backoff_cap_ms ({})",
            campaign.backoff_base_ms, campaign.backoff_cap_ms
        ));
    }

    let tiers: [(&str, SpeedTierConfig); 3] = [
        ("slow", campaign.speed.slow),
        ("normal", campaign.speed.normal),
        ("fast", campaign.speed.fast),
    ];
    for (name, tier) in tiers {
        if tier.batch_size == 0 {
            fail(format!("campaign.speed.{name}.batch_size must be positive"));
        }
    }

    if config.inbox.messaging_window_hours == 0 {
        fail("inbox.messaging_window_hours must be positive".to_string());
    }

    if config.scheduler.enabled {
        if config.scheduler.interval_secs == 0 {
            fail("scheduler.interval_secs must be positive".to_string());
        }
        if config.scheduler.max_concurrent == 0 {
            fail("scheduler.max_concurrent must be positive".to_string());
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_loopback(host: &str) -> bool {
    host.eq_ignore_ascii_case("localhost")
        || host.parse::<IpAddr>().is_ok_and(|ip| ip.is_loopback())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn has_error(errors: &[ConfigError], needle: &str) -> bool {
        errors
            .iter()
            .any(|e| matches!(e, ConfigError::Validation { message } if message.contains(needle)))
    }

    #[test]
    fn default_config_validates() {
        let config = ZapflowConfig::default();
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn empty_database_path_fails_validation() {
        let mut config = ZapflowConfig::default();
        config.storage.database_path = "".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "database_path"));
    }

    #[test]
    fn public_bind_requires_bearer_token() {
        let mut config = ZapflowConfig::default();
        config.gateway.host = "0.0.0.0".to_string();
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "bearer_token"));

        config.gateway.bearer_token = Some("secret".to_string());
        assert!(validate_config(&config).is_ok());
    }

    #[test]
    fn inverted_backoff_range_fails() {
        let mut config = ZapflowConfig::default();
        config.campaign.backoff_base_ms = 10_000;
        config.campaign.backoff_cap_ms = 1_000;
        config.campaign.backoff_jitter = 1.5;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "backoff_base_ms"));
        assert!(has_error(&errors, "backoff_jitter"));
        assert_eq!(errors.len(), 2, "all errors are collected");
    }

    #[test]
    fn zero_batch_size_fails() {
        let mut config = ZapflowConfig::default();
        config.campaign.speed.fast.batch_size = 0;
        config.campaign.max_retries = 0;
        let errors = validate_config(&config).unwrap_err();
        assert!(has_error(&errors, "campaign.speed.fast.batch_size"));
        assert!(has_error(&errors, "max_retries"));
    }
}
