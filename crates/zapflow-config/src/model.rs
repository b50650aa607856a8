// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration model structs for the Zapflow campaign engine.
//!
//! All structs use `#[serde(deny_unknown_fields)]` to reject unrecognized
//! config keys at startup, providing actionable error messages.

use serde::{Deserialize, Serialize};
use zapflow_core::types::SpeedTier;

/// Top-level Zapflow configuration.
///
/// Loaded from TOML files following XDG hierarchy, with environment variable overrides.
/// All sections are optional and default to sensible values.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ZapflowConfig {
    /// Service identity and logging.
    #[serde(default)]
    pub service: ServiceConfig,

    /// Storage backend settings.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP gateway settings.
    #[serde(default)]
    pub gateway: GatewayConfig,

    /// Batch processor pacing, retry, and budget settings.
    #[serde(default)]
    pub campaign: CampaignConfig,

    /// Template resolution settings.
    #[serde(default)]
    pub template: TemplateConfig,

    /// Webhook ingestion settings.
    #[serde(default)]
    pub webhook: WebhookConfig,

    /// Inbox settings.
    #[serde(default)]
    pub inbox: InboxConfig,

    /// In-process campaign scheduler.
    #[serde(default)]
    pub scheduler: SchedulerConfig,
}

/// Service identity configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct ServiceConfig {
    #[serde(default = "default_service_name")]
    pub name: String,

    /// Logging level (trace, debug, info, warn, error).
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

impl Default for ServiceConfig {
    fn default() -> Self {
        Self {
            name: default_service_name(),
            log_level: default_log_level(),
        }
    }
}

fn default_service_name() -> String {
    "zapflow".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct StorageConfig {
    /// Path to the SQLite database file.
    #[serde(default = "default_database_path")]
    pub database_path: String,

    /// Enable WAL (Write-Ahead Logging) mode for SQLite.
    #[serde(default = "default_wal_mode")]
    pub wal_mode: bool,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            database_path: default_database_path(),
            wal_mode: default_wal_mode(),
        }
    }
}

fn default_database_path() -> String {
    dirs::data_dir()
        .map(|p| p.join("zapflow").join("zapflow.db"))
        .unwrap_or_else(|| std::path::PathBuf::from("zapflow.db"))
        .to_string_lossy()
        .into_owned()
}

fn default_wal_mode() -> bool {
    true
}

/// HTTP gateway configuration.
#[derive(Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Address to bind the server to.
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Bearer token required on `/v1` routes. Webhooks authenticate by signature.
    #[serde(default)]
    pub bearer_token: Option<String>,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            bearer_token: None,
        }
    }
}

impl std::fmt::Debug for GatewayConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field(
                "bearer_token",
                &self.bearer_token.as_ref().map(|_| "[redacted]"),
            )
            .finish()
    }
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

/// Batch size and pacing for one speed tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedTierConfig {
    /// Maximum recipients selected per invocation.
    pub batch_size: usize,

    /// Delay between consecutive sends in milliseconds.
    pub delay_ms: u64,
}

/// The three caller-selectable speed tiers.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SpeedConfig {
    #[serde(default = "default_slow")]
    pub slow: SpeedTierConfig,

    #[serde(default = "default_normal")]
    pub normal: SpeedTierConfig,

    #[serde(default = "default_fast")]
    pub fast: SpeedTierConfig,
}

impl Default for SpeedConfig {
    fn default() -> Self {
        Self {
            slow: default_slow(),
            normal: default_normal(),
            fast: default_fast(),
        }
    }
}

fn default_slow() -> SpeedTierConfig {
    SpeedTierConfig {
        batch_size: 10,
        delay_ms: 3000,
    }
}

fn default_normal() -> SpeedTierConfig {
    SpeedTierConfig {
        batch_size: 30,
        delay_ms: 1000,
    }
}

fn default_fast() -> SpeedTierConfig {
    SpeedTierConfig {
        batch_size: 60,
        delay_ms: 250,
    }
}

/// Campaign batch processor configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct CampaignConfig {
    /// Attempts allowed per recipient before a failure becomes permanent.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Wall-clock budget of one invocation in seconds.
    #[serde(default = "default_execution_budget_secs")]
    pub execution_budget_secs: u64,

    /// Re-check the campaign status every N recipients.
    #[serde(default = "default_status_check_interval")]
    pub status_check_interval: usize,

    /// Backoff delay for the first retry in milliseconds.
    #[serde(default = "default_backoff_base_ms")]
    pub backoff_base_ms: u64,

    /// Upper bound of the unjittered backoff in milliseconds.
    #[serde(default = "default_backoff_cap_ms")]
    pub backoff_cap_ms: u64,

    /// Maximum random jitter as a fraction of the delay (0.0-1.0).
    #[serde(default = "default_backoff_jitter")]
    pub backoff_jitter: f64,

    /// Hard timeout around each provider call in seconds.
    #[serde(default = "default_send_timeout_secs")]
    pub send_timeout_secs: u64,

    /// Tier used when the caller does not pick one.
    #[serde(default)]
    pub default_speed: SpeedTier,

    #[serde(default)]
    pub speed: SpeedConfig,
}

impl CampaignConfig {
    /// Batch size and delay for a speed tier.
    pub fn tier(&self, speed: SpeedTier) -> SpeedTierConfig {
        match speed {
            SpeedTier::Slow => self.speed.slow,
            SpeedTier::Normal => self.speed.normal,
            SpeedTier::Fast => self.speed.fast,
        }
    }
}

impl Default for CampaignConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            execution_budget_secs: default_execution_budget_secs(),
            status_check_interval: default_status_check_interval(),
            backoff_base_ms: default_backoff_base_ms(),
            backoff_cap_ms: default_backoff_cap_ms(),
            backoff_jitter: default_backoff_jitter(),
            send_timeout_secs: default_send_timeout_secs(),
            default_speed: SpeedTier::default(),
            speed: SpeedConfig::default(),
        }
    }
}

fn default_max_retries() -> u32 {
    3
}

fn default_execution_budget_secs() -> u64 {
    50
}

fn default_status_check_interval() -> usize {
    10
}

fn default_backoff_base_ms() -> u64 {
    2000
}

fn default_backoff_cap_ms() -> u64 {
    300_000
}

fn default_backoff_jitter() -> f64 {
    0.3
}

fn default_send_timeout_secs() -> u64 {
    30
}

/// Template resolution configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct TemplateConfig {
    /// Body position 1 value when no mapping exists and the contact has no name.
    #[serde(default = "default_greeting")]
    pub default_greeting: String,
}

impl Default for TemplateConfig {
    fn default() -> Self {
        Self {
            default_greeting: default_greeting(),
        }
    }
}

fn default_greeting() -> String {
    "Cliente".to_string()
}

/// Webhook ingestion configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct WebhookConfig {
    /// Reject webhooks for channels that have no signing secret.
    ///
    /// When `false`, such webhooks are accepted unsigned and a warning is logged.
    #[serde(default)]
    pub require_secret: bool,
}

/// Inbox configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct InboxConfig {
    /// Free-form replies are allowed this long after the last inbound message.
    #[serde(default = "default_messaging_window_hours")]
    pub messaging_window_hours: u32,
}

impl Default for InboxConfig {
    fn default() -> Self {
        Self {
            messaging_window_hours: default_messaging_window_hours(),
        }
    }
}

fn default_messaging_window_hours() -> u32 {
    24
}

/// In-process scheduler configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(deny_unknown_fields)]
pub struct SchedulerConfig {
    #[serde(default)]
    pub enabled: bool,

    /// Seconds between scheduler ticks.
    #[serde(default = "default_interval_secs")]
    pub interval_secs: u64,

    /// Maximum campaigns processed concurrently.
    #[serde(default = "default_max_concurrent")]
    pub max_concurrent: usize,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_secs: default_interval_secs(),
            max_concurrent: default_max_concurrent(),
        }
    }
}

fn default_interval_secs() -> u64 {
    30
}

fn default_max_concurrent() -> usize {
    4
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn speed_tiers_have_distinct_defaults() {
        let campaign = CampaignConfig::default();
        assert_eq!(campaign.tier(SpeedTier::Slow).batch_size, 10);
        assert_eq!(campaign.tier(SpeedTier::Normal).delay_ms, 1000);
        assert_eq!(campaign.tier(SpeedTier::Fast).batch_size, 60);
        assert_eq!(campaign.default_speed, SpeedTier::Normal);
    }

    #[test]
    fn gateway_debug_redacts_token() {
        let gateway = GatewayConfig {
            bearer_token: Some("super-secret".into()),
            ..Default::default()
        };
        let debug = format!("{gateway:?}");
        assert!(!debug.contains("super-secret"));
    }

    #[test]
    fn partial_speed_section_keeps_other_tiers() {
        let toml_str = r#"
[campaign.speed.fast]
batch_size = 100
delay_ms = 100
"#;
        let config: ZapflowConfig = toml::from_str(toml_str).unwrap();
        assert_eq!(config.campaign.speed.fast.batch_size, 100);
        assert_eq!(config.campaign.speed.slow.batch_size, 10);
    }
}
