// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration loader using Figment for layered config merging.
//!
//! Supports XDG hierarchy: `./zapflow.toml` > `~/.config/zapflow/zapflow.toml` > `/etc/zapflow/zapflow.toml`
//! with environment variable overrides via `ZAPFLOW_` prefix.

#![allow(clippy::result_large_err)] // figment::Error is external and cannot be boxed without wrapper

use std::path::{Path, PathBuf};

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};

use crate::model::ZapflowConfig;

/// System-wide config file.
pub const SYSTEM_CONFIG_PATH: &str = "/etc/zapflow/zapflow.toml";

/// Config file in the working directory.
pub const LOCAL_CONFIG_PATH: &str = "zapflow.toml";

/// User config file under the XDG config directory.
pub fn user_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("zapflow/zapflow.toml"))
}

/// Load configuration from the standard XDG hierarchy with env var overrides.
///
/// Merge order (later overrides earlier):
/// 1. Compiled defaults
/// 2. `/etc/zapflow/zapflow.toml` (system-wide)
/// 3. `~/.config/zapflow/zapflow.toml` (user XDG config)
/// 4. `./zapflow.toml` (local directory)
/// 5. `ZAPFLOW_*` environment variables
pub fn load_config() -> Result<ZapflowConfig, figment::Error> {
    build_figment().extract()
}

/// Load configuration from a TOML string only (no files, no env).
pub fn load_config_from_str(toml_content: &str) -> Result<ZapflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapflowConfig::default()))
        .merge(Toml::string(toml_content))
        .extract()
}

/// Load configuration from a specific file path with env var overrides.
pub fn load_config_from_path(path: &Path) -> Result<ZapflowConfig, figment::Error> {
    Figment::new()
        .merge(Serialized::defaults(ZapflowConfig::default()))
        .merge(Toml::file(path))
        .merge(env_provider())
        .extract()
}

/// Build the Figment used internally for config loading.
pub fn build_figment() -> Figment {
    Figment::new()
        .merge(Serialized::defaults(ZapflowConfig::default()))
        .merge(Toml::file(SYSTEM_CONFIG_PATH))
        .merge(Toml::file(user_config_path().unwrap_or_default()))
        .merge(Toml::file(LOCAL_CONFIG_PATH))
        .merge(env_provider())
}

/// Sections addressable from the environment, longest prefix first so that
/// `campaign_speed_fast_` wins over `campaign_`.
const ENV_SECTIONS: &[(&str, &str)] = &[
    ("campaign_speed_slow_", "campaign.speed.slow."),
    ("campaign_speed_normal_", "campaign.speed.normal."),
    ("campaign_speed_fast_", "campaign.speed.fast."),
    ("service_", "service."),
    ("storage_", "storage."),
    ("gateway_", "gateway."),
    ("campaign_", "campaign."),
    ("template_", "template."),
    ("webhook_", "webhook."),
    ("inbox_", "inbox."),
    ("scheduler_", "scheduler."),
];

/// Map a lowercased, prefix-stripped env key onto a dotted config path.
///
/// Uses an explicit section table, not `Env::split("_")`: key names contain
/// underscores, so `ZAPFLOW_GATEWAY_BEARER_TOKEN` must become
/// `gateway.bearer_token`, not `gateway.bearer.token`.
pub fn map_env_key(key: &str) -> String {
    for (prefix, section) in ENV_SECTIONS {
        if let Some(rest) = key.strip_prefix(prefix) {
            return format!("{section}{rest}");
        }
    }
    key.to_string()
}

fn env_provider() -> Env {
    Env::prefixed("ZAPFLOW_").map(|key| map_env_key(&key.as_str().to_ascii_lowercase()).into())
}
