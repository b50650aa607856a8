// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Exponential backoff with proportional jitter.

use std::time::Duration;

use rand::Rng;
use zapflow_config::model::CampaignConfig;

/// `min(base * 2^(attempt-1), cap)` plus up to `jitter` of that value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BackoffPolicy {
    pub base: Duration,
    pub cap: Duration,
    /// Fraction in `[0, 1]`.
    pub jitter: f64,
}

impl BackoffPolicy {
    pub fn from_config(config: &CampaignConfig) -> Self {
        Self {
            base: Duration::from_millis(config.backoff_base_ms),
            cap: Duration::from_millis(config.backoff_cap_ms),
            jitter: config.backoff_jitter.clamp(0.0, 1.0),
        }
    }

    /// Delay before attempt number `attempt` (1-based), without jitter.
    pub fn unjittered(&self, attempt: u32) -> Duration {
        let exponent = attempt.saturating_sub(1).min(31);
        self.base
            .checked_mul(1u32 << exponent)
            .map_or(self.cap, |d| d.min(self.cap))
    }

    pub fn delay(&self, attempt: u32) -> Duration {
        self.delay_with(attempt, &mut rand::thread_rng())
    }

    pub fn delay_with<R: Rng>(&self, attempt: u32, rng: &mut R) -> Duration {
        let base = self.unjittered(attempt);
        if self.jitter <= 0.0 {
            return base;
        }
        let extra = rng.gen_range(0.0..=self.jitter);
        base + base.mul_f64(extra)
    }
}
