// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Test utilities for Zapflow integration tests.
//!
//! Provides a scripted provider adapter and a temp-SQLite harness for fast,
//! deterministic tests without external services.
//!
//! # Components
//!
//! - [`MockProvider`] - provider adapter with scripted send outcomes and call capture
//! - [`TestHarness`] - temp storage seeded with a channel, template, campaign, and recipients

pub mod harness;
pub mod mock_provider;

pub use harness::{TestHarness, TestHarnessBuilder};
pub use mock_provider::{MockProvider, SentCall};
