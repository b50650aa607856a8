// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign delivery for the Zapflow engine.
//!
//! [`BatchProcessor`] sends one bounded batch of a campaign per invocation;
//! [`Scheduler`] invokes it periodically when the in-process trigger is
//! enabled. Both leave all durable state in the [`StorageAdapter`] so any
//! number of invocations can be chained.
//!
//! [`StorageAdapter`]: zapflow_core::StorageAdapter

pub mod backoff;
pub mod channel_test;
pub mod error;
pub mod processor;
pub mod report;
pub mod scheduler;
pub mod validate;

pub use backoff::BackoffPolicy;
pub use channel_test::test_channel;
pub use error::BatchError;
pub use processor::BatchProcessor;
pub use report::{BatchReport, RecipientError, StopReason};
pub use scheduler::Scheduler;
pub use validate::validate_campaign;
