// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Core library for the Zapflow campaign delivery engine.
//!
//! This crate provides the adapter trait definitions, error types, and domain
//! types used throughout the Zapflow workspace. Provider and storage adapters
//! implement traits defined here.

pub mod error;
pub mod events;
pub mod phone;
pub mod provider;
pub mod registry;
pub mod template;
pub mod time;
pub mod traits;
pub mod types;

// Re-export key items at crate root for ergonomic imports.
pub use error::{ErrorCategory, ProviderError, ZapflowError};
pub use registry::ProviderRegistry;

pub use traits::{PluginAdapter, ProviderAdapter, StorageAdapter};
