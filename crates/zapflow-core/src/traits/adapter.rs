// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Base adapter trait that all adapters must implement.

/// The base trait for all Zapflow adapters.
///
/// Provider adapters are looked up in the registry by [`PluginAdapter::name`];
/// storage adapters report it in logs.
pub trait PluginAdapter: Send + Sync + 'static {
    /// Returns the registry name of this adapter instance.
    fn name(&self) -> &str;
}
