// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! HTTP surface of the Zapflow campaign engine.
//!
//! Exposes the batch trigger, campaign validation, and channel tests behind
//! bearer auth, plus the provider webhook endpoints, which authenticate by
//! signature through the channel's provider adapter.

pub mod auth;
pub mod handlers;
pub mod server;

pub use auth::AuthConfig;
pub use server::{GatewayState, ServerConfig, router, start_server};
