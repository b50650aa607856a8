// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Conversation lifecycle and inbox messages for the Zapflow campaign engine.
//!
//! [`Inbox`] attributes every inbound webhook message and every confirmed
//! outbound send to a conversation resolved by [`resolve_conversation`], and
//! sends free-form replies inside the messaging window.

pub mod error;
pub mod inbound;
pub mod lifecycle;
pub mod outbound;
pub mod reply;

use std::sync::Arc;

use zapflow_config::model::InboxConfig;
use zapflow_core::StorageAdapter;

pub use error::InboxError;
pub use inbound::InboundOutcome;
pub use lifecycle::{ConversationOrigin, resolve_conversation};
pub use outbound::OutboundTemplate;
pub use reply::within_window;

/// Inbox service over shared storage.
#[derive(Clone)]
pub struct Inbox {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    window: chrono::Duration,
}

impl Inbox {
    pub fn new(storage: Arc<dyn StorageAdapter + Send + Sync>, config: &InboxConfig) -> Self {
        Self {
            storage,
            window: chrono::Duration::hours(i64::from(config.messaging_window_hours)),
        }
    }

    pub fn storage(&self) -> &dyn StorageAdapter {
        self.storage.as_ref()
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox").field("window", &self.window).finish()
    }
}
