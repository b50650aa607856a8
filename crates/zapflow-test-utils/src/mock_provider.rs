// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Mock provider adapter for deterministic testing.
//!
//! Send outcomes are popped from a FIFO queue. When the queue is empty a
//! send succeeds with a generated `wamid.mock-N` id. Every call is captured.

use std::collections::VecDeque;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Value, json};
use tokio::sync::Mutex;
use zapflow_core::error::codes;
use zapflow_core::events::WebhookEvent;
use zapflow_core::provider::{
    ConnectionTest, MediaSource, SendResult, TemplateMessage, UploadResult, WebhookAuth,
};
use zapflow_core::types::ChannelProviderConfig;
use zapflow_core::{ErrorCategory, PluginAdapter, ProviderAdapter, ProviderError};

/// Registry name the harness channel points at.
pub const MOCK_PROVIDER_NAME: &str = "mock";

/// Header carrying the channel secret verbatim in mock webhooks.
pub const MOCK_SIGNATURE_HEADER: &str = "x-mock-signature";

/// A captured send.
#[derive(Debug, Clone, PartialEq)]
pub enum SentCall {
    Template { to: String, message: TemplateMessage },
    Text { to: String, text: String, reply_to: Option<String> },
}

impl SentCall {
    pub fn to(&self) -> &str {
        match self {
            Self::Template { to, .. } | Self::Text { to, .. } => to,
        }
    }
}

/// A provider adapter that returns scripted outcomes.
pub struct MockProvider {
    outcomes: Arc<Mutex<VecDeque<SendResult>>>,
    calls: Arc<Mutex<Vec<SentCall>>>,
    connection: Arc<Mutex<ConnectionTest>>,
    counter: AtomicUsize,
    send_delay: Option<Duration>,
}

impl MockProvider {
    pub fn new() -> Self {
        Self {
            outcomes: Arc::new(Mutex::new(VecDeque::new())),
            calls: Arc::new(Mutex::new(Vec::new())),
            connection: Arc::new(Mutex::new(ConnectionTest {
                success: true,
                error: None,
                details: Some(json!({"verified_name": "Mock"})),
            })),
            counter: AtomicUsize::new(0),
            send_delay: None,
        }
    }

    /// Every send sleeps this long before answering.
    pub fn with_send_delay(mut self, delay: Duration) -> Self {
        self.send_delay = Some(delay);
        self
    }

    /// Queue an explicit send result.
    pub async fn push_result(&self, result: SendResult) {
        self.outcomes.lock().await.push_back(result);
    }

    /// Queue a confirmed send with the given id.
    pub async fn push_success(&self, id: &str) {
        self.push_result(SendResult::sent(id, json!({"messages": [{"id": id}]})))
            .await;
    }

    /// Queue a failed send.
    pub async fn push_error(&self, error: ProviderError) {
        self.push_result(SendResult::failed(error, Value::Null)).await;
    }

    /// Queue an HTTP 401 auth failure.
    pub async fn push_unauthorized(&self) {
        self.push_error(
            ProviderError::new(ErrorCategory::Auth, codes::UNAUTHORIZED, "invalid token")
                .with_status(401),
        )
        .await;
    }

    /// Queue an HTTP 429 rate limit.
    pub async fn push_rate_limited(&self) {
        self.push_error(
            ProviderError::new(ErrorCategory::RateLimit, codes::RATE_LIMITED, "slow down")
                .with_status(429),
        )
        .await;
    }

    /// Sets the result of subsequent connection tests.
    pub async fn set_connection(&self, result: ConnectionTest) {
        *self.connection.lock().await = result;
    }

    /// Captured sends, in call order.
    pub async fn calls(&self) -> Vec<SentCall> {
        self.calls.lock().await.clone()
    }

    pub async fn send_count(&self) -> usize {
        self.calls.lock().await.len()
    }

    async fn next_result(&self, call: SentCall) -> SendResult {
        self.calls.lock().await.push(call);
        if let Some(delay) = self.send_delay {
            tokio::time::sleep(delay).await;
        }
        match self.outcomes.lock().await.pop_front() {
            Some(result) => result,
            None => {
                let n = self.counter.fetch_add(1, Ordering::SeqCst) + 1;
                let id = format!("wamid.mock-{n}");
                SendResult::sent(id.clone(), json!({"messages": [{"id": id}]}))
            }
        }
    }
}

impl Default for MockProvider {
    fn default() -> Self {
        Self::new()
    }
}

impl PluginAdapter for MockProvider {
    fn name(&self) -> &str {
        MOCK_PROVIDER_NAME
    }
}

#[async_trait]
impl ProviderAdapter for MockProvider {
    async fn send_text(
        &self,
        _config: &ChannelProviderConfig,
        to: &str,
        text: &str,
        reply_to: Option<&str>,
    ) -> SendResult {
        self.next_result(SentCall::Text {
            to: to.to_string(),
            text: text.to_string(),
            reply_to: reply_to.map(str::to_string),
        })
        .await
    }

    async fn send_template(
        &self,
        _config: &ChannelProviderConfig,
        to: &str,
        message: &TemplateMessage,
    ) -> SendResult {
        self.next_result(SentCall::Template {
            to: to.to_string(),
            message: message.clone(),
        })
        .await
    }

    async fn upload_media(
        &self,
        _config: &ChannelProviderConfig,
        _source: MediaSource,
        _mime_type: &str,
        _filename: Option<&str>,
    ) -> UploadResult {
        UploadResult {
            success: true,
            media_id: Some("media-mock".to_string()),
            error: None,
        }
    }

    /// The mock signature is the channel secret itself.
    fn validate_webhook(
        &self,
        config: &ChannelProviderConfig,
        headers: &http::HeaderMap,
        _raw_body: &[u8],
    ) -> Result<WebhookAuth, ProviderError> {
        let Some(secret) = config.secret() else {
            return Ok(WebhookAuth::Unsigned);
        };
        let auth_error = |code: &str| {
            let mut err = ProviderError::new(ErrorCategory::Auth, code, "mock signature check failed");
            err.blocks_channel = false;
            err
        };
        match headers.get(MOCK_SIGNATURE_HEADER) {
            None => Err(auth_error(codes::MISSING_SIGNATURE)),
            Some(value) if value.as_bytes() == secret.as_bytes() => Ok(WebhookAuth::Verified),
            Some(_) => Err(auth_error(codes::INVALID_SIGNATURE)),
        }
    }

    /// Reads `{"events": [...]}` of already-normalized events.
    fn parse_webhook(&self, _config: &ChannelProviderConfig, body: &Value) -> Vec<WebhookEvent> {
        body.get("events")
            .and_then(|events| serde_json::from_value(events.clone()).ok())
            .unwrap_or_default()
    }

    async fn test_connection(&self, _config: &ChannelProviderConfig) -> ConnectionTest {
        self.connection.lock().await.clone()
    }
}
