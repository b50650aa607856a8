// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Campaign batch processor.
//!
//! One invocation loads the campaign, checks every precondition before
//! touching a recipient, then sends the due recipients strictly one after
//! another and finalizes the campaign counters. Cancellation is cooperative:
//! the campaign status is re-read every `status_check_interval` recipients
//! and the loop stops once the execution budget is spent.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{Instrument, debug, info, info_span, warn};
use zapflow_config::model::CampaignConfig;
use zapflow_core::error::codes;
use zapflow_core::phone::normalize_phone;
use zapflow_core::provider::{SendResult, TemplateMessage};
use zapflow_core::time::{format_ts, now_ts};
use zapflow_core::types::{
    CampaignContext, CampaignStatus, ChannelStatus, DueRecipient, FailureUpdate, SentUpdate,
    SpeedTier, TemplateStatus,
};
use zapflow_core::{
    ErrorCategory, ProviderAdapter, ProviderError, ProviderRegistry, StorageAdapter,
};
use zapflow_inbox::{Inbox, OutboundTemplate};
use zapflow_template::{ResolveInput, Resolver, TemplateSchema, render_text};

use crate::backoff::BackoffPolicy;
use crate::error::BatchError;
use crate::report::{BatchReport, StopReason};

/// What happened to one recipient.
#[derive(Debug)]
enum Outcome {
    Sent,
    Failed { retry: bool, rate_limited: Option<Duration> },
    /// The provider rejected the whole channel.
    ChannelBlocked(ProviderError),
}

/// Sends due recipients of one campaign per invocation.
#[derive(Clone)]
pub struct BatchProcessor {
    storage: Arc<dyn StorageAdapter + Send + Sync>,
    registry: ProviderRegistry,
    inbox: Inbox,
    resolver: Resolver,
    config: CampaignConfig,
    backoff: BackoffPolicy,
}

impl BatchProcessor {
    pub fn new(
        storage: Arc<dyn StorageAdapter + Send + Sync>,
        registry: ProviderRegistry,
        inbox: Inbox,
        resolver: Resolver,
        config: CampaignConfig,
    ) -> Self {
        let backoff = BackoffPolicy::from_config(&config);
        Self {
            storage,
            registry,
            inbox,
            resolver,
            config,
            backoff,
        }
    }

    pub fn storage(&self) -> &dyn StorageAdapter {
        self.storage.as_ref()
    }

    pub fn registry(&self) -> &ProviderRegistry {
        &self.registry
    }

    pub fn resolver(&self) -> &Resolver {
        &self.resolver
    }

    pub fn config(&self) -> &CampaignConfig {
        &self.config
    }

    /// Runs one batch of a campaign.
    pub async fn process(
        &self,
        campaign_id: &str,
        speed: Option<SpeedTier>,
    ) -> Result<BatchReport, BatchError> {
        let speed = speed.unwrap_or(self.config.default_speed);
        let span = info_span!("batch", campaign_id, speed = %speed);
        self.run(campaign_id, speed).instrument(span).await
    }

    async fn run(&self, campaign_id: &str, speed: SpeedTier) -> Result<BatchReport, BatchError> {
        let started = Instant::now();
        let budget = Duration::from_secs(self.config.execution_budget_secs);
        let tier = self.config.tier(speed);
        let pace = Duration::from_millis(tier.delay_ms);

        let ctx = self
            .storage
            .load_campaign_context(campaign_id)
            .await?
            .ok_or_else(|| BatchError::CampaignNotFound(campaign_id.to_string()))?;
        let provider = self.check_preconditions(&ctx)?;
        if ctx.campaign.status == CampaignStatus::Queued {
            self.storage
                .set_campaign_status(campaign_id, CampaignStatus::Running, None)
                .await?;
            info!("campaign started");
        }

        let due = self
            .storage
            .select_due_recipients(campaign_id, &now_ts(), self.config.max_retries, tier.batch_size)
            .await?;
        debug!(due = due.len(), batch_size = tier.batch_size, "recipients selected");

        let mut report = BatchReport::new(campaign_id);
        let interval = self.config.status_check_interval.max(1);
        let mut backoff_wait: Option<Duration> = None;

        for (index, recipient) in due.iter().enumerate() {
            if index > 0 {
                if index % interval == 0 {
                    let status = self.storage.get_campaign_status(campaign_id).await?;
                    if status != Some(CampaignStatus::Running) {
                        info!(?status, "campaign no longer running, stopping batch");
                        report.stopped = Some(StopReason::CampaignNotRunning);
                        break;
                    }
                }
                let wait = backoff_wait.take().map_or(pace, |b| b.max(pace));
                if started.elapsed() + wait >= budget {
                    info!(processed = report.processed, "execution budget spent, stopping batch");
                    report.stopped = Some(StopReason::BudgetExhausted);
                    break;
                }
                if !wait.is_zero() {
                    tokio::time::sleep(wait).await;
                }
            } else if started.elapsed() >= budget {
                report.stopped = Some(StopReason::BudgetExhausted);
                break;
            }

            report.processed += 1;
            match self.send_one(&ctx, provider.as_ref(), recipient, &mut report).await {
                Outcome::Sent => report.success += 1,
                Outcome::Failed { retry, rate_limited } => {
                    if retry {
                        report.retry_scheduled += 1;
                    } else {
                        report.failed += 1;
                    }
                    if let Some(wait) = rate_limited {
                        report.rate_limited = true;
                        backoff_wait = Some(wait);
                    }
                }
                Outcome::ChannelBlocked(err) => {
                    report.failed += 1;
                    let reason = format!("channel blocked by provider ({}): {}", err.code, err.message);
                    self.storage
                        .block_channel(&ctx.channel.id, &err.code, &err.message)
                        .await?;
                    self.storage
                        .set_campaign_status(campaign_id, CampaignStatus::Paused, Some(&reason))
                        .await?;
                    warn!(code = %err.code, "channel blocked, campaign paused");
                    report.paused_reason = Some(reason);
                    break;
                }
            }
        }

        self.finalize(campaign_id, &mut report).await?;
        info!(
            processed = report.processed,
            success = report.success,
            failed = report.failed,
            retry_scheduled = report.retry_scheduled,
            finished = report.finished,
            "batch complete"
        );
        Ok(report)
    }

    /// Everything that must hold before any recipient is touched.
    fn check_preconditions(
        &self,
        ctx: &CampaignContext,
    ) -> Result<Arc<dyn ProviderAdapter>, BatchError> {
        match ctx.campaign.status {
            CampaignStatus::Queued | CampaignStatus::Running => {}
            status => {
                return Err(BatchError::NotRunnable {
                    id: ctx.campaign.id.clone(),
                    status,
                });
            }
        }
        let channel = &ctx.channel;
        if channel.config.token().is_none() {
            return Err(BatchError::MissingToken);
        }
        if channel.config.sender_id().is_none() {
            return Err(BatchError::MissingSenderId);
        }
        if channel.blocked_by_provider {
            return Err(BatchError::ChannelBlocked(
                channel.blocked_reason.clone().unwrap_or_default(),
            ));
        }
        if channel.status != ChannelStatus::Connected {
            return Err(BatchError::ChannelNotConnected(channel.status));
        }
        if ctx.template.status != TemplateStatus::Approved {
            return Err(BatchError::TemplateNotApproved(ctx.template.status));
        }
        self.registry
            .get(&channel.provider)
            .ok_or_else(|| BatchError::UnknownProvider(channel.provider.clone()))
    }

    async fn send_one(
        &self,
        ctx: &CampaignContext,
        provider: &dyn ProviderAdapter,
        due: &DueRecipient,
        report: &mut BatchReport,
    ) -> Outcome {
        let recipient = &due.recipient;
        let attempts = recipient.attempts + 1;
        let correlation_id = recipient
            .correlation_id
            .clone()
            .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
        let span = info_span!(
            "recipient",
            recipient_id = %recipient.id,
            correlation_id = %correlation_id,
            attempt = attempts
        );

        async {
            let Some(phone) = normalize_phone(&due.contact.phone) else {
                let err = ProviderError::new(
                    ErrorCategory::RecipientError,
                    codes::INVALID_PHONE,
                    format!("invalid phone number {}", due.contact.phone),
                );
                return self
                    .record_failure(due, attempts, &correlation_id, err, report)
                    .await;
            };

            let resolution = self.resolver.resolve(&ResolveInput {
                template: &ctx.template,
                contact: &due.contact,
                campaign_variables: &ctx.campaign.variables,
                recipient_variables: &recipient.variables,
            });
            if let Some(err) = resolution.error() {
                return self
                    .record_failure(due, attempts, &correlation_id, err, report)
                    .await;
            }

            let message = TemplateMessage {
                name: ctx.template.name.clone(),
                language: ctx.template.language.clone(),
                parameters: resolution.parameters,
            };
            let result = self.send_with_timeout(provider, ctx, &phone, &message).await;

            let Some(provider_message_id) = result.confirmed_id() else {
                return self
                    .record_failure(due, attempts, &correlation_id, result.failure(), report)
                    .await;
            };

            let sent_at = now_ts();
            let update = SentUpdate {
                provider_message_id: provider_message_id.to_string(),
                correlation_id: correlation_id.clone(),
                attempts,
                sent_at: sent_at.clone(),
            };
            if let Err(err) = self.storage.mark_recipient_sent(&recipient.id, &update).await {
                warn!(error = %err, "sent but failed to record recipient");
                report.push_error(&due.contact.phone, err.to_string(), codes::STORAGE_ERROR);
                return Outcome::Sent;
            }
            info!(provider_message_id, "template sent");

            let schema = TemplateSchema::from_components(&ctx.template.components);
            self.inbox
                .record_outbound_template(OutboundTemplate {
                    channel: &ctx.channel,
                    contact_id: &due.contact.id,
                    recipient_id: &recipient.id,
                    provider_message_id,
                    content: render_text(&schema, &message.parameters),
                    payload: serde_json::to_value(&message).unwrap_or_default(),
                    sent_at: &sent_at,
                })
                .await;
            Outcome::Sent
        }
        .instrument(span)
        .await
    }

    /// Calls the provider, bounding the call by `send_timeout_secs`.
    async fn send_with_timeout(
        &self,
        provider: &dyn ProviderAdapter,
        ctx: &CampaignContext,
        phone: &str,
        message: &TemplateMessage,
    ) -> SendResult {
        let limit = Duration::from_secs(self.config.send_timeout_secs);
        match tokio::time::timeout(limit, provider.send_template(&ctx.channel.config, phone, message))
            .await
        {
            Ok(result) => result,
            Err(_) => SendResult::failed(
                ProviderError::transport(
                    codes::TIMEOUT,
                    format!("provider call exceeded {}s", limit.as_secs()),
                ),
                serde_json::Value::Null,
            ),
        }
    }

    /// Classifies a failure and writes it to the recipient row.
    async fn record_failure(
        &self,
        due: &DueRecipient,
        attempts: u32,
        correlation_id: &str,
        err: ProviderError,
        report: &mut BatchReport,
    ) -> Outcome {
        report.push_error(&due.contact.phone, err.message.clone(), err.code.clone());

        let blocked = err.blocks_channel;
        let retry = !blocked && err.retryable && attempts < self.config.max_retries;
        let wait = retry.then(|| self.backoff.delay(attempts));
        let next_retry_at = wait.and_then(|w| {
            chrono::Duration::from_std(w)
                .ok()
                .map(|w| format_ts(Utc::now() + w))
        });

        warn!(
            code = %err.code,
            category = %err.category,
            retry,
            next_retry_at = next_retry_at.as_deref(),
            "send failed"
        );
        let update = FailureUpdate {
            attempts,
            correlation_id: Some(correlation_id.to_string()),
            error_code: err.code.clone(),
            error_detail: err.message.clone(),
            next_retry_at,
        };
        if let Err(store_err) = self
            .storage
            .mark_recipient_failed(&due.recipient.id, &update)
            .await
        {
            warn!(error = %store_err, "failed to record recipient failure");
            report.push_error(&due.contact.phone, store_err.to_string(), codes::STORAGE_ERROR);
        }

        if blocked {
            return Outcome::ChannelBlocked(err);
        }
        let rate_limited = if err.is_rate_limit() {
            Some(wait.unwrap_or_else(|| self.backoff.delay(attempts)))
        } else {
            None
        };
        Outcome::Failed { retry, rate_limited }
    }

    /// Recomputes counters and closes the campaign when nothing is left.
    async fn finalize(&self, campaign_id: &str, report: &mut BatchReport) -> Result<(), BatchError> {
        let counters = self.storage.refresh_campaign_counters(campaign_id).await?;
        if report.paused_reason.is_some() || report.stopped == Some(StopReason::CampaignNotRunning) {
            return Ok(());
        }
        if counters.is_settled()
            && self.storage.get_campaign_status(campaign_id).await? == Some(CampaignStatus::Running)
        {
            self.storage
                .set_campaign_status(campaign_id, CampaignStatus::Done, None)
                .await?;
            report.finished = true;
            info!(sent = counters.sent, failed = counters.failed, "campaign done");
        }
        Ok(())
    }
}

impl std::fmt::Debug for BatchProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("BatchProcessor")
            .field("registry", &self.registry)
            .field("backoff", &self.backoff)
            .finish()
    }
}
