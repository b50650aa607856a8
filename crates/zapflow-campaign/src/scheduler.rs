// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! In-process periodic trigger for the batch processor.
//!
//! Every `interval_secs` the scheduler lists `queued` and `running`
//! campaigns and spawns one batch per campaign, bounded by
//! `max_concurrent`. A campaign whose previous batch is still in flight is
//! skipped until that batch returns.

use std::collections::HashSet;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};
use zapflow_config::model::SchedulerConfig;
use zapflow_core::ZapflowError;
use zapflow_core::types::CampaignStatus;

use crate::processor::BatchProcessor;

/// Campaign ids with a batch currently running.
type InFlight = Arc<Mutex<HashSet<String>>>;

/// Removes its campaign from the in-flight set when the batch task ends.
struct InFlightGuard {
    set: InFlight,
    campaign_id: String,
}

impl Drop for InFlightGuard {
    fn drop(&mut self) {
        self.set
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(&self.campaign_id);
    }
}

pub struct Scheduler {
    processor: BatchProcessor,
    interval: Duration,
    permits: Arc<Semaphore>,
    in_flight: InFlight,
}

impl Scheduler {
    pub fn new(processor: BatchProcessor, config: &SchedulerConfig) -> Self {
        Self {
            processor,
            interval: Duration::from_secs(config.interval_secs.max(1)),
            permits: Arc::new(Semaphore::new(config.max_concurrent.max(1))),
            in_flight: Arc::default(),
        }
    }

    /// Ticks until `cancel` fires, then waits for running batches to return.
    pub async fn run(self, cancel: CancellationToken) {
        info!(interval_secs = self.interval.as_secs(), "campaign scheduler started");
        let mut tasks = JoinSet::new();
        loop {
            if let Err(err) = self.tick(&mut tasks).await {
                error!(error = %err, "scheduler tick failed");
            }
            while let Some(joined) = tasks.try_join_next() {
                if let Err(err) = joined {
                    error!(error = %err, "batch task panicked");
                }
            }
            tokio::select! {
                () = tokio::time::sleep(self.interval) => {}
                () = cancel.cancelled() => break,
            }
        }
        if !tasks.is_empty() {
            info!(count = tasks.len(), "waiting for in-flight batches");
        }
        while tasks.join_next().await.is_some() {}
        info!("campaign scheduler stopped");
    }

    /// Spawns a batch for every runnable campaign not already in flight.
    /// Returns how many were spawned.
    pub async fn tick(&self, tasks: &mut JoinSet<()>) -> Result<usize, ZapflowError> {
        let campaigns = self
            .processor
            .storage()
            .list_campaigns_by_status(&[CampaignStatus::Queued, CampaignStatus::Running])
            .await?;

        let mut spawned = 0;
        for campaign_id in campaigns {
            let fresh = self
                .in_flight
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .insert(campaign_id.clone());
            if !fresh {
                debug!(campaign_id = %campaign_id, "batch still in flight, skipping");
                continue;
            }
            let guard = InFlightGuard {
                set: self.in_flight.clone(),
                campaign_id,
            };
            let processor = self.processor.clone();
            let permits = self.permits.clone();
            tasks.spawn(async move {
                let Ok(_permit) = permits.acquire_owned().await else {
                    return;
                };
                let campaign_id = guard.campaign_id.as_str();
                match processor.process(campaign_id, None).await {
                    Ok(report) => debug!(
                        campaign_id,
                        processed = report.processed,
                        finished = report.finished,
                        "scheduled batch finished"
                    ),
                    Err(err) => warn!(campaign_id, code = err.code(), error = %err, "scheduled batch rejected"),
                }
            });
            spawned += 1;
        }
        Ok(spawned)
    }
}

impl std::fmt::Debug for Scheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Scheduler")
            .field("interval", &self.interval)
            .field("available_permits", &self.permits.available_permits())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use zapflow_inbox::Inbox;
    use zapflow_template::Resolver;
    use zapflow_test_utils::TestHarness;

    fn scheduler(harness: &TestHarness) -> Scheduler {
        let processor = BatchProcessor::new(
            harness.storage(),
            harness.registry(),
            Inbox::new(harness.storage(), &harness.config.inbox),
            Resolver::new("cliente"),
            harness.config.campaign.clone(),
        );
        Scheduler::new(processor, &SchedulerConfig::default())
    }

    #[tokio::test]
    async fn tick_processes_queued_campaign() {
        let harness = TestHarness::builder().with_recipients(2).build().await.unwrap();
        let scheduler = scheduler(&harness);
        let mut tasks = JoinSet::new();
        assert_eq!(scheduler.tick(&mut tasks).await.unwrap(), 1);
        while tasks.join_next().await.is_some() {}

        assert_eq!(harness.provider.send_count().await, 2);
        assert_eq!(harness.campaign().await.status, CampaignStatus::Done);
        assert_eq!(scheduler.tick(&mut tasks).await.unwrap(), 0);
    }

    #[tokio::test]
    async fn in_flight_campaign_is_not_spawned_twice() {
        let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let scheduler = scheduler(&harness);
        let mut tasks = JoinSet::new();
        assert_eq!(scheduler.tick(&mut tasks).await.unwrap(), 1);
        assert_eq!(scheduler.tick(&mut tasks).await.unwrap(), 0);
        while tasks.join_next().await.is_some() {}
        assert_eq!(harness.provider.send_count().await, 1);
    }

    #[tokio::test]
    async fn run_returns_after_cancel() {
        let harness = TestHarness::builder().with_recipients(1).build().await.unwrap();
        let cancel = CancellationToken::new();
        cancel.cancel();
        scheduler(&harness).run(cancel).await;
        assert_eq!(harness.provider.send_count().await, 1);
    }
}
