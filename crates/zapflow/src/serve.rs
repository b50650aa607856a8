// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! `zapflow serve` command implementation.
//!
//! Starts the HTTP gateway and, when enabled, the background scheduler that
//! keeps running campaigns moving. Both stop on SIGINT or SIGTERM.

use tracing::{error, info};
use zapflow_campaign::Scheduler;
use zapflow_config::ZapflowConfig;
use zapflow_core::ZapflowError;
use zapflow_gateway::{AuthConfig, GatewayState, ServerConfig, start_server};

use crate::app::Components;
use crate::shutdown;

/// Runs the `zapflow serve` command until a shutdown signal arrives.
pub async fn run_serve(config: ZapflowConfig) -> Result<(), ZapflowError> {
    info!(name = %config.service.name, "starting zapflow serve");

    let components = Components::build(&config).await?;
    let cancel = shutdown::install_signal_handler();

    let scheduler = if config.scheduler.enabled {
        let scheduler = Scheduler::new(components.processor.clone(), &config.scheduler);
        Some(tokio::spawn(scheduler.run(cancel.child_token())))
    } else {
        info!("scheduler disabled");
        None
    };

    let state = GatewayState::new(
        components.processor.clone(),
        components.ingestor.clone(),
        AuthConfig {
            bearer_token: config.gateway.bearer_token.clone(),
        },
    );
    let server_config = ServerConfig {
        host: config.gateway.host.clone(),
        port: config.gateway.port,
    };
    let served = start_server(&server_config, state, cancel.clone()).await;

    // A bind failure returns before any signal; stop the scheduler too.
    cancel.cancel();
    if let Some(handle) = scheduler {
        if let Err(e) = handle.await {
            error!(error = %e, "scheduler task panicked");
        }
    }

    if let Err(e) = components.close().await {
        error!(error = %e, "failed to close storage");
    }
    info!("zapflow stopped");
    served
}
