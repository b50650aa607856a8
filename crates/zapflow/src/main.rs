// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Zapflow - WhatsApp campaign delivery engine.
//!
//! This is the binary entry point.

#[cfg(not(target_env = "msvc"))]
use tikv_jemallocator::Jemalloc;

#[cfg(not(target_env = "msvc"))]
#[global_allocator]
static GLOBAL: Jemalloc = Jemalloc;

mod app;
mod process;
mod serve;
mod shutdown;

use std::path::PathBuf;

use clap::{Parser, Subcommand};
use zapflow_config::ZapflowConfig;
use zapflow_core::types::SpeedTier;

/// Zapflow - WhatsApp campaign delivery engine.
#[derive(Parser, Debug)]
#[command(name = "zapflow", version, about, long_about = None)]
struct Cli {
    /// Read configuration from this file instead of the XDG hierarchy.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

/// Available subcommands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Start the HTTP gateway and the campaign scheduler.
    Serve,
    /// Run one batch of a campaign and print the JSON report.
    Process {
        /// Campaign to process.
        campaign_id: String,
        /// Speed tier: slow, normal or fast.
        #[arg(long)]
        speed: Option<SpeedTier>,
    },
    /// Load and validate the configuration, then exit.
    CheckConfig,
}

#[tokio::main]
async fn main() {
    let cli = Cli::parse();

    let loaded = match &cli.config {
        Some(path) => zapflow_config::load_and_validate_path(path),
        None => zapflow_config::load_and_validate(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(errors) => {
            zapflow_config::render_errors(&errors);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Some(Commands::Serve) => {
            init_tracing(&config.service.log_level);
            serve::run_serve(config).await
        }
        Some(Commands::Process { campaign_id, speed }) => {
            init_tracing(&config.service.log_level);
            process::run_process(config, &campaign_id, speed).await
        }
        Some(Commands::CheckConfig) => {
            print_config_summary(&config);
            Ok(())
        }
        None => {
            println!("zapflow: use --help for available commands");
            Ok(())
        }
    };

    if let Err(e) = result {
        eprintln!("error: {e}");
        std::process::exit(1);
    }
}

fn print_config_summary(config: &ZapflowConfig) {
    println!("zapflow: config ok (service.name={})", config.service.name);
    println!("  database: {}", config.storage.database_path);
    println!("  gateway:  {}:{}", config.gateway.host, config.gateway.port);
    println!(
        "  campaign: max_retries={} budget={}s default_speed={}",
        config.campaign.max_retries,
        config.campaign.execution_budget_secs,
        config.campaign.default_speed
    );
    println!(
        "  scheduler: {}",
        if config.scheduler.enabled {
            "enabled"
        } else {
            "disabled"
        }
    );
    if config.gateway.bearer_token.is_none() {
        println!("  warning: gateway.bearer_token is unset, /v1 routes will reject every request");
    }
    if !config.webhook.require_secret {
        println!("  warning: webhook.require_secret is off, unsigned webhooks are accepted");
    }
}

/// Initializes the tracing subscriber on stderr.
///
/// `RUST_LOG` overrides the configured level.
fn init_tracing(log_level: &str) {
    use tracing_subscriber::EnvFilter;

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("zapflow={log_level},warn")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(true)
        .with_thread_names(false)
        .init();
}
