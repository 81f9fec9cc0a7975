// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Reference `/sync` server.
//!
//! Echoes every output buffer back as the next input buffer, which is enough to drive a
//! simulation end to end without a learner attached.

use anyhow::{Context, Result};
use clap::Parser;
use simsync::agent::{serve, EchoHandler};
use simsync::config::load_config;
use simsync::observability::{debug_flags_help, init_logging};
use simsync::{logging_options, ConfigArgs};
use tracing::{info, warn};

/// Echo sync server for driving a simulation without a learner
#[derive(Parser, Debug)]
#[command(name = "simsync-server")]
#[command(version, author, about, long_about = None)]
#[command(after_help = debug_flags_help())]
struct Args {
    #[command(flatten)]
    common: ConfigArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.common.config.as_deref(), Some(&args.common.overrides()))
        .context("Failed to load configuration")?;
    let _logging = init_logging(&args.common.debug_flags(), &logging_options(&config.logging))?;

    let addr = config.server.bind_address();
    info!("[SERVER] Starting echo sync server on {}", addr);

    serve(&addr, EchoHandler, async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            warn!("[SERVER] Failed to listen for Ctrl-C: {}", e);
            std::future::pending::<()>().await;
        }
        info!("[SERVER] Shutdown requested");
    })
    .await
    .with_context(|| format!("Sync server on {} failed", addr))?;

    Ok(())
}
