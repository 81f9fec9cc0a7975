// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Headless simulation driver.
//!
//! Runs a fixed-rate frame loop against a sync server: writes a frame counter and the
//! current simulation time every frame, lets the session gate simulation time, and logs each
//! input buffer as it arrives.

use anyhow::{bail, Context, Result};
use clap::Parser;
use simsync::agent::{ExchangeReport, SessionConfig, SyncSession};
use simsync::config::load_config;
use simsync::observability::{debug_flags_help, init_logging};
use simsync::{logging_options, ConfigArgs};
use std::time::Duration;
use tracing::{debug, info, warn};

/// Headless fixed-rate simulation driver for a sync server
#[derive(Parser, Debug)]
#[command(name = "simsync-client")]
#[command(version, author, about, long_about = None)]
#[command(after_help = debug_flags_help())]
struct Args {
    #[command(flatten)]
    common: ConfigArgs,

    /// Number of frames to run
    #[arg(long, default_value_t = 600)]
    frames: u64,

    /// Frames per real second
    #[arg(long, default_value_t = 60.0)]
    frame_rate: f64,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let config = load_config(args.common.config.as_deref(), Some(&args.common.overrides()))
        .context("Failed to load configuration")?;
    let _logging = init_logging(&args.common.debug_flags(), &logging_options(&config.logging))?;

    let frames = args.frames;
    let frame_rate = args.frame_rate;
    if !frame_rate.is_finite() || frame_rate <= 0.0 {
        bail!("--frame-rate must be positive, got {}", frame_rate);
    }

    let mut session = SyncSession::new(SessionConfig::from(&config.client))?;
    session.start()?;

    let frame_dt = 1.0 / frame_rate;
    let mut interval = tokio::time::interval(Duration::from_secs_f64(frame_dt));
    let mut applied = 0u64;
    let mut failed = 0u64;

    for frame in 0..frames {
        interval.tick().await;

        session.set_output("frame", frame);
        session.set_output("simTime", session.sim_time());

        let report = session.tick(frame_dt)?;
        match report.completed {
            Some(ExchangeReport::Applied { id, keys }) => {
                applied += 1;
                debug!(
                    "[CLIENT] Frame {}: exchange {} applied, {} keys: {}",
                    frame,
                    id,
                    keys,
                    input_preview(session.input().as_map())
                );
            }
            Some(ExchangeReport::Failed { id, error }) => {
                failed += 1;
                warn!("[CLIENT] Frame {}: exchange {} failed: {}", frame, id, error);
            }
            None => {}
        }
    }

    session.settle().await?;
    session.shutdown();

    info!(
        "[CLIENT] Done: {} frames, {} exchanges applied, {} failed, sim time {:.3}s",
        frames,
        applied,
        failed,
        session.sim_time()
    );
    Ok(())
}

fn input_preview(map: &simsync::agent::DataMap) -> String {
    simsync::agent::Value::Object(map.clone()).to_string()
}
