// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # simsync - fixed-rate buffer exchange for simulations
//!
//! A simulation writes named values into an output buffer every frame. At a fixed rate the
//! buffer is posted to an external agent (`POST <server_url>/sync`, form field
//! `outputData`), and the agent's JSON reply becomes the input buffer the simulation reads.
//! While an exchange is outstanding, simulation time can either keep running at a chosen
//! speed or be halted until the reply arrives.
//!
//! ## Quick Start
//!
//! ```toml
//! [dependencies]
//! simsync = "0.1"
//! ```
//!
//! ```rust,no_run
//! use simsync::prelude::*;
//!
//! # async fn run() -> simsync::agent::Result<()> {
//! let config = SessionConfig::new("http://localhost:8080")
//!     .with_update_rate_hz(30.0)
//!     .with_block_on_response(true);
//! let mut session = SyncSession::new(config)?;
//! session.start()?;
//!
//! for frame in 0..600u32 {
//!     session.set_output("frame", frame);
//!     let report = session.tick(1.0 / 60.0)?;
//!     // Feed report.time_scale into the engine's time scale
//!     if let Some(action) = session.get_input("bestAction") {
//!         println!("{}: {}", report.sim_time, action);
//!     }
//!     tokio::time::sleep(std::time::Duration::from_millis(16)).await;
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Feature Flags
//!
//! - **`server`** (default): agent-side `/sync` endpoint (axum) and the `simsync-server` tool
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │  Foundation: simsync-config                             │
//! │  (TOML + env + CLI overrides, validation)               │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  Infrastructure: simsync-observability                  │
//! │  (console + JSON file logging, debug flags)             │
//! └─────────────────────────────────────────────────────────┘
//!                         ↓
//! ┌─────────────────────────────────────────────────────────┐
//! │  I/O: simsync-agent                                     │
//! │  (session, exchange state machine, timing gate,         │
//! │   HTTP form transport, /sync server)                    │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## License
//!
//! Apache-2.0

pub use simsync_agent as agent;
pub use simsync_config as config;
pub use simsync_observability as observability;

use clap::Args;
use simsync_config::{FailurePolicy, LoggingConfig};
use simsync_observability::{resolve_debug_flags, CrateDebugFlags, LoggingOptions};
use std::collections::HashMap;
use std::path::PathBuf;

/// Configuration flags shared by the simsync tools
///
/// Each flag maps onto a config override key, so flags beat `SIMSYNC_*` environment
/// variables, which beat the TOML file.
#[derive(Args, Debug, Clone, Default, PartialEq)]
pub struct ConfigArgs {
    /// Path to simsync.toml (default: SIMSYNC_CONFIG_PATH, then cwd and its parents)
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Base URL of the sync server
    #[arg(long)]
    pub server_url: Option<String>,

    /// Exchanges per simulated second
    #[arg(long)]
    pub update_rate_hz: Option<f64>,

    /// Halt simulation time while an exchange is outstanding
    #[arg(long)]
    pub block_on_response: Option<bool>,

    /// Simulation speed multiplier while not halted
    #[arg(long)]
    pub run_speed: Option<f64>,

    /// Per-exchange deadline in milliseconds
    #[arg(long)]
    pub response_timeout_ms: Option<u64>,

    /// What to do with a failed exchange: suppress or surface
    #[arg(long)]
    pub failure_policy: Option<FailurePolicy>,

    /// Sync server bind host
    #[arg(long)]
    pub server_host: Option<String>,

    /// Sync server bind port
    #[arg(long)]
    pub server_port: Option<u16>,

    /// Base log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Directory for JSON log files
    #[arg(long)]
    pub log_dir: Option<PathBuf>,

    /// Enable debug logging for a crate (repeatable or comma-separated; `all` for every crate)
    #[arg(long = "debug", value_name = "CRATE", value_delimiter = ',')]
    pub debug: Vec<String>,
}

impl ConfigArgs {
    /// Flags that were given, keyed by config override name
    pub fn overrides(&self) -> HashMap<String, String> {
        let mut overrides = HashMap::new();
        let mut put = |key: &str, value: Option<String>| {
            if let Some(value) = value {
                overrides.insert(key.to_string(), value);
            }
        };
        put("server_url", self.server_url.clone());
        put("update_rate_hz", self.update_rate_hz.map(|v| v.to_string()));
        put("block_on_response", self.block_on_response.map(|v| v.to_string()));
        put("run_speed", self.run_speed.map(|v| v.to_string()));
        put("response_timeout_ms", self.response_timeout_ms.map(|v| v.to_string()));
        put("failure_policy", self.failure_policy.map(|v| v.to_string()));
        put("server_host", self.server_host.clone());
        put("server_port", self.server_port.map(|v| v.to_string()));
        put("log_level", self.log_level.clone());
        put(
            "log_dir",
            self.log_dir.as_ref().map(|v| v.display().to_string()),
        );
        overrides
    }

    /// `--debug` values merged with `SIMSYNC_DEBUG`
    pub fn debug_flags(&self) -> CrateDebugFlags {
        resolve_debug_flags(&self.debug)
    }
}

/// Prelude - commonly used types and traits
pub mod prelude {
    pub use crate::agent::{
        json, DataMap, ExchangeReport, FailurePolicy, SessionConfig, SyncAgentError, SyncSession,
        TickReport, Value,
    };
    pub use crate::config::{load_config, SimSyncConfig};

    #[cfg(feature = "server")]
    pub use crate::agent::{serve, EchoHandler, SyncHandler};
}

/// Translate the `[logging]` config section into logging options
pub fn logging_options(logging: &LoggingConfig) -> LoggingOptions {
    LoggingOptions {
        level: logging.level.clone(),
        log_dir: logging.log_dir.clone(),
        retention_days: logging.retention_days,
        retention_runs: logging.retention_runs,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SimSyncConfig;

    #[test]
    fn test_facade_imports() {
        use crate::prelude::*;
        let config = SessionConfig::from(&SimSyncConfig::default().client);
        assert_eq!(config.failure_policy, FailurePolicy::Suppress);
    }

    #[test]
    fn test_logging_options_from_config() {
        let logging = LoggingConfig {
            level: "debug".to_string(),
            log_dir: Some(PathBuf::from("/tmp/simsync-logs")),
            retention_days: 7,
            retention_runs: 3,
        };
        let options = logging_options(&logging);
        assert_eq!(options.level, "debug");
        assert_eq!(options.log_dir, Some(PathBuf::from("/tmp/simsync-logs")));
        assert_eq!(options.retention_days, 7);
        assert_eq!(options.retention_runs, 3);
    }

    #[derive(clap::Parser, Debug)]
    struct TestCli {
        #[command(flatten)]
        config: ConfigArgs,
    }

    fn parse(args: &[&str]) -> Result<ConfigArgs, clap::Error> {
        use clap::Parser;
        TestCli::try_parse_from(std::iter::once("simsync-test").chain(args.iter().copied()))
            .map(|cli| cli.config)
    }

    #[test]
    fn test_config_args_to_overrides() {
        let args = parse(&[
            "--config=/etc/simsync.toml",
            "--server-url",
            "http://10.0.0.2:9000",
            "--run-speed=2",
            "--block-on-response=true",
            "--failure-policy=surface",
        ])
        .unwrap();

        assert_eq!(args.config, Some(PathBuf::from("/etc/simsync.toml")));
        let overrides = args.overrides();
        assert_eq!(overrides.len(), 4);
        assert_eq!(
            overrides.get("server_url").map(String::as_str),
            Some("http://10.0.0.2:9000")
        );
        assert_eq!(overrides.get("run_speed").map(String::as_str), Some("2"));
        assert_eq!(overrides.get("block_on_response").map(String::as_str), Some("true"));
        assert_eq!(overrides.get("failure_policy").map(String::as_str), Some("surface"));
    }

    #[test]
    fn test_overrides_load_through_config() {
        let args = parse(&["--update-rate-hz=60", "--server-port=9100"]).unwrap();
        let mut loaded = SimSyncConfig::default();
        config::apply_cli_overrides(&mut loaded, &args.overrides()).unwrap();
        assert_eq!(loaded.client.update_rate_hz, 60.0);
        assert_eq!(loaded.server.port, 9100);
    }

    #[test]
    fn test_rejects_unknown_and_malformed_flags() {
        assert!(parse(&["--update-rate=60"]).is_err());
        assert!(parse(&["--block-on-response=ture"]).is_err());
        assert!(parse(&["--failure-policy=ignore"]).is_err());
    }

    #[test]
    fn test_debug_flags_list() {
        let args = parse(&["--debug", "simsync-agent,simsync-config", "--debug=simsync"]).unwrap();
        let flags = args.debug_flags();
        assert!(flags.is_enabled("simsync-agent"));
        assert!(flags.is_enabled("simsync-config"));
        assert!(flags.is_enabled("simsync"));
    }
}
