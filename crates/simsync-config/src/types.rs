// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration type definitions
//!
//! This module defines all configuration structs that map to sections in
//! `simsync.toml`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(default)]
pub struct SimSyncConfig {
    pub client: ClientConfig,
    pub server: ServerConfig,
    pub logging: LoggingConfig,
}

/// What to do with a failed exchange once buffers have been restored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Log the failure and keep ticking; the next due tick retries.
    #[default]
    Suppress,
    /// Return the failure to the caller of `tick`/`settle`.
    Surface,
}

impl FromStr for FailurePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "suppress" => Ok(FailurePolicy::Suppress),
            "surface" => Ok(FailurePolicy::Surface),
            other => Err(format!(
                "unknown failure policy '{}' (expected 'suppress' or 'surface')",
                other
            )),
        }
    }
}

impl fmt::Display for FailurePolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FailurePolicy::Suppress => write!(f, "suppress"),
            FailurePolicy::Surface => write!(f, "surface"),
        }
    }
}

/// Simulation-side exchange settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ClientConfig {
    /// Base URL of the sync server; exchanges POST to `<server_url>/sync`
    pub server_url: String,
    /// Exchange frequency in hertz (simulation time)
    pub update_rate_hz: f64,
    /// Halt simulation time while an exchange is outstanding
    pub block_on_response: bool,
    /// Simulation time multiplier when not halted
    pub run_speed: f64,
    /// Per-exchange deadline; absent means wait forever
    pub response_timeout_ms: Option<u64>,
    pub failure_policy: FailurePolicy,
}

impl ClientConfig {
    pub fn response_timeout(&self) -> Option<Duration> {
        self.response_timeout_ms.map(Duration::from_millis)
    }
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_url: "http://localhost:8080".to_string(),
            update_rate_hz: 30.0,
            block_on_response: false,
            run_speed: 1.0,
            response_timeout_ms: None,
            failure_policy: FailurePolicy::Suppress,
        }
    }
}

/// Agent-side sync server settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    pub level: String,
    /// Directory for JSON log files; console only when absent
    pub log_dir: Option<PathBuf>,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}
