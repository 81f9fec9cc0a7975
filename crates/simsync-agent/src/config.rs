// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Session configuration

use crate::simsync_agent_error::{Result, SyncAgentError};
use simsync_config::{ClientConfig, FailurePolicy};
use std::time::Duration;

/// Settings for one `SyncSession`
///
/// # Example
/// ```
/// use simsync_agent::{FailurePolicy, SessionConfig};
/// use std::time::Duration;
///
/// let config = SessionConfig::new("http://localhost:8080")
///     .with_update_rate_hz(60.0)
///     .with_block_on_response(true)
///     .with_response_timeout(Duration::from_millis(500))
///     .with_failure_policy(FailurePolicy::Surface);
/// assert!(config.validate().is_ok());
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub server_url: String,
    pub update_rate_hz: f64,
    pub block_on_response: bool,
    pub run_speed: f64,
    pub response_timeout: Option<Duration>,
    pub failure_policy: FailurePolicy,
}

impl SessionConfig {
    pub fn new(server_url: impl Into<String>) -> Self {
        Self {
            server_url: server_url.into(),
            ..Self::default()
        }
    }

    pub fn with_update_rate_hz(mut self, update_rate_hz: f64) -> Self {
        self.update_rate_hz = update_rate_hz;
        self
    }

    pub fn with_block_on_response(mut self, block: bool) -> Self {
        self.block_on_response = block;
        self
    }

    pub fn with_run_speed(mut self, run_speed: f64) -> Self {
        self.run_speed = run_speed;
        self
    }

    pub fn with_response_timeout(mut self, timeout: Duration) -> Self {
        self.response_timeout = Some(timeout);
        self
    }

    pub fn with_failure_policy(mut self, policy: FailurePolicy) -> Self {
        self.failure_policy = policy;
        self
    }

    /// Check the values a session relies on
    pub fn validate(&self) -> Result<()> {
        if !self.update_rate_hz.is_finite() || self.update_rate_hz <= 0.0 {
            return Err(SyncAgentError::InvalidConfig(format!(
                "update_rate_hz must be positive, got {}",
                self.update_rate_hz
            )));
        }
        if !self.run_speed.is_finite() || self.run_speed < 0.0 {
            return Err(SyncAgentError::InvalidConfig(format!(
                "run_speed must be zero or positive, got {}",
                self.run_speed
            )));
        }
        if !(self.server_url.starts_with("http://") || self.server_url.starts_with("https://")) {
            return Err(SyncAgentError::InvalidConfig(format!(
                "server_url must be an http(s) URL, got '{}'",
                self.server_url
            )));
        }
        if self.response_timeout == Some(Duration::ZERO) {
            return Err(SyncAgentError::InvalidConfig(
                "response_timeout must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig::from(&ClientConfig::default())
    }
}

impl From<&ClientConfig> for SessionConfig {
    fn from(client: &ClientConfig) -> Self {
        Self {
            server_url: client.server_url.clone(),
            update_rate_hz: client.update_rate_hz,
            block_on_response: client.block_on_response,
            run_speed: client.run_speed,
            response_timeout: client.response_timeout(),
            failure_policy: client.failure_policy,
        }
    }
}
