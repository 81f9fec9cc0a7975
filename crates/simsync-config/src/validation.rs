// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration validation
//!
//! Every problem is collected before reporting so a broken file is fixed in one pass.

use crate::{ConfigError, ConfigResult, SimSyncConfig};

const LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

/// Validation errors that can occur during config validation
#[derive(Debug, Clone)]
pub enum ConfigValidationError {
    InvalidPort { field: String, port: u16 },
    InvalidUrl { field: String, url: String },
    InvalidValue { field: String, reason: String },
}

impl std::fmt::Display for ConfigValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InvalidPort { field, port } => {
                write!(f, "Port {} = {} is not a usable port", field, port)
            }
            Self::InvalidUrl { field, url } => {
                write!(
                    f,
                    "{} = '{}' must be an http:// or https:// URL",
                    field, url
                )
            }
            Self::InvalidValue { field, reason } => {
                write!(f, "Invalid configuration value for {}: {}", field, reason)
            }
        }
    }
}

/// Validate the complete configuration
///
/// Checks for:
/// - Exchange rate and run speed ranges
/// - Server URL scheme
/// - Server port
/// - Log level
///
/// # Errors
///
/// Returns `ConfigError::ValidationError` with details if validation fails
pub fn validate_config(config: &SimSyncConfig) -> ConfigResult<()> {
    let mut errors = Vec::new();

    validate_client(config, &mut errors);
    validate_server(config, &mut errors);
    validate_logging(config, &mut errors);

    if !errors.is_empty() {
        let error_messages = errors
            .iter()
            .map(|e| format!("  - {}", e))
            .collect::<Vec<_>>()
            .join("\n");

        return Err(ConfigError::ValidationError(format!(
            "Configuration validation failed:\n{}",
            error_messages
        )));
    }

    Ok(())
}

fn validate_client(config: &SimSyncConfig, errors: &mut Vec<ConfigValidationError>) {
    let client = &config.client;

    if !client.update_rate_hz.is_finite() || client.update_rate_hz <= 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "client.update_rate_hz".to_string(),
            reason: format!("must be a positive number, got {}", client.update_rate_hz),
        });
    }

    if !client.run_speed.is_finite() || client.run_speed < 0.0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "client.run_speed".to_string(),
            reason: format!("must be zero or positive, got {}", client.run_speed),
        });
    }

    let url = client.server_url.trim();
    let has_scheme = url.starts_with("http://") || url.starts_with("https://");
    let has_host = url
        .split_once("://")
        .map(|(_, rest)| !rest.trim_matches('/').is_empty())
        .unwrap_or(false);
    if !has_scheme || !has_host {
        errors.push(ConfigValidationError::InvalidUrl {
            field: "client.server_url".to_string(),
            url: client.server_url.clone(),
        });
    }

    if client.response_timeout_ms == Some(0) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "client.response_timeout_ms".to_string(),
            reason: "must be greater than zero (omit it to wait forever)".to_string(),
        });
    }
}

fn validate_server(config: &SimSyncConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.server.port == 0 {
        errors.push(ConfigValidationError::InvalidPort {
            field: "server.port".to_string(),
            port: config.server.port,
        });
    }

    if config.server.host.trim().is_empty() {
        errors.push(ConfigValidationError::InvalidValue {
            field: "server.host".to_string(),
            reason: "must not be empty".to_string(),
        });
    }
}

fn validate_logging(config: &SimSyncConfig, errors: &mut Vec<ConfigValidationError>) {
    if config.logging.retention_runs == 0 {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.retention_runs".to_string(),
            reason: "must keep at least the current run".to_string(),
        });
    }

    let level = config.logging.level.to_lowercase();
    if !LOG_LEVELS.contains(&level.as_str()) {
        errors.push(ConfigValidationError::InvalidValue {
            field: "logging.level".to_string(),
            reason: format!(
                "'{}' is not one of {}",
                config.logging.level,
                LOG_LEVELS.join(", ")
            ),
        });
    }
}
