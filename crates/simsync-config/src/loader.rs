// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Configuration file loading with override support
//!
//! This module implements the 3-tier configuration loading system:
//! 1. TOML file (base defaults)
//! 2. Environment variables (runtime overrides)
//! 3. CLI arguments (explicit user overrides)

use crate::{ConfigError, ConfigResult, SimSyncConfig};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Name of the configuration file searched for on disk
pub const CONFIG_FILE_NAME: &str = "simsync.toml";

/// Find the simsync configuration file
///
/// Search order:
/// 1. `SIMSYNC_CONFIG_PATH` environment variable
/// 2. Current working directory: `./simsync.toml`
/// 3. Up to 5 parent directories
///
/// # Errors
///
/// Returns `ConfigError::FileNotFound` if no config file is found in any location
pub fn find_config_file() -> ConfigResult<PathBuf> {
    if let Ok(env_path) = env::var("SIMSYNC_CONFIG_PATH") {
        let path = PathBuf::from(env_path);
        if path.exists() {
            return Ok(path);
        } else {
            return Err(ConfigError::FileNotFound(format!(
                "Config file specified by SIMSYNC_CONFIG_PATH not found: {}",
                path.display()
            )));
        }
    }

    let mut search_paths = Vec::new();

    if let Ok(cwd) = env::current_dir() {
        search_paths.push(cwd.join(CONFIG_FILE_NAME));

        let mut current = cwd.clone();
        for _ in 0..5 {
            if let Some(parent) = current.parent() {
                search_paths.push(parent.join(CONFIG_FILE_NAME));
                current = parent.to_path_buf();
            }
        }
    }

    for path in &search_paths {
        if path.exists() {
            return Ok(path.clone());
        }
    }

    let search_list = search_paths
        .iter()
        .map(|p| format!("  - {}", p.display()))
        .collect::<Vec<_>>()
        .join("\n");

    Err(ConfigError::FileNotFound(format!(
        "Configuration file '{}' not found in any of these locations:\n{}\n\nSet SIMSYNC_CONFIG_PATH environment variable to specify custom location.",
        CONFIG_FILE_NAME, search_list
    )))
}

/// Load configuration from TOML file
///
/// # Arguments
///
/// * `config_path` - Optional path to config file. If `None`, the file is searched for;
///   when no file exists anywhere, built-in defaults are used.
/// * `cli_args` - Optional CLI argument overrides
///
/// # Errors
///
/// Returns error if an explicit config file is missing, contains invalid TOML, or the
/// merged result fails validation
pub fn load_config(
    config_path: Option<&Path>,
    cli_args: Option<&HashMap<String, String>>,
) -> ConfigResult<SimSyncConfig> {
    let mut config = match config_path {
        Some(path) => parse_file(path)?,
        None => match find_config_file() {
            Ok(path) => parse_file(&path)?,
            // An explicitly named file that is missing is an error; silence is not.
            Err(err) if env::var("SIMSYNC_CONFIG_PATH").is_ok() => return Err(err),
            Err(_) => SimSyncConfig::default(),
        },
    };

    apply_environment_overrides(&mut config)?;

    if let Some(cli) = cli_args {
        apply_cli_overrides(&mut config, cli)?;
    }

    crate::validate_config(&config)?;

    Ok(config)
}

fn parse_file(path: &Path) -> ConfigResult<SimSyncConfig> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

fn parse_value<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .trim()
        .parse::<T>()
        .map_err(|_| ConfigError::InvalidValue(format!("{} = '{}'", key, value)))
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::InvalidValue(format!(
            "{} = '{}' (expected true or false)",
            key, value
        ))),
    }
}

/// Apply one named override. Names match the CLI keys; environment variables map onto them.
fn apply_override(config: &mut SimSyncConfig, key: &str, value: &str) -> ConfigResult<()> {
    match key {
        "server_url" => config.client.server_url = value.to_string(),
        "update_rate_hz" => config.client.update_rate_hz = parse_value(key, value)?,
        "run_speed" => config.client.run_speed = parse_value(key, value)?,
        "block_on_response" => config.client.block_on_response = parse_bool(key, value)?,
        "response_timeout_ms" => {
            config.client.response_timeout_ms = if value.trim().is_empty() {
                None
            } else {
                Some(parse_value(key, value)?)
            }
        }
        "failure_policy" => {
            config.client.failure_policy = value.parse().map_err(ConfigError::InvalidValue)?
        }
        "server_host" => config.server.host = value.to_string(),
        "server_port" => config.server.port = parse_value(key, value)?,
        "log_level" => config.logging.level = value.to_string(),
        "log_dir" => config.logging.log_dir = Some(PathBuf::from(value)),
        _ => {
            return Err(ConfigError::InvalidValue(format!(
                "unknown setting '{}'",
                key
            )))
        }
    }
    Ok(())
}

/// Environment variable to override key mapping
const ENV_OVERRIDES: &[(&str, &str)] = &[
    ("SIMSYNC_SERVER_URL", "server_url"),
    ("SIMSYNC_UPDATE_RATE_HZ", "update_rate_hz"),
    ("SIMSYNC_RUN_SPEED", "run_speed"),
    ("SIMSYNC_BLOCK_ON_RESPONSE", "block_on_response"),
    ("SIMSYNC_RESPONSE_TIMEOUT_MS", "response_timeout_ms"),
    ("SIMSYNC_FAILURE_POLICY", "failure_policy"),
    ("SIMSYNC_SERVER_HOST", "server_host"),
    ("SIMSYNC_SERVER_PORT", "server_port"),
    ("SIMSYNC_LOG_LEVEL", "log_level"),
    ("SIMSYNC_LOG_DIR", "log_dir"),
];

/// Apply environment variable overrides to configuration
///
/// Supported environment variables:
/// - `SIMSYNC_SERVER_URL` -> `client.server_url`
/// - `SIMSYNC_UPDATE_RATE_HZ` -> `client.update_rate_hz`
/// - `SIMSYNC_RUN_SPEED` -> `client.run_speed`
/// - `SIMSYNC_BLOCK_ON_RESPONSE` -> `client.block_on_response`
/// - `SIMSYNC_RESPONSE_TIMEOUT_MS` -> `client.response_timeout_ms`
/// - `SIMSYNC_FAILURE_POLICY` -> `client.failure_policy`
/// - `SIMSYNC_SERVER_HOST` -> `server.host`
/// - `SIMSYNC_SERVER_PORT` -> `server.port`
/// - `SIMSYNC_LOG_LEVEL` -> `logging.level`
/// - `SIMSYNC_LOG_DIR` -> `logging.log_dir`
pub fn apply_environment_overrides(config: &mut SimSyncConfig) -> ConfigResult<()> {
    for (var, key) in ENV_OVERRIDES {
        if let Ok(value) = env::var(var) {
            apply_override(config, key, &value)?;
        }
    }
    Ok(())
}

/// Apply CLI argument overrides to configuration
///
/// # Arguments
///
/// * `config` - Configuration to modify
/// * `cli_args` - HashMap of CLI arguments (e.g., `{"server_url": "http://10.0.0.2:9000", "run_speed": "2"}`)
///
/// Keys are the same names the environment variables map onto; an unknown key is an
/// `InvalidValue` error so a misspelled flag does not silently fall back to the default.
pub fn apply_cli_overrides(
    config: &mut SimSyncConfig,
    cli_args: &HashMap<String, String>,
) -> ConfigResult<()> {
    for (key, value) in cli_args {
        apply_override(config, key, value)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FailurePolicy;
    use std::fs::File;
    use std::io::Write;
    use std::sync::Mutex;
    use tempfile::tempdir;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_env() {
        env::remove_var("SIMSYNC_CONFIG_PATH");
        for (var, _) in ENV_OVERRIDES {
            env::remove_var(var);
        }
    }

    #[test]
    fn test_find_config_file_env_var() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join("custom_config.toml");
        File::create(&config_path).unwrap();

        env::set_var("SIMSYNC_CONFIG_PATH", config_path.to_str().unwrap());
        let result = find_config_file();
        env::remove_var("SIMSYNC_CONFIG_PATH");

        assert_eq!(result.unwrap(), config_path);
    }

    #[test]
    fn test_find_config_file_env_var_missing() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        env::set_var("SIMSYNC_CONFIG_PATH", "/definitely/not/here/simsync.toml");
        let result = load_config(None, None);
        env::remove_var("SIMSYNC_CONFIG_PATH");

        assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
    }

    #[test]
    fn test_load_minimal_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[client]").unwrap();
        writeln!(file, "update_rate_hz = 60.0").unwrap();
        writeln!(file, "block_on_response = true").unwrap();
        writeln!(file, "failure_policy = \"surface\"").unwrap();
        writeln!(file, "[server]").unwrap();
        writeln!(file, "port = 9000").unwrap();

        let config = load_config(Some(&config_path), None).unwrap();

        assert_eq!(config.client.update_rate_hz, 60.0);
        assert!(config.client.block_on_response);
        assert_eq!(config.client.failure_policy, FailurePolicy::Surface);
        assert_eq!(config.server.port, 9000);
        // Untouched sections keep their defaults
        assert_eq!(config.client.server_url, "http://localhost:8080");
        assert_eq!(config.client.run_speed, 1.0);
    }

    #[test]
    fn test_environment_overrides() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let mut config = SimSyncConfig::default();

        env::set_var("SIMSYNC_SERVER_URL", "http://192.168.1.100:9999");
        env::set_var("SIMSYNC_BLOCK_ON_RESPONSE", "yes");
        env::set_var("SIMSYNC_RESPONSE_TIMEOUT_MS", "250");

        let result = apply_environment_overrides(&mut config);
        clear_env();
        result.unwrap();

        assert_eq!(config.client.server_url, "http://192.168.1.100:9999");
        assert!(config.client.block_on_response);
        assert_eq!(config.client.response_timeout_ms, Some(250));
    }

    #[test]
    fn test_environment_override_rejects_garbage() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let mut config = SimSyncConfig::default();

        env::set_var("SIMSYNC_UPDATE_RATE_HZ", "fast");
        let result = apply_environment_overrides(&mut config);
        clear_env();

        assert!(matches!(result, Err(ConfigError::InvalidValue(_))));
    }

    #[test]
    fn test_cli_overrides() {
        let mut config = SimSyncConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("server_host".to_string(), "10.0.0.1".to_string());
        cli_args.insert("server_port".to_string(), "7777".to_string());
        cli_args.insert("run_speed".to_string(), "2.5".to_string());

        apply_cli_overrides(&mut config, &cli_args).unwrap();

        assert_eq!(config.server.host, "10.0.0.1");
        assert_eq!(config.server.port, 7777);
        assert_eq!(config.client.run_speed, 2.5);
    }

    #[test]
    fn test_cli_override_rejects_unknown_key() {
        let mut config = SimSyncConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("update_rate".to_string(), "60".to_string());

        match apply_cli_overrides(&mut config, &cli_args) {
            Err(ConfigError::InvalidValue(msg)) => assert!(msg.contains("update_rate")),
            other => panic!("expected InvalidValue, got {:?}", other),
        }
        assert_eq!(config.client.update_rate_hz, 30.0);
    }

    #[test]
    fn test_bool_override_rejects_typo() {
        let mut config = SimSyncConfig::default();
        let mut cli_args = HashMap::new();
        cli_args.insert("block_on_response".to_string(), "ture".to_string());
        assert!(matches!(
            apply_cli_overrides(&mut config, &cli_args),
            Err(ConfigError::InvalidValue(_))
        ));

        cli_args.insert("block_on_response".to_string(), "on".to_string());
        apply_cli_overrides(&mut config, &cli_args).unwrap();
        assert!(config.client.block_on_response);

        cli_args.insert("block_on_response".to_string(), "FALSE".to_string());
        apply_cli_overrides(&mut config, &cli_args).unwrap();
        assert!(!config.client.block_on_response);
    }

    #[test]
    fn test_override_precedence() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        // CLI overrides take precedence over environment variables
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[client]").unwrap();
        writeln!(file, "server_url = \"http://file-host:8000\"").unwrap();
        writeln!(file, "update_rate_hz = 10.0").unwrap();

        env::set_var("SIMSYNC_SERVER_URL", "http://env-host:8000");
        env::set_var("SIMSYNC_UPDATE_RATE_HZ", "20");

        let mut cli_args = HashMap::new();
        cli_args.insert("server_url".to_string(), "http://cli-host:8000".to_string());

        let config = load_config(Some(&config_path), Some(&cli_args));
        clear_env();
        let config = config.unwrap();

        // CLI wins for url, env wins for rate (no CLI override)
        assert_eq!(config.client.server_url, "http://cli-host:8000");
        assert_eq!(config.client.update_rate_hz, 20.0);
    }

    #[test]
    fn test_load_rejects_invalid_merged_config() {
        let _env_lock = ENV_LOCK.lock().unwrap();
        clear_env();
        let dir = tempdir().unwrap();
        let config_path = dir.path().join(CONFIG_FILE_NAME);

        let mut file = File::create(&config_path).unwrap();
        writeln!(file, "[client]").unwrap();
        writeln!(file, "update_rate_hz = 0.0").unwrap();

        let result = load_config(Some(&config_path), None);
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }
}
