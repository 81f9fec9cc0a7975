// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Logging initialization
//!
//! Console output always; JSON files in a timestamped run folder when a log directory is
//! configured, with old runs pruned by age and count.

use anyhow::{Context, Result};
use chrono::{DateTime, Duration, NaiveDateTime, TimeZone, Utc};
use std::path::{Path, PathBuf};
use tracing_appender::rolling;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, Registry};

use crate::cli::CrateDebugFlags;

const RUN_PREFIX: &str = "run_";
const RUN_TIMESTAMP_FORMAT: &str = "%Y%m%d_%H%M%S";

/// Logging settings, usually taken from the `[logging]` config section
#[derive(Debug, Clone)]
pub struct LoggingOptions {
    pub level: String,
    pub log_dir: Option<PathBuf>,
    pub retention_days: u64,
    pub retention_runs: usize,
}

impl Default for LoggingOptions {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            log_dir: None,
            retention_days: 30,
            retention_runs: 10,
        }
    }
}

/// Keeps file writers alive; logs are flushed when this is dropped
pub struct LoggingGuard {
    _file_guards: Vec<tracing_appender::non_blocking::WorkerGuard>,
    run_dir: Option<PathBuf>,
}

impl LoggingGuard {
    /// Run folder receiving the JSON log files, if file logging is enabled
    pub fn run_dir(&self) -> Option<&Path> {
        self.run_dir.as_deref()
    }
}

/// Initialize the global tracing subscriber
///
/// Layout when `log_dir` is set:
/// ```text
/// <log_dir>/
///   └── run_20250101_120000/
///       └── simsync.log
/// ```
///
/// # Errors
/// Fails if the run folder cannot be created or a global subscriber is already installed.
pub fn init_logging(debug_flags: &CrateDebugFlags, options: &LoggingOptions) -> Result<LoggingGuard> {
    let filter = debug_flags.to_filter_string(&options.level);
    let env_filter = EnvFilter::try_new(&filter)
        .with_context(|| format!("Invalid log filter: {}", filter))?;

    let mut layers: Vec<Box<dyn Layer<Registry> + Send + Sync>> = Vec::new();
    let mut file_guards = Vec::new();

    let console_layer = tracing_subscriber::fmt::layer()
        .with_target(false)
        .with_file(false)
        .with_line_number(false)
        .with_filter(env_filter.clone())
        .boxed();
    layers.push(console_layer);

    let mut run_dir = None;
    if let Some(base_log_dir) = &options.log_dir {
        let timestamp = Utc::now().format(RUN_TIMESTAMP_FORMAT);
        let run_folder = base_log_dir.join(format!("{}{}", RUN_PREFIX, timestamp));
        std::fs::create_dir_all(&run_folder).with_context(|| {
            format!("Failed to create log directory: {}", run_folder.display())
        })?;

        prune_run_dirs(
            base_log_dir,
            options.retention_days,
            options.retention_runs,
            Utc::now(),
        )?;

        let appender = rolling::daily(&run_folder, "simsync.log");
        let (non_blocking, guard) = tracing_appender::non_blocking(appender);
        file_guards.push(guard);

        let file_layer = tracing_subscriber::fmt::layer()
            .with_writer(non_blocking)
            .with_target(true)
            .with_file(true)
            .with_line_number(true)
            .json()
            .with_filter(env_filter)
            .boxed();
        layers.push(file_layer);
        run_dir = Some(run_folder);
    }

    Registry::default()
        .with(layers)
        .try_init()
        .context("A global tracing subscriber is already installed")?;

    Ok(LoggingGuard {
        _file_guards: file_guards,
        run_dir,
    })
}

/// Remove run folders older than `retention_days`, then keep only the newest
/// `retention_runs`. Returns the removed paths.
pub fn prune_run_dirs(
    base_log_dir: &Path,
    retention_days: u64,
    retention_runs: usize,
    now: DateTime<Utc>,
) -> Result<Vec<PathBuf>> {
    if !base_log_dir.exists() {
        return Ok(Vec::new());
    }

    let cutoff = now - Duration::days(retention_days as i64);

    let mut runs: Vec<(PathBuf, DateTime<Utc>)> = Vec::new();
    for entry in std::fs::read_dir(base_log_dir)? {
        let path = entry?.path();
        if !path.is_dir() {
            continue;
        }
        let stamp = path
            .file_name()
            .and_then(|n| n.to_str())
            .and_then(|n| n.strip_prefix(RUN_PREFIX))
            .and_then(|s| NaiveDateTime::parse_from_str(s, RUN_TIMESTAMP_FORMAT).ok());
        if let Some(naive) = stamp {
            runs.push((path, Utc.from_utc_datetime(&naive)));
        }
    }

    // Newest first
    runs.sort_by(|a, b| b.1.cmp(&a.1));

    let mut removed = Vec::new();
    for (index, (path, started)) in runs.into_iter().enumerate() {
        if started < cutoff || index >= retention_runs {
            std::fs::remove_dir_all(&path)
                .with_context(|| format!("Failed to remove old log directory {}", path.display()))?;
            removed.push(path);
        }
    }

    Ok(removed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    fn make_run(base: &Path, stamp: &str) -> PathBuf {
        let path = base.join(format!("{}{}", RUN_PREFIX, stamp));
        std::fs::create_dir_all(&path).unwrap();
        path
    }

    #[test]
    fn test_prune_by_age_and_count() {
        let dir = tempdir().unwrap();
        let now = Utc.with_ymd_and_hms(2025, 6, 1, 12, 0, 0).unwrap();

        let ancient = make_run(dir.path(), "20250101_000000");
        let a = make_run(dir.path(), "20250530_000000");
        let b = make_run(dir.path(), "20250531_000000");
        let c = make_run(dir.path(), "20250601_000000");
        let unrelated = dir.path().join("keep_me");
        std::fs::create_dir_all(&unrelated).unwrap();

        let removed = prune_run_dirs(dir.path(), 30, 2, now).unwrap();

        assert!(removed.contains(&ancient));
        assert!(removed.contains(&a));
        assert!(b.exists());
        assert!(c.exists());
        assert!(unrelated.exists());
    }

    #[test]
    fn test_prune_missing_dir_is_noop() {
        let dir = tempdir().unwrap();
        let missing = dir.path().join("nope");
        assert!(prune_run_dirs(&missing, 30, 10, Utc::now()).unwrap().is_empty());
    }
}
