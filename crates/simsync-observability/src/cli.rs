// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Per-crate debug flags
//!
//! Crate names come from `--debug <crate>` (or `--debug all`) and `SIMSYNC_DEBUG`. A named
//! crate logs at debug level while the rest stay at the configured base level.

use std::collections::BTreeSet;
use std::env;

use crate::KNOWN_CRATES;

/// Per-crate debug switches collected from `--debug` values and `SIMSYNC_DEBUG`
///
/// # Example
/// ```rust
/// use simsync_observability::CrateDebugFlags;
///
/// let flags = CrateDebugFlags::from_names(["simsync-agent"]);
/// assert!(flags.is_enabled("simsync-agent"));
/// ```
#[derive(Debug, Clone, Default)]
pub struct CrateDebugFlags {
    pub enabled_crates: BTreeSet<String>,
}

impl CrateDebugFlags {
    /// Build flags from crate names; `all` enables every known crate
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut flags = CrateDebugFlags::default();
        for name in names {
            flags.merge_env_value(name.as_ref());
        }
        flags
    }

    /// Merge a `SIMSYNC_DEBUG`-style value: `all` or comma-separated crate names
    pub fn merge_env_value(&mut self, value: &str) {
        if value.trim() == "all" {
            self.enable_all();
            return;
        }
        for crate_name in value.split(',') {
            let crate_name = crate_name.trim();
            if !crate_name.is_empty() {
                self.enabled_crates.insert(crate_name.to_string());
            }
        }
    }

    fn enable_all(&mut self) {
        for crate_name in KNOWN_CRATES {
            self.enabled_crates.insert(crate_name.to_string());
        }
    }

    pub fn is_enabled(&self, crate_name: &str) -> bool {
        self.enabled_crates.contains(crate_name)
    }

    pub fn any_enabled(&self) -> bool {
        !self.enabled_crates.is_empty()
    }

    /// Build an `EnvFilter` directive string
    ///
    /// Tracing targets are module paths, so `simsync-agent` becomes `simsync_agent=debug`.
    /// The base level applies to everything else.
    pub fn to_filter_string(&self, base_level: &str) -> String {
        let mut filters = vec![base_level.to_lowercase()];
        for crate_name in &self.enabled_crates {
            filters.push(format!("{}=debug", crate_name.replace('-', "_")));
        }
        filters.join(",")
    }
}

/// Combine `--debug` values with the `SIMSYNC_DEBUG` environment variable
pub fn resolve_debug_flags<I, S>(names: I) -> CrateDebugFlags
where
    I: IntoIterator<Item = S>,
    S: AsRef<str>,
{
    let mut flags = CrateDebugFlags::from_names(names);
    if let Ok(value) = env::var("SIMSYNC_DEBUG") {
        flags.merge_env_value(&value);
    }
    flags
}

/// Generate help text for debug flags
pub fn debug_flags_help() -> String {
    format!(
        r#"Debug Flags:
  --debug all                    Enable debug logging for all crates
  --debug {{crate-name}}          Enable debug logging for specific crate (repeatable)

Available crates:
  {}

Environment Variable:
  SIMSYNC_DEBUG={{crate-name}}[,{{crate-name}}]  Enable debug for crates (comma-separated)
  SIMSYNC_DEBUG=all                               Enable debug for all crates
"#,
        KNOWN_CRATES.join(", ")
    )
}
