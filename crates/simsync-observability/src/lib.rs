// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # simsync-observability
//!
//! Logging setup shared by the simsync tools and any host that embeds the sync client.
//!
//! Provides a console layer, optional JSON log files in a timestamped run folder, and
//! per-crate debug flags (`--debug simsync-agent`, `SIMSYNC_DEBUG=all`).

/// Crate version from Cargo.toml
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

pub mod cli;
pub mod init;

pub use cli::*;
pub use init::*;

/// Known simsync crate names for debug flags
pub const KNOWN_CRATES: &[&str] = &[
    "simsync",
    "simsync-agent",
    "simsync-config",
    "simsync-observability",
];
