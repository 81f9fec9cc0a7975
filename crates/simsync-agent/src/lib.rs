// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! # simsync-agent
//!
//! Fixed-rate exchange of JSON key-value buffers between a simulation loop and an HTTP
//! sync server.
//!
//! - [`SyncSession`]: host-owned context; call `tick()` every frame
//! - [`ExchangeStateMachine`]: pure scheduling core (no I/O, no clock)
//! - [`TimingGate`]: halts or scales simulation time while an exchange is outstanding
//! - [`HttpFormTransport`]: `POST <server_url>/sync` with form field `outputData`
//! - [`server`] (feature `server`): the agent side of the same protocol

mod simsync_agent_error;

pub mod buffers;
pub mod config;
pub mod exchange;
pub mod session;
pub mod timing_gate;
pub mod transport;

#[cfg(feature = "server")]
mod sync_server_error;
#[cfg(feature = "server")]
pub mod server;

pub use buffers::{DataMap, InputBuffer, OutputBuffer, RESET_KEY};
pub use config::SessionConfig;
pub use exchange::{
    CompletionDisposition, ExchangeAction, ExchangeId, ExchangePhase, ExchangeStateMachine,
    SimSeconds,
};
pub use session::{ExchangeReport, SessionLifecycle, SyncSession, TickReport};
pub use simsync_agent_error::{Result, SyncAgentError};
pub use timing_gate::{SimClock, TimingGate};
pub use transport::{decode_response, sync_url, ExchangeTransport, HttpFormTransport};

pub use simsync_config::FailurePolicy;

#[cfg(feature = "server")]
pub use server::{serve, serve_listener, sync_router, EchoHandler, SyncHandler};
#[cfg(feature = "server")]
pub use sync_server_error::SyncServerError;

/// Re-export so hosts can build values without a direct serde_json dependency
pub use serde_json::{json, Value};
