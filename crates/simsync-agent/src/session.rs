// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Sync session: the host-owned context object
//!
//! A `SyncSession` owns both buffers, the exchange state machine, the timing gate and a
//! simulation clock. The host calls `tick()` once per frame; network round trips run as
//! tokio tasks and their results are picked up on later ticks without blocking.

use crate::buffers::{DataMap, InputBuffer, OutputBuffer, RESET_KEY};
use crate::config::SessionConfig;
use crate::exchange::{
    CompletionDisposition, ExchangeAction, ExchangeId, ExchangeStateMachine, SimSeconds,
};
use crate::simsync_agent_error::{Result, SyncAgentError};
use crate::timing_gate::{SimClock, TimingGate};
use crate::transport::{ExchangeTransport, HttpFormTransport};
use serde_json::Value;
use simsync_config::FailurePolicy;
use std::future::Future;
use std::sync::Arc;
use tokio::runtime::{Handle, Runtime};
use tokio::sync::oneshot;
use tokio::task::{block_in_place, JoinHandle};
use tracing::{debug, info, warn};

fn block_on_with<T>(
    handle: &Handle,
    runtime: Option<&Runtime>,
    future: impl Future<Output = T>,
) -> T {
    if Handle::try_current().is_ok() {
        block_in_place(|| handle.block_on(future))
    } else if let Some(runtime) = runtime {
        runtime.block_on(future)
    } else {
        handle.block_on(future)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionLifecycle {
    Created,
    Running,
    ShutDown,
}

/// What happened to a finished exchange
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeReport {
    /// Input buffer replaced with `keys` entries, output buffer cleared
    Applied { id: ExchangeId, keys: usize },
    /// Buffers untouched; `error` describes the failure
    Failed { id: ExchangeId, error: String },
}

impl ExchangeReport {
    pub fn id(&self) -> ExchangeId {
        match self {
            ExchangeReport::Applied { id, .. } | ExchangeReport::Failed { id, .. } => *id,
        }
    }

    pub fn is_applied(&self) -> bool {
        matches!(self, ExchangeReport::Applied { .. })
    }
}

/// Result of one `tick`
#[derive(Debug, Clone, PartialEq)]
pub struct TickReport {
    /// Simulation time after this tick
    pub sim_time: SimSeconds,
    /// Scale the host should apply to its own simulation for the coming frame; 0 when
    /// blocking and an exchange is outstanding after this tick
    pub time_scale: f64,
    /// Exchange started during this tick
    pub started: Option<ExchangeId>,
    /// Exchange that finished and was applied during this tick
    pub completed: Option<ExchangeReport>,
}

struct PendingExchange {
    id: ExchangeId,
    receiver: oneshot::Receiver<Result<DataMap>>,
    task: JoinHandle<()>,
}

/// Host-owned sync context
///
/// # Example
/// ```ignore
/// use simsync_agent::{SessionConfig, SyncSession};
///
/// let mut session = SyncSession::new(SessionConfig::new("http://localhost:8080"))?;
/// session.start()?;
///
/// loop {
///     session.set_output("steer", 0.25);
///     let report = session.tick(frame_dt)?;
///     engine.set_time_scale(report.time_scale);
///     if let Some(action) = session.get_input("bestAction") { /* ... */ }
/// }
/// ```
pub struct SyncSession {
    config: SessionConfig,
    transport: Arc<dyn ExchangeTransport>,

    /// Tokio runtime handle (ambient if available)
    runtime_handle: Handle,

    /// Owned runtime when created outside tokio
    runtime: Option<Arc<Runtime>>,

    lifecycle: SessionLifecycle,
    machine: ExchangeStateMachine,
    gate: TimingGate,
    clock: SimClock,
    output: OutputBuffer,
    input: InputBuffer,
    pending: Option<PendingExchange>,
    last_error: Option<String>,
}

impl SyncSession {
    /// Create a session that talks HTTP to `config.server_url`
    pub fn new(config: SessionConfig) -> Result<Self> {
        config.validate()?;
        let transport = HttpFormTransport::new(&config.server_url, None)?;
        Self::with_transport(config, Arc::new(transport))
    }

    /// Create a session over any transport
    pub fn with_transport(
        config: SessionConfig,
        transport: Arc<dyn ExchangeTransport>,
    ) -> Result<Self> {
        config.validate()?;

        let (runtime_handle, runtime) = if let Ok(handle) = Handle::try_current() {
            (handle, None)
        } else {
            let runtime = Runtime::new()
                .map_err(|e| SyncAgentError::Runtime(format!("Failed to create runtime: {}", e)))?;
            let handle = runtime.handle().clone();
            (handle, Some(Arc::new(runtime)))
        };

        Ok(Self {
            machine: ExchangeStateMachine::new(config.update_rate_hz),
            gate: TimingGate::new(config.block_on_response, config.run_speed),
            config,
            transport,
            runtime_handle,
            runtime,
            lifecycle: SessionLifecycle::Created,
            clock: SimClock::new(),
            output: OutputBuffer::new(),
            input: InputBuffer::new(),
            pending: None,
            last_error: None,
        })
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn lifecycle(&self) -> SessionLifecycle {
        self.lifecycle
    }

    /// Begin exchanging: both buffers are emptied and the reset marker is queued.
    ///
    /// Outputs written before `start()` are discarded.
    pub fn start(&mut self) -> Result<()> {
        match self.lifecycle {
            SessionLifecycle::Running => return Err(SyncAgentError::AlreadyStarted),
            SessionLifecycle::ShutDown => return Err(SyncAgentError::ShutDown),
            SessionLifecycle::Created => {}
        }

        self.output.clear();
        self.input.clear();
        self.request_reset();
        self.lifecycle = SessionLifecycle::Running;

        info!(
            "[SYNC] Session started: {} at {} Hz (blocking: {}, run speed: {})",
            self.config.server_url,
            self.config.update_rate_hz,
            self.config.block_on_response,
            self.config.run_speed
        );
        Ok(())
    }

    /// Abort any outstanding exchange and stop the session. Idempotent.
    pub fn shutdown(&mut self) {
        if self.lifecycle == SessionLifecycle::ShutDown {
            return;
        }
        if let Some(id) = self.cancel_in_flight() {
            debug!("[SYNC] Exchange {} aborted by shutdown", id);
        }
        self.lifecycle = SessionLifecycle::ShutDown;
        info!("[SYNC] Session shut down");
    }

    /// Queue `reset = true` for the next exchange
    pub fn request_reset(&mut self) {
        self.output.set(RESET_KEY, true);
    }

    /// Write an output value; the last write per name before an exchange is what gets sent
    pub fn set_output(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        self.output.set(name, value);
    }

    /// Drop one pending output value, returning it if present
    pub fn remove_output(&mut self, name: &str) -> Option<Value> {
        self.output.remove(name)
    }

    /// Drop every pending output value
    pub fn clear_output(&mut self) {
        self.output.clear();
    }

    /// Read a value from the last successful exchange; `None` for unknown names
    pub fn get_input(&self, name: &str) -> Option<&Value> {
        self.input.get(name)
    }

    pub fn output(&self) -> &OutputBuffer {
        &self.output
    }

    pub fn input(&self) -> &InputBuffer {
        &self.input
    }

    /// Simulation time at which the most recent exchange started
    pub fn last_sync_time(&self) -> Option<SimSeconds> {
        self.machine.last_sync_time()
    }

    pub fn sim_time(&self) -> SimSeconds {
        self.clock.now()
    }

    pub fn in_flight(&self) -> Option<ExchangeId> {
        self.machine.in_flight()
    }

    pub fn is_in_flight(&self) -> bool {
        self.machine.is_in_flight()
    }

    /// Current time scale from the gate
    pub fn time_scale(&self) -> f64 {
        self.gate.time_scale(self.machine.is_in_flight())
    }

    /// Description of the most recent failed exchange, if any
    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    fn ensure_running(&self) -> Result<()> {
        match self.lifecycle {
            SessionLifecycle::Running => Ok(()),
            SessionLifecycle::Created => Err(SyncAgentError::NotStarted),
            SessionLifecycle::ShutDown => Err(SyncAgentError::ShutDown),
        }
    }

    /// Advance one frame of `real_dt` wall-clock seconds.
    ///
    /// Order: apply a finished exchange, advance simulation time through the gate, then
    /// start an exchange if one is due.
    pub fn tick(&mut self, real_dt: f64) -> Result<TickReport> {
        self.ensure_running()?;
        let finished = self.poll_completion();
        let scale = self.time_scale();
        self.clock.advance(real_dt, scale);
        self.finish_tick(finished)
    }

    /// Like `tick`, for hosts that keep their own simulation clock
    pub fn tick_at(&mut self, sim_now: SimSeconds) -> Result<TickReport> {
        self.ensure_running()?;
        let finished = self.poll_completion();
        self.clock.set(sim_now);
        self.finish_tick(finished)
    }

    /// A surfaced failure returns before a new exchange can start; the next tick starts it.
    fn finish_tick(
        &mut self,
        finished: Option<(ExchangeReport, Option<SyncAgentError>)>,
    ) -> Result<TickReport> {
        let (completed, failure) = match finished {
            Some((report, failure)) => (Some(report), failure),
            None => (None, None),
        };
        if let Some(error) = failure {
            return Err(error);
        }

        let started = match self.machine.tick(self.clock.now()) {
            Some(action) => Some(self.submit(action)?),
            None => None,
        };

        // Scale for the coming frame, so an exchange started just now already halts time
        Ok(TickReport {
            sim_time: self.clock.now(),
            time_scale: self.time_scale(),
            started,
            completed,
        })
    }

    /// Start one exchange now, ignoring the update period, and wait for it.
    ///
    /// # Errors
    /// `InFlight` if an exchange is already outstanding; under `FailurePolicy::Surface`
    /// also the exchange failure itself.
    pub async fn exchange_now(&mut self) -> Result<ExchangeReport> {
        self.ensure_running()?;
        if let Some(id) = self.machine.in_flight() {
            return Err(SyncAgentError::InFlight(id));
        }
        let Some(action) = self.machine.force(self.clock.now()) else {
            return Err(SyncAgentError::Runtime("exchange could not be started".to_string()));
        };
        let id = self.submit(action)?;
        match self.settle().await? {
            Some(report) => Ok(report),
            None => Err(SyncAgentError::Cancelled(id)),
        }
    }

    /// Wait for the outstanding exchange, if any, and apply it.
    ///
    /// Cancel-safe: if the future is dropped before the result arrives, the exchange stays
    /// pending and a later `tick` or `settle` picks it up.
    pub async fn settle(&mut self) -> Result<Option<ExchangeReport>> {
        let Some(pending) = self.pending.as_mut() else {
            return Ok(None);
        };
        let result = match (&mut pending.receiver).await {
            Ok(result) => result,
            Err(_) => Err(SyncAgentError::Runtime(
                "exchange task ended without a result".to_string(),
            )),
        };
        let id = pending.id;
        self.pending = None;
        match self.apply(id, result) {
            Some((_, Some(error))) => Err(error),
            Some((report, None)) => Ok(Some(report)),
            None => Ok(None),
        }
    }

    /// Blocking form of `settle` for hosts without an async context
    pub fn settle_blocking(&mut self) -> Result<Option<ExchangeReport>> {
        let handle = self.runtime_handle.clone();
        let runtime = self.runtime.clone();
        block_on_with(&handle, runtime.as_deref(), self.settle())
    }

    /// Abort the outstanding exchange. Buffers are left as they are.
    pub fn cancel_in_flight(&mut self) -> Option<ExchangeId> {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
        let id = self.machine.cancel();
        if let Some(id) = id {
            debug!("[SYNC] Exchange {} cancelled", id);
        }
        id
    }

    fn submit(&mut self, action: ExchangeAction) -> Result<ExchangeId> {
        let ExchangeAction::Submit { id, started_at } = action;

        let payload = match self.output.to_json() {
            Ok(payload) => payload,
            Err(e) => {
                self.machine.complete(id);
                return Err(e);
            }
        };

        debug!(
            "[SYNC] Exchange {} started at t={:.4}s with {} output keys",
            id,
            started_at,
            self.output.len()
        );

        let (tx, rx) = oneshot::channel();
        let transport = Arc::clone(&self.transport);
        let timeout = self.config.response_timeout;
        let task = self.runtime_handle.spawn(async move {
            let result = match timeout {
                Some(limit) => tokio::time::timeout(limit, transport.exchange(payload))
                    .await
                    .unwrap_or(Err(SyncAgentError::Timeout(limit))),
                None => transport.exchange(payload).await,
            };
            // Receiver gone means the exchange was cancelled
            let _ = tx.send(result);
        });

        self.pending = Some(PendingExchange {
            id,
            receiver: rx,
            task,
        });
        Ok(id)
    }

    fn poll_completion(&mut self) -> Option<(ExchangeReport, Option<SyncAgentError>)> {
        let pending = self.pending.as_mut()?;
        let result = match pending.receiver.try_recv() {
            Ok(result) => result,
            Err(oneshot::error::TryRecvError::Empty) => return None,
            Err(oneshot::error::TryRecvError::Closed) => Err(SyncAgentError::Runtime(
                "exchange task ended without a result".to_string(),
            )),
        };
        let id = pending.id;
        self.pending = None;
        self.apply(id, result)
    }

    /// Apply a finished exchange. The error half is set only when the failure must be
    /// surfaced to the caller.
    fn apply(
        &mut self,
        id: ExchangeId,
        result: Result<DataMap>,
    ) -> Option<(ExchangeReport, Option<SyncAgentError>)> {
        if self.machine.complete(id) == CompletionDisposition::Stale {
            debug!("[SYNC] Ignoring stale completion for exchange {}", id);
            return None;
        }

        match result {
            Ok(data) => {
                let keys = data.len();
                self.input.replace(data);
                self.output.clear();
                self.last_error = None;
                debug!("[SYNC] Exchange {} applied ({} input keys)", id, keys);
                Some((ExchangeReport::Applied { id, keys }, None))
            }
            Err(error) => {
                let message = error.to_string();
                self.last_error = Some(message.clone());
                let report = ExchangeReport::Failed { id, error: message };
                match self.config.failure_policy {
                    FailurePolicy::Suppress => {
                        warn!("[SYNC] Exchange {} failed: {}", id, error);
                        Some((report, None))
                    }
                    FailurePolicy::Surface => Some((
                        report,
                        Some(SyncAgentError::ExchangeFailed {
                            id,
                            source: Box::new(error),
                        }),
                    )),
                }
            }
        }
    }
}

impl Drop for SyncSession {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }
}

impl std::fmt::Debug for SyncSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncSession")
            .field("config", &self.config)
            .field("lifecycle", &self.lifecycle)
            .field("sim_time", &self.clock.now())
            .field("in_flight", &self.machine.in_flight())
            .field("output_keys", &self.output.len())
            .field("input_keys", &self.input.len())
            .finish()
    }
}
