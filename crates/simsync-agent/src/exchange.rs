// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Runtime-agnostic exchange scheduling state machine.
//!
//! Decides *when* an exchange starts and tracks the single outstanding one. It performs no
//! I/O and never reads a clock: the driver passes simulation time in and executes the
//! returned actions.
//!
//! Two phases: `Idle` and `InFlight`. `tick` moves Idle → InFlight when the update period
//! has elapsed; `complete` or `cancel` moves back to Idle.

use std::fmt;

/// Simulation time in seconds, as seen by the driver.
pub type SimSeconds = f64;

/// Identifies one exchange. Ids grow monotonically within a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ExchangeId(u64);

impl ExchangeId {
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    pub fn value(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for ExchangeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExchangePhase {
    Idle,
    InFlight(ExchangeId),
}

/// Work the driver must perform for the state machine
#[derive(Debug, Clone, PartialEq)]
pub enum ExchangeAction {
    /// Serialize the output buffer and submit it under this id
    Submit { id: ExchangeId, started_at: SimSeconds },
}

/// How a completion was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionDisposition {
    /// Matched the outstanding exchange; the machine is Idle again
    Accepted,
    /// Belongs to an exchange that was cancelled or already completed; ignore its payload
    Stale,
}

#[derive(Debug, Clone)]
pub struct ExchangeStateMachine {
    update_rate_hz: f64,
    phase: ExchangePhase,
    last_sync_time: Option<SimSeconds>,
    next_id: u64,
    completed_count: u64,
}

impl ExchangeStateMachine {
    /// `update_rate_hz` must be positive and finite; the session config validates it.
    pub fn new(update_rate_hz: f64) -> Self {
        Self {
            update_rate_hz,
            phase: ExchangePhase::Idle,
            last_sync_time: None,
            next_id: 1,
            completed_count: 0,
        }
    }

    pub fn phase(&self) -> &ExchangePhase {
        &self.phase
    }

    pub fn in_flight(&self) -> Option<ExchangeId> {
        match self.phase {
            ExchangePhase::InFlight(id) => Some(id),
            ExchangePhase::Idle => None,
        }
    }

    pub fn is_in_flight(&self) -> bool {
        self.in_flight().is_some()
    }

    /// Simulation time at which the most recent exchange started
    pub fn last_sync_time(&self) -> Option<SimSeconds> {
        self.last_sync_time
    }

    pub fn update_period(&self) -> SimSeconds {
        1.0 / self.update_rate_hz
    }

    /// Number of exchanges that have returned to Idle through `complete`
    pub fn completed_count(&self) -> u64 {
        self.completed_count
    }

    /// True when the update period has elapsed since the last exchange started.
    /// The first exchange is due immediately.
    pub fn is_due(&self, now: SimSeconds) -> bool {
        match self.last_sync_time {
            None => true,
            Some(last) => now - last >= self.update_period(),
        }
    }

    /// Evaluate one scheduling tick. Returns a submit action when an exchange should start.
    ///
    /// Never starts a second exchange while one is outstanding.
    pub fn tick(&mut self, now: SimSeconds) -> Option<ExchangeAction> {
        if self.is_in_flight() || !self.is_due(now) {
            return None;
        }
        Some(self.begin(now))
    }

    /// Start an exchange regardless of the update period. Returns `None` if one is
    /// already outstanding.
    pub fn force(&mut self, now: SimSeconds) -> Option<ExchangeAction> {
        if self.is_in_flight() {
            return None;
        }
        Some(self.begin(now))
    }

    fn begin(&mut self, now: SimSeconds) -> ExchangeAction {
        let id = ExchangeId(self.next_id);
        self.next_id += 1;
        self.phase = ExchangePhase::InFlight(id);
        self.last_sync_time = Some(now);
        ExchangeAction::Submit {
            id,
            started_at: now,
        }
    }

    /// Report that exchange `id` finished (successfully or not).
    pub fn complete(&mut self, id: ExchangeId) -> CompletionDisposition {
        if self.in_flight() == Some(id) {
            self.phase = ExchangePhase::Idle;
            self.completed_count += 1;
            CompletionDisposition::Accepted
        } else {
            CompletionDisposition::Stale
        }
    }

    /// Abandon the outstanding exchange. Any later completion for it is stale.
    pub fn cancel(&mut self) -> Option<ExchangeId> {
        let id = self.in_flight();
        self.phase = ExchangePhase::Idle;
        id
    }

    /// Forget timing history so the next tick is due immediately
    pub fn reset_schedule(&mut self) {
        self.last_sync_time = None;
    }
}
