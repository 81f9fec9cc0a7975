// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Simulation time gating

use crate::exchange::SimSeconds;

/// Decides how fast simulation time may advance
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TimingGate {
    pub block_on_response: bool,
    pub run_speed: f64,
}

impl TimingGate {
    pub fn new(block_on_response: bool, run_speed: f64) -> Self {
        Self {
            block_on_response,
            run_speed,
        }
    }

    /// Time scale for the current tick: 0 while blocked on a response, `run_speed` otherwise
    pub fn time_scale(&self, in_flight: bool) -> f64 {
        if self.block_on_response && in_flight {
            0.0
        } else {
            self.run_speed
        }
    }

    pub fn is_halted(&self, in_flight: bool) -> bool {
        self.time_scale(in_flight) == 0.0
    }
}

/// Accumulates scaled wall-clock deltas into simulation seconds
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct SimClock {
    now: SimSeconds,
}

impl SimClock {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn now(&self) -> SimSeconds {
        self.now
    }

    /// Advance by `real_dt` seconds at `scale`; negative or non-finite input is ignored
    pub fn advance(&mut self, real_dt: f64, scale: f64) -> SimSeconds {
        let step = real_dt * scale;
        if step.is_finite() && step > 0.0 {
            self.now += step;
        }
        self.now
    }

    /// Jump to a host-provided time; the clock never runs backwards
    pub fn set(&mut self, now: SimSeconds) {
        if now.is_finite() && now > self.now {
            self.now = now;
        }
    }

    pub fn reset(&mut self) {
        self.now = 0.0;
    }
}
