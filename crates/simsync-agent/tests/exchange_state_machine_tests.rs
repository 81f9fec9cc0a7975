// Copyright 2025 Neuraville Inc.
// SPDX-License-Identifier: Apache-2.0

//! Scheduling properties of the exchange state machine under simulated latency

use simsync_agent::{ExchangeAction, ExchangeId, ExchangeStateMachine, SimClock, TimingGate};

struct Outcome {
    started: usize,
    max_outstanding: usize,
    final_time: f64,
}

/// Drive the machine for `frames` frames of `dt`, answering each exchange `latency`
/// wall-clock seconds after it started.
fn simulate(rate: f64, latency: f64, dt: f64, frames: usize, gate: TimingGate) -> Outcome {
    let mut machine = ExchangeStateMachine::new(rate);
    let mut clock = SimClock::new();
    let mut wall = 0.0;
    let mut outstanding: Vec<(ExchangeId, f64)> = Vec::new();
    let mut started = 0;
    let mut max_outstanding = 0;

    for _ in 0..frames {
        wall += dt;
        outstanding.retain(|(id, due)| {
            if *due <= wall {
                machine.complete(*id);
                false
            } else {
                true
            }
        });

        let scale = gate.time_scale(machine.is_in_flight());
        clock.advance(dt, scale);

        if let Some(ExchangeAction::Submit { id, .. }) = machine.tick(clock.now()) {
            outstanding.push((id, wall + latency));
            started += 1;
        }
        max_outstanding = max_outstanding.max(outstanding.len());
    }

    Outcome {
        started,
        max_outstanding,
        final_time: clock.now(),
    }
}

#[test]
fn test_never_more_than_one_outstanding() {
    let dt = 1.0 / 60.0;
    let frames = 600;
    for rate in [1.0, 30.0, 1000.0] {
        for latency in [0.0, 0.01, 0.5, 3.0] {
            for blocking in [false, true] {
                let outcome = simulate(rate, latency, dt, frames, TimingGate::new(blocking, 1.0));
                assert!(
                    outcome.max_outstanding <= 1,
                    "rate {} latency {} blocking {}: {} outstanding",
                    rate,
                    latency,
                    blocking,
                    outcome.max_outstanding
                );
                assert!(outcome.started >= 1);
            }
        }
    }
}

#[test]
fn test_rate_bounds_exchange_count() {
    let dt = 1.0 / 60.0;
    // 10 simulated seconds at 1 Hz with instant responses
    let outcome = simulate(1.0, 0.0, dt, 600, TimingGate::new(false, 1.0));
    assert!(outcome.started >= 10 && outcome.started <= 11, "{}", outcome.started);

    // At 1000 Hz the frame rate is the limit
    let outcome = simulate(1000.0, 0.0, dt, 600, TimingGate::new(false, 1.0));
    assert!(outcome.started <= 600);
    assert!(outcome.started >= 299);
}

#[test]
fn test_slow_responses_limit_exchange_rate() {
    let dt = 1.0 / 60.0;
    let outcome = simulate(30.0, 0.5, dt, 600, TimingGate::new(false, 1.0));
    // Each exchange occupies about half a second of wall time
    assert!(outcome.started <= 21, "{}", outcome.started);
    assert!(outcome.started >= 15, "{}", outcome.started);
}

#[test]
fn test_blocking_gate_freezes_time_during_exchanges() {
    let dt = 1.0 / 60.0;
    let free = simulate(1.0, 0.5, dt, 600, TimingGate::new(false, 1.0));
    let blocked = simulate(1.0, 0.5, dt, 600, TimingGate::new(true, 1.0));
    assert!((free.final_time - 10.0).abs() < 1e-6);
    assert!(blocked.final_time < free.final_time - 1.0);
}

#[test]
fn test_run_speed_scales_time_when_idle() {
    let dt = 1.0 / 60.0;
    let outcome = simulate(1.0, 0.0, dt, 600, TimingGate::new(false, 2.5));
    assert!((outcome.final_time - 25.0).abs() < 1e-6);
}
