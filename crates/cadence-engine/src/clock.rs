//! Simulation clock and real-time pacing math.
//!
//! The clock maps simulation seconds to wall-clock seconds. In
//! free-running mode it is just the event-driven `sim_time`; in
//! real-time mode it anchors a `(wall instant, sim time)` pair and
//! projects where simulation time "should" be, so the scheduler can
//! sleep ahead of the next due event or detect that it has fallen
//! behind. The pacing decision is a pure function of
//! `(next_time, anchor_sim, wall_elapsed, rate)` so it is testable
//! without sleeping.

use std::time::{Duration, Instant};

/// Pacing decision for the next due event or frame boundary.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Pacing {
    /// Free-running: dispatch immediately, no sleeping.
    Free,
    /// Ahead of wall clock: sleep up to this long before dispatching.
    Sleep(Duration),
    /// Behind wall clock by this many simulation seconds: dispatch
    /// immediately.
    Behind(f64),
}

/// Maps simulation time to wall-clock time.
///
/// `advance_to` only ever moves forward — an event scheduled for a past
/// time executes at the current `sim_time` and never rewinds the clock.
/// Toggling real-time mode or changing the rate re-anchors the wall
/// mapping at the current simulation time to avoid a jump discontinuity.
#[derive(Debug)]
pub struct Clock {
    sim_time: f64,
    rate: f64,
    realtime: bool,
    anchor_wall: Instant,
    anchor_sim: f64,
}

impl Clock {
    /// Create a clock at simulation time zero.
    ///
    /// `rate` is simulation seconds per wall second; callers validate
    /// it (finite, positive) before construction.
    pub fn new(realtime: bool, rate: f64) -> Self {
        Self {
            sim_time: 0.0,
            rate,
            realtime,
            anchor_wall: Instant::now(),
            anchor_sim: 0.0,
        }
    }

    /// Current simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.sim_time
    }

    /// Simulation seconds per wall second.
    pub fn rate(&self) -> f64 {
        self.rate
    }

    /// Whether real-time pacing is enabled.
    pub fn is_realtime(&self) -> bool {
        self.realtime
    }

    /// Advance simulation time monotonically. A target in the past is
    /// ignored.
    pub fn advance_to(&mut self, time: f64) {
        if time > self.sim_time {
            self.sim_time = time;
        }
    }

    /// Re-anchor the wall mapping at `sim_time` (and jump the clock
    /// there).
    pub fn set_clock(&mut self, sim_time: f64) {
        self.sim_time = sim_time;
        self.anchor_sim = sim_time;
        self.anchor_wall = Instant::now();
    }

    /// Toggle real-time pacing. Always re-anchors so the switch does
    /// not produce a discontinuity against wall clock.
    pub fn set_realtime(&mut self, sim_time: f64, enabled: bool) {
        self.realtime = enabled;
        self.set_clock(sim_time);
    }

    /// Change the clock rate, re-anchoring at `sim_time`.
    pub fn set_rate(&mut self, sim_time: f64, rate: f64) {
        self.rate = rate;
        self.set_clock(sim_time);
    }

    /// Pacing decision for an event (or frame boundary) due at
    /// `next_time`.
    pub fn pacing_for(&self, next_time: f64) -> Pacing {
        if !self.realtime {
            return Pacing::Free;
        }
        let wall_elapsed = self.anchor_wall.elapsed().as_secs_f64();
        pace(next_time, self.anchor_sim, wall_elapsed, self.rate)
    }
}

/// Pure pacing computation.
///
/// Projects simulation time forward from the anchor at `rate` and
/// compares against `next_time`. A non-negative gap becomes a wall
/// sleep of `gap / rate`; a negative gap means the simulation is behind
/// by that many simulation seconds.
pub(crate) fn pace(next_time: f64, anchor_sim: f64, wall_elapsed: f64, rate: f64) -> Pacing {
    let projected = anchor_sim + wall_elapsed * rate;
    let gap = next_time - projected;
    if gap >= 0.0 {
        Pacing::Sleep(Duration::from_secs_f64(gap / rate))
    } else {
        Pacing::Behind(-gap)
    }
}
