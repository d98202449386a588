//! Scheduler lifecycle state machine.

use std::fmt;

/// The scheduler's lifecycle state.
///
/// Transitions are strictly forward — there are no cycles and no way
/// back. [`Active`](SimState::Active) is the only state in which events
/// execute and simulation time advances; [`Complete`](SimState::Complete)
/// is terminal.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
pub enum SimState {
    /// Constructed, `initialize()` not yet called.
    PendingInitialize,
    /// Inside `initialize()`.
    Initializing,
    /// Initialized, waiting for `start()`.
    PendingStart,
    /// Inside `start()`.
    Starting,
    /// Running: events execute and simulation time advances.
    Active,
    /// Completion requested; the current tick finishes, then terminal.
    PendingComplete,
    /// Terminal. No further events execute and none may be scheduled.
    Complete,
}

impl SimState {
    /// Whether `schedule()` accepts new events in this state.
    ///
    /// Everything before the terminal state accepts: events scheduled
    /// before `initialize()` form the initial workload.
    pub fn accepts_events(self) -> bool {
        self != Self::Complete
    }

    /// Whether the given transition is a legal forward step.
    pub fn can_transition_to(self, next: Self) -> bool {
        use SimState::*;
        matches!(
            (self, next),
            (PendingInitialize, Initializing)
                | (Initializing, PendingStart)
                | (PendingStart, Starting)
                | (Starting, Active)
                | (Active, PendingComplete)
                | (PendingComplete, Complete)
        )
    }
}

impl fmt::Display for SimState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::PendingInitialize => "pending-initialize",
            Self::Initializing => "initializing",
            Self::PendingStart => "pending-start",
            Self::Starting => "starting",
            Self::Active => "active",
            Self::PendingComplete => "pending-complete",
            Self::Complete => "complete",
        };
        f.write_str(s)
    }
}
