//! Error types shared across the kernel.
//!
//! The kernel's propagation policy: configuration and lifecycle misuse
//! fail fast and synchronously; stale references and per-entity worker
//! failures recover locally and surface only through the observer hook;
//! an empty queue is a normal idle condition, not an error.

use std::error::Error;
use std::fmt;

use crate::lifecycle::SimState;

/// Error scheduling an event into the queue.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ScheduleError {
    /// The scheduler is in a state that does not accept new events.
    NotAccepting {
        /// The state that rejected the schedule call.
        state: SimState,
    },
    /// The requested execution time is NaN or infinite.
    InvalidTime {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for ScheduleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAccepting { state } => {
                write!(f, "scheduler in state '{state}' does not accept events")
            }
            Self::InvalidTime { value } => {
                write!(f, "event time must be finite, got {value}")
            }
        }
    }
}

impl Error for ScheduleError {}

/// Error submitting an event through the cross-thread ingress inbox.
#[derive(Debug, PartialEq)]
pub enum SubmitError {
    /// The scheduler side of the inbox has been torn down.
    Shutdown,
    /// The requested execution time is NaN or infinite.
    InvalidTime {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for SubmitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Shutdown => write!(f, "scheduler inbox has shut down"),
            Self::InvalidTime { value } => {
                write!(f, "event time must be finite, got {value}")
            }
        }
    }
}

impl Error for SubmitError {}

/// Error from a lifecycle method called in the wrong state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct LifecycleError {
    /// State the scheduler was in.
    pub from: SimState,
    /// State the caller asked for.
    pub to: SimState,
}

impl fmt::Display for LifecycleError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid lifecycle transition: {} -> {}", self.from, self.to)
    }
}

impl Error for LifecycleError {}
