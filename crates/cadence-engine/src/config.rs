//! Scheduler configuration, validation, and error types.
//!
//! [`SchedulerConfig`] is the builder-input for constructing a
//! [`Scheduler`](crate::scheduler::Scheduler). `validate()` checks all
//! structural invariants up front: configuration errors are fatal and
//! reported synchronously, before the scheduler can reach `Active`.

use std::error::Error;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use cadence_core::observer::SimObserver;

// ── TimeAdvance ──────────────────────────────────────────────────

/// Which time-advance discipline the scheduler runs.
///
/// Both disciplines share the same event queue and clock; the
/// difference is only in how far time moves per tick and when the bulk
/// update hook fires.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum TimeAdvance {
    /// Discrete-event: each tick pops the next due event and jumps
    /// simulation time to it.
    EventStepped,
    /// Fixed-timestep: each tick advances one frame, draining every
    /// event due within it and invoking the bulk update hook once.
    FrameStepped {
        /// Frame length in simulation seconds. Must be finite and
        /// positive.
        frame_time: f64,
    },
}

// ── ConfigError ──────────────────────────────────────────────────

/// Errors detected during [`SchedulerConfig::validate()`].
#[derive(Debug, PartialEq)]
pub enum ConfigError {
    /// Frame time is NaN, infinite, zero, or negative.
    InvalidFrameTime {
        /// The rejected value.
        value: f64,
    },
    /// Clock rate is NaN, infinite, zero, negative, or so small its
    /// reciprocal overflows to infinity.
    InvalidClockRate {
        /// The rejected value.
        value: f64,
    },
    /// End time is NaN or infinite.
    InvalidEndTime {
        /// The rejected value.
        value: f64,
    },
    /// Frame-skip threshold is NaN, infinite, or negative.
    InvalidSkipThreshold {
        /// The rejected value.
        value: f64,
    },
    /// The pacing sleep slice is zero.
    ZeroSleepSlice,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidFrameTime { value } => {
                write!(f, "frame_time must be finite and positive, got {value}")
            }
            Self::InvalidClockRate { value } => {
                write!(f, "clock_rate must be finite and positive, got {value}")
            }
            Self::InvalidEndTime { value } => {
                write!(f, "end_time must be finite, got {value}")
            }
            Self::InvalidSkipThreshold { value } => {
                write!(
                    f,
                    "frame_skip_threshold must be finite and non-negative, got {value}"
                )
            }
            Self::ZeroSleepSlice => write!(f, "max_sleep_slice must be non-zero"),
        }
    }
}

impl Error for ConfigError {}

// ── SchedulerConfig ──────────────────────────────────────────────

/// Complete configuration for constructing a scheduler.
#[derive(Clone)]
pub struct SchedulerConfig {
    /// Time-advance discipline.
    pub time_advance: TimeAdvance,
    /// Whether simulation time is paced to wall clock.
    pub realtime: bool,
    /// Simulation seconds per wall second (real-time mode only).
    pub clock_rate: f64,
    /// Simulation time at which the run completes, or `None` to run
    /// until the caller completes it.
    pub end_time: Option<f64>,
    /// Upper bound on a single pacing sleep, so the sim thread stays
    /// responsive to externally injected events during a wait.
    pub max_sleep_slice: Duration,
    /// Frame-stepped + real-time only: when the simulation trails wall
    /// clock by more than this many seconds, frames are skipped
    /// (counter advances, no work) instead of caught up in a burst.
    /// `None` means always catch up.
    pub frame_skip_threshold: Option<f64>,
    /// Receiver for kernel notices. `None` discards them.
    pub observer: Option<Arc<dyn SimObserver>>,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            time_advance: TimeAdvance::EventStepped,
            realtime: false,
            clock_rate: 1.0,
            end_time: None,
            max_sleep_slice: Duration::from_millis(5),
            frame_skip_threshold: None,
            observer: None,
        }
    }
}

impl SchedulerConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if let TimeAdvance::FrameStepped { frame_time } = self.time_advance {
            if !frame_time.is_finite() || frame_time <= 0.0 {
                return Err(ConfigError::InvalidFrameTime { value: frame_time });
            }
        }
        // The reciprocal check rejects subnormal rates where 1.0/rate
        // is infinite, which would panic in Duration::from_secs_f64.
        let rate = self.clock_rate;
        if !rate.is_finite() || rate <= 0.0 || !(1.0 / rate).is_finite() {
            return Err(ConfigError::InvalidClockRate { value: rate });
        }
        if let Some(end) = self.end_time {
            if !end.is_finite() {
                return Err(ConfigError::InvalidEndTime { value: end });
            }
        }
        if let Some(t) = self.frame_skip_threshold {
            if !t.is_finite() || t < 0.0 {
                return Err(ConfigError::InvalidSkipThreshold { value: t });
            }
        }
        if self.max_sleep_slice.is_zero() {
            return Err(ConfigError::ZeroSleepSlice);
        }
        Ok(())
    }
}

impl fmt::Debug for SchedulerConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchedulerConfig")
            .field("time_advance", &self.time_advance)
            .field("realtime", &self.realtime)
            .field("clock_rate", &self.clock_rate)
            .field("end_time", &self.end_time)
            .field("max_sleep_slice", &self.max_sleep_slice)
            .field("frame_skip_threshold", &self.frame_skip_threshold)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        assert!(SchedulerConfig::default().validate().is_ok());
    }

    #[test]
    fn zero_frame_time_rejected() {
        let cfg = SchedulerConfig {
            time_advance: TimeAdvance::FrameStepped { frame_time: 0.0 },
            ..SchedulerConfig::default()
        };
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::InvalidFrameTime { value: 0.0 })
        );
    }

    #[test]
    fn nan_rate_rejected() {
        let cfg = SchedulerConfig {
            clock_rate: f64::NAN,
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidClockRate { .. })
        ));
    }

    #[test]
    fn subnormal_rate_rejected() {
        // Smallest positive subnormal: 1.0/rate is infinite, which
        // would panic later in Duration::from_secs_f64.
        let cfg = SchedulerConfig {
            clock_rate: f64::from_bits(1),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidClockRate { .. })
        ));
    }

    #[test]
    fn infinite_end_time_rejected() {
        let cfg = SchedulerConfig {
            end_time: Some(f64::INFINITY),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidEndTime { .. })
        ));
    }

    #[test]
    fn negative_skip_threshold_rejected() {
        let cfg = SchedulerConfig {
            frame_skip_threshold: Some(-1.0),
            ..SchedulerConfig::default()
        };
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidSkipThreshold { .. })
        ));
    }

    #[test]
    fn zero_sleep_slice_rejected() {
        let cfg = SchedulerConfig {
            max_sleep_slice: Duration::ZERO,
            ..SchedulerConfig::default()
        };
        assert_eq!(cfg.validate(), Err(ConfigError::ZeroSleepSlice));
    }
}
