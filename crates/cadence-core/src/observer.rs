//! Observer hook: how the kernel reports state transitions.
//!
//! The kernel has no logging layer; everything an embedder might want
//! to log, meter, or script against arrives as a [`KernelNotice`]
//! through a shared [`SimObserver`]. Notices are delivered from the sim
//! thread only, so implementations do not need internal ordering.

use std::sync::Arc;

use crate::id::EntityHandle;

/// Which work queue a dispatcher pass drained.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WorkKind {
    /// The per-tick platform (position) update pass.
    Platform,
    /// The per-tick sensor update pass.
    Sensor,
}

/// A state transition or incident the kernel reports to its embedder.
#[derive(Clone, Debug, PartialEq)]
pub enum KernelNotice {
    /// The scheduler is transitioning into `Active`.
    SimulationStarting {
        /// Simulation time at start.
        sim_time: f64,
    },
    /// The scheduler has reached `Complete`.
    SimulationComplete {
        /// Final simulation time.
        sim_time: f64,
    },
    /// Real-time pacing has fallen behind wall clock.
    ///
    /// Edge-triggered: sent once per not-behind → behind transition,
    /// not every tick.
    FallingBehind {
        /// How far simulation trails wall clock, in seconds.
        time_behind: f64,
    },
    /// Real-time pacing has caught back up to wall clock.
    CaughtUp,
    /// A frame took longer than its wall-clock budget.
    FrameOverrun {
        /// Index of the offending frame.
        frame: u64,
        /// Seconds over budget.
        overrun: f64,
    },
    /// An entity update hook failed; the pass continued without it.
    EntityUpdateFailed {
        /// The entity whose update failed.
        entity: EntityHandle,
        /// Which pass it failed in.
        kind: WorkKind,
        /// Panic payload or failure description.
        reason: String,
    },
    /// A dispatcher pass finished (emitted only with `debug` enabled).
    DispatchPass {
        /// Which queue was drained.
        kind: WorkKind,
        /// Items executed this pass.
        executed: usize,
        /// Items deferred past the soft deadline.
        deferred: usize,
        /// Wall-clock duration of the pass, microseconds.
        duration_us: u64,
    },
}

/// Receiver for [`KernelNotice`]s.
///
/// Shared as `Arc<dyn SimObserver>` between the scheduler and the
/// dispatcher. Implementations must be cheap: notices are delivered
/// synchronously on the sim thread.
pub trait SimObserver: Send + Sync {
    /// Deliver one notice.
    fn notify(&self, notice: KernelNotice);
}

/// Observer that discards every notice. The default when an embedder
/// wires nothing up.
#[derive(Clone, Copy, Debug, Default)]
pub struct NullObserver;

impl SimObserver for NullObserver {
    fn notify(&self, _notice: KernelNotice) {}
}

impl<T: SimObserver + ?Sized> SimObserver for Arc<T> {
    fn notify(&self, notice: KernelNotice) {
        (**self).notify(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn null_observer_accepts_notices() {
        let obs = NullObserver;
        obs.notify(KernelNotice::CaughtUp);
        obs.notify(KernelNotice::FallingBehind { time_behind: 2.0 });
    }

    #[test]
    fn arc_observer_delegates() {
        use std::sync::Mutex;

        struct Recorder(Mutex<Vec<KernelNotice>>);
        impl SimObserver for Recorder {
            fn notify(&self, notice: KernelNotice) {
                self.0.lock().unwrap().push(notice);
            }
        }

        let rec = Arc::new(Recorder(Mutex::new(Vec::new())));
        let as_dyn: Arc<dyn SimObserver> = rec.clone();
        as_dyn.notify(KernelNotice::CaughtUp);
        assert_eq!(rec.0.lock().unwrap().len(), 1);
    }
}
