//! The event trait and its execution contract.

use crate::error::ScheduleError;
use crate::id::{EntityHandle, EventHandle, Priority};

/// What the scheduler should do with an event after it has executed.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum Disposition {
    /// The event is finished; drop it.
    Delete,
    /// Re-enter the event into the queue at a new time.
    ///
    /// The event keeps its handle (identity), and its sequence number
    /// is refreshed so the reschedule interleaves FIFO-fairly with
    /// brand-new events at the new time slot. `priority` of `None`
    /// keeps the priority the event was last queued with.
    Reschedule {
        /// New execution time, simulation seconds.
        time: f64,
        /// New tie-break priority, or `None` to keep the current one.
        priority: Option<Priority>,
    },
}

/// Services available to an executing event body.
///
/// All event-queue mutation funnels through one logical owner — the sim
/// thread — so an event is handed a context rather than a lock: it can
/// schedule further events (including at the current instant) and
/// cancel pending ones without any re-entrant locking. Threads outside
/// the sim thread submit through the engine's ingress inbox instead.
pub trait ScheduleContext {
    /// Current simulation time in seconds.
    fn sim_time(&self) -> f64;

    /// Schedule `event` at `time` with tie-break `priority`.
    ///
    /// An event scheduled for a time in the past executes at the
    /// current simulation time; the clock never rewinds.
    fn schedule(
        &mut self,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) -> Result<EventHandle, ScheduleError>;

    /// Cancel a pending event. Returns `true` if the handle referred to
    /// a live entry. Cancellation is lazy: the entry is discarded when
    /// it surfaces, and its body is guaranteed never to execute.
    fn cancel(&mut self, handle: EventHandle) -> bool;
}

/// A unit of deferred work with a simulation-time deadline.
///
/// Events are owned by the queue from `schedule` until they are popped
/// for execution; `execute` receives the event by `&mut self` and the
/// returned [`Disposition`] decides whether the kernel drops it or
/// re-enters it at a new time. Bodies may schedule more events through
/// the context, including at the same instant — the ordering rule
/// `(time, priority, sequence)` applies uniformly, with no special
/// cases.
pub trait SimEvent: Send {
    /// Execute the event body at its scheduled time.
    fn execute(&mut self, ctx: &mut dyn ScheduleContext) -> Disposition;
}

/// Entity update hook consumed by the dispatcher.
///
/// Called concurrently across *distinct* entities by worker threads;
/// the dispatcher guarantees at most one in-flight call per entity per
/// pass. Implementations must not call back into the dispatcher's pass
/// drivers (re-entrant fan-out is unsupported). Updates that need to
/// schedule events do so through an `EventSubmitter` captured at setup.
pub trait EntityUpdater: Send + Sync {
    /// Update one platform's kinematic state to `sim_time`.
    fn update_platform(&self, entity: EntityHandle, sim_time: f64);

    /// Update one sensor to `sim_time`.
    fn update_sensor(&self, entity: EntityHandle, sim_time: f64);
}

/// Per-frame bulk update hook for frame-stepped scheduling.
///
/// Invoked once per frame (not once per entity-event) after the frame's
/// due events have drained. The dispatcher's pass driver implements
/// this; the hook must not call back into the scheduler's advance loop.
pub trait FrameUpdater {
    /// Run the bulk update for the frame ending at `sim_time`.
    fn update_frame(&mut self, sim_time: f64);
}

impl<F: FnMut(f64)> FrameUpdater for F {
    fn update_frame(&mut self, sim_time: f64) {
        self(sim_time);
    }
}
