//! The scheduler: lifecycle, event-stepped time advance, and pacing.
//!
//! A [`Scheduler`] owns the event queue and the clock and drives time
//! forward on a single logical thread (the "sim thread"). The two
//! time-advance disciplines, event-stepped here and frame-stepped in
//! the sibling `frame` module, are one type parameterized by
//! [`TimeAdvance`], sharing the queue, clock, pacing, and lifecycle
//! machinery.
//!
//! # Suspension points
//!
//! The sim thread blocks only inside the real-time pacing sleep, which
//! is sliced (`max_sleep_slice`) and drains the ingress inbox between
//! slices so an externally injected event with an earlier deadline
//! interrupts the wait.

use std::thread;

use cadence_core::{
    Disposition, EventHandle, FrameUpdater, KernelNotice, LifecycleError, Priority,
    ScheduleContext, ScheduleError, SimEvent, SimObserver, SimState,
};

use crate::clock::{Clock, Pacing};
use crate::config::{ConfigError, SchedulerConfig, TimeAdvance};
use crate::inbox::{EventSubmitter, Inbox};
use crate::metrics::SchedulerMetrics;
use crate::queue::{EventKey, EventQueue, PendingEvent};

// ── Advance ──────────────────────────────────────────────────────

/// Outcome of one scheduler tick.
#[derive(Debug, PartialEq)]
pub enum Advance {
    /// One event executed (event-stepped mode).
    Executed {
        /// Simulation time after the event.
        time: f64,
    },
    /// One frame advanced (frame-stepped mode).
    Frame {
        /// Index of the frame just finished.
        frame: u64,
        /// Simulation time at the frame boundary.
        time: f64,
    },
    /// No work was due. A normal condition, not an error; the caller
    /// decides whether to block, inject work, or complete.
    Idle,
    /// The simulation has reached the terminal state.
    Complete {
        /// Final simulation time.
        time: f64,
    },
}

// ── Scheduler ────────────────────────────────────────────────────

/// Drives simulation time via the event queue and clock.
///
/// Lifecycle: `PendingInitialize → Initializing → PendingStart →
/// Starting → Active → PendingComplete → Complete`, strictly forward.
/// Events execute only in `Active`. Events may be scheduled in every
/// state except `Complete`; events scheduled before `initialize()`
/// form the initial workload.
pub struct Scheduler {
    pub(crate) queue: EventQueue,
    pub(crate) clock: Clock,
    inbox: Inbox,
    state: SimState,
    time_advance: TimeAdvance,
    pub(crate) end_time: Option<f64>,
    max_sleep_slice: std::time::Duration,
    pub(crate) frame_skip_threshold: Option<f64>,
    observer: Option<std::sync::Arc<dyn SimObserver>>,
    pub(crate) frame_updater: Option<Box<dyn FrameUpdater>>,
    pub(crate) frame: u64,
    pub(crate) metrics: SchedulerMetrics,
    /// Edge-trigger latch for behind/caught-up notices.
    behind: bool,
    pub(crate) time_behind: f64,
}

impl Scheduler {
    /// Construct a scheduler from a validated configuration.
    pub fn new(config: SchedulerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let queue = EventQueue::new();
        let inbox = Inbox::new(queue.handle_source());
        Ok(Self {
            queue,
            clock: Clock::new(config.realtime, config.clock_rate),
            inbox,
            state: SimState::PendingInitialize,
            time_advance: config.time_advance,
            end_time: config.end_time,
            max_sleep_slice: config.max_sleep_slice,
            frame_skip_threshold: config.frame_skip_threshold,
            observer: config.observer,
            frame_updater: None,
            frame: 0,
            metrics: SchedulerMetrics::default(),
            behind: false,
            time_behind: 0.0,
        })
    }

    // ── Accessors ────────────────────────────────────────────────

    /// Current lifecycle state.
    pub fn state(&self) -> SimState {
        self.state
    }

    /// Current simulation time in seconds.
    pub fn sim_time(&self) -> f64 {
        self.clock.sim_time()
    }

    /// Whether real-time pacing is currently enabled.
    pub fn is_realtime(&self) -> bool {
        self.clock.is_realtime()
    }

    /// How far simulation currently trails wall clock, in simulation
    /// seconds. Zero when on pace or free-running.
    pub fn time_behind(&self) -> f64 {
        self.time_behind
    }

    /// Snapshot of the cumulative counters.
    pub fn metrics(&self) -> SchedulerMetrics {
        let mut m = self.metrics.clone();
        m.cancelled_discards = self.queue.discard_count();
        m
    }

    /// Number of live pending events (excludes lazily-cancelled
    /// entries).
    pub fn pending_events(&self) -> usize {
        self.queue.len()
    }

    /// A cloneable cross-thread submitter feeding this scheduler's
    /// ingress inbox.
    pub fn submitter(&self) -> EventSubmitter {
        self.inbox.submitter()
    }

    /// Install the per-frame bulk update hook (frame-stepped mode).
    pub fn set_frame_updater(&mut self, updater: Box<dyn FrameUpdater>) {
        self.frame_updater = Some(updater);
    }

    // ── Scheduling API ───────────────────────────────────────────

    /// Schedule an event at `time` with tie-break `priority`.
    pub fn schedule(
        &mut self,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) -> Result<EventHandle, ScheduleError> {
        if !self.state.accepts_events() {
            return Err(ScheduleError::NotAccepting { state: self.state });
        }
        self.queue.schedule(event, time, priority)
    }

    /// Cancel a pending event. Lazy: the entry is discarded when it
    /// surfaces, and its body never executes.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        self.queue.cancel(handle)
    }

    /// Observe the next due event's key without removing it.
    pub fn peek(&mut self) -> Option<EventKey> {
        self.drain_inbox();
        self.queue.peek()
    }

    /// Remove and take ownership of the next due event without
    /// executing it.
    pub fn pop(&mut self) -> Option<PendingEvent> {
        self.drain_inbox();
        self.queue.pop()
    }

    /// Discard every pending event (queue and inbox). Used on teardown
    /// or full restart.
    pub fn reset(&mut self) {
        self.inbox.drain(|_entry| {});
        self.queue.reset();
    }

    // ── Lifecycle API ────────────────────────────────────────────

    /// `PendingInitialize → PendingStart`.
    pub fn initialize(&mut self) -> Result<(), LifecycleError> {
        self.transition(SimState::Initializing)?;
        self.transition(SimState::PendingStart)
    }

    /// `PendingStart → Active`. Re-anchors the clock and notifies
    /// `SimulationStarting`.
    pub fn start(&mut self) -> Result<(), LifecycleError> {
        self.transition(SimState::Starting)?;
        let sim_time = self.clock.sim_time();
        self.notify(KernelNotice::SimulationStarting { sim_time });
        self.clock.set_clock(sim_time);
        self.transition(SimState::Active)
    }

    /// Request completion at `sim_time`. Idempotent once the scheduler
    /// is past `Active`.
    pub fn complete(&mut self, sim_time: f64) -> Result<(), LifecycleError> {
        match self.state {
            SimState::Active => {
                self.clock.advance_to(sim_time);
                self.transition(SimState::PendingComplete)
            }
            SimState::PendingComplete | SimState::Complete => Ok(()),
            from => Err(LifecycleError {
                from,
                to: SimState::PendingComplete,
            }),
        }
    }

    /// Toggle real-time pacing at runtime. Always re-anchors the clock
    /// at `sim_time` so the switch is free of jump discontinuities.
    pub fn set_realtime(&mut self, sim_time: f64, enabled: bool) {
        self.clock.set_realtime(sim_time, enabled);
        if !enabled {
            self.behind = false;
            self.time_behind = 0.0;
        }
    }

    /// Change the clock rate at runtime, re-anchoring at the current
    /// simulation time.
    pub fn set_clock_rate(&mut self, rate: f64) -> Result<(), ConfigError> {
        if !rate.is_finite() || rate <= 0.0 || !(1.0 / rate).is_finite() {
            return Err(ConfigError::InvalidClockRate { value: rate });
        }
        self.clock.set_rate(self.clock.sim_time(), rate);
        Ok(())
    }

    /// Block (in bounded, inbox-draining slices) until the next due
    /// event may be dispatched under real-time pacing. A no-op when
    /// free-running or when the queue is idle.
    pub fn wait_for_advance_time(&mut self) {
        self.drain_inbox();
        if let Some(key) = self.queue.peek() {
            self.pace_until(key.time);
        }
    }

    // ── Time advance ─────────────────────────────────────────────

    /// Run one tick: one popped event (event-stepped) or one frame
    /// (frame-stepped). Returns [`Advance::Idle`] outside `Active`
    /// before completion, and [`Advance::Complete`] from then on.
    pub fn advance(&mut self) -> Advance {
        match self.state {
            SimState::Active => {}
            SimState::PendingComplete => return self.finish_completion(),
            SimState::Complete => {
                return Advance::Complete {
                    time: self.clock.sim_time(),
                }
            }
            _ => return Advance::Idle,
        }
        match self.time_advance {
            TimeAdvance::EventStepped => self.advance_event(),
            TimeAdvance::FrameStepped { frame_time } => self.advance_frame(frame_time),
        }
    }

    /// Drive ticks until the simulation completes or goes idle.
    ///
    /// With an `end_time` configured, an idle queue completes the run
    /// at `end_time`; without one, idleness returns control to the
    /// caller.
    pub fn run(&mut self) -> Advance {
        loop {
            match self.advance() {
                Advance::Executed { .. } | Advance::Frame { .. } => {}
                Advance::Idle => match self.end_time {
                    Some(end) if self.state == SimState::Active => {
                        self.clock.advance_to(end);
                        // Already checked: Active always transitions.
                        let _ = self.complete(end);
                    }
                    _ => return Advance::Idle,
                },
                done @ Advance::Complete { .. } => return done,
            }
        }
    }

    // ── Internals ────────────────────────────────────────────────

    fn transition(&mut self, next: SimState) -> Result<(), LifecycleError> {
        if self.state.can_transition_to(next) {
            self.state = next;
            Ok(())
        } else {
            Err(LifecycleError {
                from: self.state,
                to: next,
            })
        }
    }

    pub(crate) fn finish_completion(&mut self) -> Advance {
        // PendingComplete is the only caller; the transition is legal.
        let _ = self.transition(SimState::Complete);
        let time = self.clock.sim_time();
        self.notify(KernelNotice::SimulationComplete { sim_time: time });
        Advance::Complete { time }
    }

    pub(crate) fn notify(&self, notice: KernelNotice) {
        if let Some(obs) = &self.observer {
            obs.notify(notice);
        }
    }

    pub(crate) fn drain_inbox(&mut self) -> usize {
        let queue = &mut self.queue;
        let drained = self
            .inbox
            .drain(|e| queue.insert(e.handle, e.event, e.time, e.priority));
        self.metrics.inbox_accepted += drained as u64;
        drained
    }

    fn advance_event(&mut self) -> Advance {
        self.drain_inbox();
        loop {
            let Some(key) = self.queue.peek() else {
                return Advance::Idle;
            };
            if let Some(end) = self.end_time {
                if key.time > end {
                    self.clock.advance_to(end);
                    let _ = self.complete(end);
                    return self.finish_completion();
                }
            }
            self.pace_until(key.time);
            // The pacing sleep drains the inbox; an earlier-timed event
            // may now head the queue, so re-check before committing.
            match self.queue.peek() {
                Some(current) if current == key => break,
                Some(_) => continue,
                None => return Advance::Idle,
            }
        }
        let Some(pending) = self.queue.pop() else {
            return Advance::Idle;
        };
        self.clock.advance_to(pending.key.time);
        self.execute_pending(pending);
        Advance::Executed {
            time: self.clock.sim_time(),
        }
    }

    /// Execute a popped event and apply its disposition.
    pub(crate) fn execute_pending(&mut self, mut pending: PendingEvent) {
        let disposition = {
            let mut ctx = EventContext {
                queue: &mut self.queue,
                sim_time: self.clock.sim_time(),
                state: self.state,
            };
            pending.event.execute(&mut ctx)
        };
        self.metrics.events_executed += 1;
        match disposition {
            Disposition::Delete => {}
            Disposition::Reschedule { time, priority } => {
                // A non-finite reschedule time cannot be queued; the
                // event is dropped as if it had returned Delete.
                if time.is_finite() {
                    let priority = priority.unwrap_or(pending.key.priority);
                    self.queue.insert(pending.handle, pending.event, time, priority);
                    self.metrics.events_rescheduled += 1;
                }
            }
        }
    }

    /// Sleep (sliced, inbox-draining) until `next_time` is due under
    /// real-time pacing, or mark the simulation behind.
    ///
    /// Returns `true` when the wait ended early because a sleep slice
    /// drained inbox events. The event-stepped path re-peeks the queue
    /// on that signal; the frame driver keeps waiting, since its
    /// boundary is fixed regardless of what arrived.
    pub(crate) fn pace_until(&mut self, next_time: f64) -> bool {
        loop {
            match self.clock.pacing_for(next_time) {
                Pacing::Free => {
                    self.mark_caught_up();
                    return false;
                }
                Pacing::Sleep(wanted) => {
                    self.mark_caught_up();
                    if wanted.is_zero() {
                        return false;
                    }
                    let slice = wanted.min(self.max_sleep_slice);
                    thread::sleep(slice);
                    if self.drain_inbox() > 0 {
                        // An external event may now be due earlier;
                        // let the caller decide.
                        return true;
                    }
                    if wanted <= self.max_sleep_slice {
                        return false;
                    }
                }
                Pacing::Behind(by) => {
                    // Slack of one sleep slice (in sim seconds) so that
                    // the jitter of just-finished sleeps is not reported
                    // as falling behind.
                    let slack = self.max_sleep_slice.as_secs_f64() * self.clock.rate();
                    if by > slack {
                        self.mark_behind(by);
                    } else {
                        self.mark_caught_up();
                    }
                    return false;
                }
            }
        }
    }

    fn mark_behind(&mut self, by: f64) {
        self.time_behind = by;
        if by > self.metrics.max_time_behind {
            self.metrics.max_time_behind = by;
        }
        if !self.behind {
            self.behind = true;
            self.metrics.behind_transitions += 1;
            self.notify(KernelNotice::FallingBehind { time_behind: by });
        }
    }

    fn mark_caught_up(&mut self) {
        self.time_behind = 0.0;
        if self.behind {
            self.behind = false;
            self.notify(KernelNotice::CaughtUp);
        }
    }
}

impl ScheduleContext for Scheduler {
    fn sim_time(&self) -> f64 {
        self.clock.sim_time()
    }

    fn schedule(
        &mut self,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) -> Result<EventHandle, ScheduleError> {
        Scheduler::schedule(self, event, time, priority)
    }

    fn cancel(&mut self, handle: EventHandle) -> bool {
        Scheduler::cancel(self, handle)
    }
}

// ── EventContext ─────────────────────────────────────────────────

/// The context handed to an executing event body.
///
/// Mutates the queue directly — same single owner, no locking — so an
/// event can schedule further events at the current instant and they
/// sort under the uniform `(time, priority, sequence)` rule.
struct EventContext<'a> {
    queue: &'a mut EventQueue,
    sim_time: f64,
    state: SimState,
}

impl ScheduleContext for EventContext<'_> {
    fn sim_time(&self) -> f64 {
        self.sim_time
    }

    fn schedule(
        &mut self,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) -> Result<EventHandle, ScheduleError> {
        if !self.state.accepts_events() {
            return Err(ScheduleError::NotAccepting { state: self.state });
        }
        self.queue.schedule(event, time, priority)
    }

    fn cancel(&mut self, handle: EventHandle) -> bool {
        self.queue.cancel(handle)
    }
}

// Compile-time assertion: the submitter must be Send so worker threads
// can inject events; the scheduler itself stays on the sim thread.
const _: fn() = || {
    fn assert_send<T: Send>() {}
    assert_send::<EventSubmitter>();
};
