//! The dispatcher: worker pool, pass drivers, and completion barrier.
//!
//! `update_platforms` / `update_sensors` are synchronous barriers: the
//! calling (sim) thread snapshots the work into the shared pass state,
//! wakes the workers, then receives one outcome per item over a
//! crossbeam channel before returning. Workers never touch the
//! registry; they only run the [`EntityUpdater`] hook, so the registry
//! stays single-owner and lock-free.

use std::error::Error;
use std::fmt;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::{Arc, Condvar, Mutex};
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, Sender};
use smallvec::SmallVec;

use cadence_core::{EntityHandle, EntityUpdater, KernelNotice, SimObserver, WorkKind};

use crate::registry::EntityRegistry;
use crate::work::{ActivePass, PassState, SensorItem, Task, WorkItems};

// ── Configuration ────────────────────────────────────────────────

/// Errors detected while validating a [`DispatcherConfig`].
#[derive(Debug, PartialEq)]
pub enum DispatchConfigError {
    /// `thread_count` is zero.
    ZeroThreads,
    /// `break_update_time` is NaN, infinite, zero, or negative.
    InvalidBreakUpdateTime {
        /// The rejected value.
        value: f64,
    },
}

impl fmt::Display for DispatchConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroThreads => write!(f, "thread_count must be at least 1"),
            Self::InvalidBreakUpdateTime { value } => {
                write!(
                    f,
                    "break_update_time must be finite and positive, got {value}"
                )
            }
        }
    }
}

impl Error for DispatchConfigError {}

/// Configuration for constructing a [`Dispatcher`].
#[derive(Clone)]
pub struct DispatcherConfig {
    /// Worker threads in the pool. At least 1; with exactly 1 a pass
    /// is equivalent to the sequential loop.
    pub thread_count: usize,
    /// Soft wall-clock deadline per sensor pass, in seconds. Items not
    /// started by then are deferred to the next pass. `None` disables
    /// the deadline.
    pub break_update_time: Option<f64>,
    /// Emit a `DispatchPass` notice after every pass.
    pub debug: bool,
    /// Receiver for dispatch notices. `None` discards them.
    pub observer: Option<Arc<dyn SimObserver>>,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            thread_count: std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(1),
            break_update_time: None,
            debug: false,
            observer: None,
        }
    }
}

impl DispatcherConfig {
    /// Validate all structural invariants.
    pub fn validate(&self) -> Result<(), DispatchConfigError> {
        if self.thread_count == 0 {
            return Err(DispatchConfigError::ZeroThreads);
        }
        if let Some(t) = self.break_update_time {
            if !t.is_finite() || t <= 0.0 {
                return Err(DispatchConfigError::InvalidBreakUpdateTime { value: t });
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DispatcherConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DispatcherConfig")
            .field("thread_count", &self.thread_count)
            .field("break_update_time", &self.break_update_time)
            .field("debug", &self.debug)
            .field("observer", &self.observer.is_some())
            .finish()
    }
}

// ── Outcomes ─────────────────────────────────────────────────────

/// Per-item result a worker reports back over the barrier channel.
enum Outcome {
    Executed { entity: EntityHandle },
    Failed { entity: EntityHandle, reason: String },
    Skipped { count: usize },
}

/// Summary of one dispatch pass.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct PassReport {
    /// Items whose update hook ran to completion.
    pub executed: usize,
    /// Items deferred past the soft deadline.
    pub skipped: usize,
    /// Items whose update hook panicked.
    pub failed: usize,
}

impl PassReport {
    fn total(&self) -> usize {
        self.executed + self.skipped + self.failed
    }
}

// ── Dispatcher ───────────────────────────────────────────────────

struct Shared {
    state: Mutex<PassState>,
    work_ready: Condvar,
}

/// Worker-pool dispatcher for per-tick entity updates.
///
/// Owned and driven by the sim thread. Each pass fans one update per
/// live entity out across the pool and blocks until every item has an
/// outcome, so when the barrier returns the caller knows no update
/// hook is still in flight. Entity bookkeeping methods take `&mut
/// self` and are therefore serialized against passes by construction.
pub struct Dispatcher {
    registry: EntityRegistry,
    shared: Arc<Shared>,
    outcome_rx: Receiver<Outcome>,
    workers: Vec<JoinHandle<()>>,
    break_update_time: Option<f64>,
    debug: bool,
    observer: Option<Arc<dyn SimObserver>>,
}

impl Dispatcher {
    /// Spawn the worker pool. `updater` is the embedder's entity update
    /// hook, shared by every worker.
    pub fn new(
        updater: Arc<dyn EntityUpdater>,
        config: DispatcherConfig,
    ) -> Result<Self, DispatchConfigError> {
        config.validate()?;
        let shared = Arc::new(Shared {
            state: Mutex::new(PassState::default()),
            work_ready: Condvar::new(),
        });
        let (outcome_tx, outcome_rx) = crossbeam_channel::unbounded();
        let workers = (0..config.thread_count)
            .map(|i| {
                let shared = Arc::clone(&shared);
                let updater = Arc::clone(&updater);
                let tx = outcome_tx.clone();
                std::thread::Builder::new()
                    .name(format!("cadence-dispatch-{i}"))
                    .spawn(move || worker_loop(&shared, &*updater, &tx))
                    .expect("spawn dispatch worker")
            })
            .collect();
        Ok(Self {
            registry: EntityRegistry::new(),
            shared,
            outcome_rx,
            workers,
            break_update_time: config.break_update_time,
            debug: config.debug,
            observer: config.observer,
        })
    }

    // ── Entity bookkeeping ───────────────────────────────────────

    /// Register a platform for per-tick kinematic updates.
    pub fn add_platform(&mut self) -> EntityHandle {
        self.registry.add()
    }

    /// Delete a platform (and its sensor). Outstanding handles go
    /// stale; a stale handle here returns `false` and has no effect.
    pub fn delete_platform(&mut self, handle: EntityHandle) -> bool {
        self.registry.remove(handle)
    }

    /// Start (or retune) the platform's periodic sensor: due first at
    /// `first_due`, then every `interval` seconds after each completed
    /// update. Stale handle returns `false`.
    pub fn turn_sensor_on(&mut self, handle: EntityHandle, interval: f64, first_due: f64) -> bool {
        self.registry.set_sensor(handle, interval, first_due)
    }

    /// Stop the platform's sensor. Stale handle or already-off sensor
    /// returns `false`.
    pub fn turn_sensor_off(&mut self, handle: EntityHandle) -> bool {
        self.registry.clear_sensor(handle)
    }

    /// Number of registered platforms.
    pub fn platform_count(&self) -> usize {
        self.registry.len()
    }

    /// Whether the most recent sensor pass hit its soft deadline and
    /// deferred work.
    pub fn break_update(&self) -> bool {
        self.lock_state().truncated
    }

    // ── Pass drivers ─────────────────────────────────────────────

    /// Update every platform to `now`. FIFO in registration order,
    /// fanned across the pool; returns when every item has an outcome.
    pub fn update_platforms(&mut self, now: f64) -> PassReport {
        let items: std::collections::VecDeque<EntityHandle> = self.registry.platforms().collect();
        let total = items.len();
        self.run_pass(
            WorkKind::Platform,
            now,
            WorkItems::Platform(items),
            total,
            // Platform passes always run to completion; the soft
            // deadline applies to sensor passes only.
            None,
        )
    }

    /// Update every sensor due at `now` (`next_due <= now`), most
    /// overdue first. Executed sensors are rescheduled to
    /// `now + interval`; sensors deferred past the soft deadline keep
    /// their old due time.
    pub fn update_sensors(&mut self, now: f64) -> PassReport {
        let mut heap = std::collections::BinaryHeap::new();
        for (handle, next_due) in self.registry.due_sensors(now) {
            heap.push(std::cmp::Reverse(SensorItem { next_due, handle }));
        }
        let total = heap.len();
        let deadline = self
            .break_update_time
            .map(|t| Instant::now() + Duration::from_secs_f64(t));
        self.run_pass(WorkKind::Sensor, now, WorkItems::Sensor(heap), total, deadline)
    }

    fn run_pass(
        &mut self,
        kind: WorkKind,
        now: f64,
        items: WorkItems,
        total: usize,
        deadline: Option<Instant>,
    ) -> PassReport {
        let started = Instant::now();
        {
            let mut state = self.lock_state();
            state.truncated = false;
            if total == 0 {
                self.emit_pass_notice(kind, PassReport::default(), started);
                return PassReport::default();
            }
            state.active = Some(ActivePass {
                kind,
                sim_time: now,
                items,
                deadline,
            });
        }
        self.shared.work_ready.notify_all();

        let mut report = PassReport::default();
        let mut failures: SmallVec<[(EntityHandle, String); 4]> = SmallVec::new();
        while report.total() < total {
            match self.outcome_rx.recv() {
                Ok(Outcome::Executed { entity }) => {
                    report.executed += 1;
                    if kind == WorkKind::Sensor {
                        self.registry.complete_sensor(entity, now);
                    }
                }
                Ok(Outcome::Failed { entity, reason }) => {
                    report.failed += 1;
                    failures.push((entity, reason));
                }
                Ok(Outcome::Skipped { count }) => report.skipped += count,
                // All workers gone; nothing more will arrive.
                Err(_) => break,
            }
        }
        self.lock_state().active = None;

        // Notices go out after the barrier, from the calling thread.
        for (entity, reason) in failures {
            self.notify(KernelNotice::EntityUpdateFailed {
                entity,
                kind,
                reason,
            });
        }
        self.emit_pass_notice(kind, report, started);
        report
    }

    fn emit_pass_notice(&self, kind: WorkKind, report: PassReport, started: Instant) {
        if self.debug {
            self.notify(KernelNotice::DispatchPass {
                kind,
                executed: report.executed,
                deferred: report.skipped,
                duration_us: started.elapsed().as_micros() as u64,
            });
        }
    }

    fn notify(&self, notice: KernelNotice) {
        if let Some(obs) = &self.observer {
            obs.notify(notice);
        }
    }

    fn lock_state(&self) -> std::sync::MutexGuard<'_, PassState> {
        self.shared.state.lock().expect("dispatch state poisoned")
    }
}

impl Drop for Dispatcher {
    fn drop(&mut self) {
        self.lock_state().shutdown = true;
        self.shared.work_ready.notify_all();
        for worker in self.workers.drain(..) {
            let _ = worker.join();
        }
    }
}

// ── Worker loop ──────────────────────────────────────────────────

fn worker_loop(shared: &Shared, updater: &dyn EntityUpdater, tx: &Sender<Outcome>) {
    loop {
        let task = {
            let mut state = shared.state.lock().expect("dispatch state poisoned");
            loop {
                if state.shutdown {
                    return;
                }
                match state.next_task() {
                    Some(task) => break task,
                    None => {
                        state = shared
                            .work_ready
                            .wait(state)
                            .expect("dispatch state poisoned");
                    }
                }
            }
        };
        let outcome = match task {
            Task::Run {
                kind,
                entity,
                sim_time,
            } => {
                // The hook runs without the lock; a panic is contained
                // at the item boundary so it cannot poison the barrier.
                let result = catch_unwind(AssertUnwindSafe(|| match kind {
                    WorkKind::Platform => updater.update_platform(entity, sim_time),
                    WorkKind::Sensor => updater.update_sensor(entity, sim_time),
                }));
                match result {
                    Ok(()) => Outcome::Executed { entity },
                    Err(payload) => Outcome::Failed {
                        entity,
                        reason: panic_reason(&payload),
                    },
                }
            }
            Task::Skip { count } => Outcome::Skipped { count },
        };
        if tx.send(outcome).is_err() {
            // Dispatcher gone mid-pass; shut down quietly.
            return;
        }
    }
}

fn panic_reason(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "update hook panicked".to_string()
    }
}
