//! Test utilities and mock types for Cadence development.
//!
//! Provides mock implementations of core traits ([`SimObserver`],
//! [`EntityUpdater`]), a closure adapter for [`SimEvent`], and seeded
//! random-workload generators for queue and scheduler testing.

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use rand::Rng;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;

use cadence_core::{
    Disposition, EntityHandle, EntityUpdater, KernelNotice, Priority, ScheduleContext, SimEvent,
    SimObserver, WorkKind,
};

/// Observer that records every notice for later assertion.
///
/// Shared as `Arc<RecordingObserver>`; notices may arrive from the sim
/// thread while the test thread inspects, hence the mutex.
#[derive(Default)]
pub struct RecordingObserver {
    notices: Mutex<Vec<KernelNotice>>,
}

impl RecordingObserver {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything recorded so far.
    pub fn notices(&self) -> Vec<KernelNotice> {
        self.notices.lock().unwrap().clone()
    }

    /// Number of recorded notices matching `pred`.
    pub fn count_matching(&self, pred: impl Fn(&KernelNotice) -> bool) -> usize {
        self.notices.lock().unwrap().iter().filter(|n| pred(n)).count()
    }
}

impl SimObserver for RecordingObserver {
    fn notify(&self, notice: KernelNotice) {
        self.notices.lock().unwrap().push(notice);
    }
}

/// Closure adapter for [`SimEvent`].
///
/// The closure decides the disposition, so repeating events are
/// expressible without a named type.
pub struct FnEvent<F>(pub F);

impl<F> SimEvent for FnEvent<F>
where
    F: FnMut(&mut dyn ScheduleContext) -> Disposition + Send,
{
    fn execute(&mut self, ctx: &mut dyn ScheduleContext) -> Disposition {
        (self.0)(ctx)
    }
}

/// A one-shot event from a closure; always deletes itself afterwards.
pub fn one_shot(
    mut body: impl FnMut(&mut dyn ScheduleContext) + Send + 'static,
) -> Box<dyn SimEvent> {
    Box::new(FnEvent(move |ctx: &mut dyn ScheduleContext| {
        body(ctx);
        Disposition::Delete
    }))
}

/// An event that counts its own executions, for liveness assertions
/// across threads.
pub struct CountingEvent {
    count: std::sync::Arc<AtomicUsize>,
}

impl CountingEvent {
    /// Returns the event and the counter it increments.
    pub fn new() -> (Box<dyn SimEvent>, std::sync::Arc<AtomicUsize>) {
        let count = std::sync::Arc::new(AtomicUsize::new(0));
        let event = Box::new(CountingEvent {
            count: count.clone(),
        });
        (event, count)
    }
}

impl SimEvent for CountingEvent {
    fn execute(&mut self, _ctx: &mut dyn ScheduleContext) -> Disposition {
        self.count.fetch_add(1, Ordering::SeqCst);
        Disposition::Delete
    }
}

/// Entity updater that records every call, with optional artificial
/// work time and per-entity panics for containment tests.
#[derive(Default)]
pub struct ProbeUpdater {
    calls: Mutex<Vec<(WorkKind, EntityHandle, f64)>>,
    delay: Option<Duration>,
    panic_on: Mutex<Vec<EntityHandle>>,
}

impl ProbeUpdater {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every update call sleep for `delay`, to exercise soft
    /// deadlines and barrier waits.
    pub fn with_delay(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Panic when asked to update `entity`, in either pass.
    pub fn panic_on(&self, entity: EntityHandle) {
        self.panic_on.lock().unwrap().push(entity);
    }

    /// All recorded calls, in arrival order.
    pub fn calls(&self) -> Vec<(WorkKind, EntityHandle, f64)> {
        self.calls.lock().unwrap().clone()
    }

    /// Entities recorded for one pass kind, in arrival order.
    pub fn entities_updated(&self, kind: WorkKind) -> Vec<EntityHandle> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _, _)| *k == kind)
            .map(|(_, e, _)| *e)
            .collect()
    }

    fn record(&self, kind: WorkKind, entity: EntityHandle, sim_time: f64) {
        if self.panic_on.lock().unwrap().contains(&entity) {
            panic!("probe updater told to fail for entity {entity}");
        }
        if let Some(delay) = self.delay {
            std::thread::sleep(delay);
        }
        self.calls.lock().unwrap().push((kind, entity, sim_time));
    }
}

impl EntityUpdater for ProbeUpdater {
    fn update_platform(&self, entity: EntityHandle, sim_time: f64) {
        self.record(WorkKind::Platform, entity, sim_time);
    }

    fn update_sensor(&self, entity: EntityHandle, sim_time: f64) {
        self.record(WorkKind::Sensor, entity, sim_time);
    }
}

/// Seeded random `(time, priority)` workload for queue ordering tests.
///
/// Times land on a coarse grid so collisions (equal times) are common
/// enough to exercise the tie-break path.
pub fn random_workload(seed: u64, len: usize) -> Vec<(f64, Priority)> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..len)
        .map(|_| {
            let time = f64::from(rng.gen_range(0u32..50));
            let priority = rng.gen_range(-3i32..3);
            (time, priority)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn random_workload_is_deterministic() {
        assert_eq!(random_workload(42, 32), random_workload(42, 32));
        assert_ne!(random_workload(42, 32), random_workload(43, 32));
    }

    #[test]
    fn probe_updater_records_calls() {
        let probe = ProbeUpdater::new();
        let e = EntityHandle {
            index: 0,
            generation: 1,
        };
        probe.update_platform(e, 1.0);
        probe.update_sensor(e, 1.0);
        assert_eq!(probe.calls().len(), 2);
        assert_eq!(probe.entities_updated(WorkKind::Sensor), vec![e]);
    }
}
