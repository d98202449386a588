//! Shared pass state: the work queues a dispatch pass drains.
//!
//! One pass is active at a time. Platform passes drain a FIFO of
//! handles in registration order; sensor passes drain a min-heap keyed
//! by `next_due`, so the most overdue sensor runs first and a soft
//! deadline defers the least urgent work. Workers pop items one at a
//! time under the dispatch mutex and run the update hook with the lock
//! released.

use std::cmp::{Ordering, Reverse};
use std::collections::{BinaryHeap, VecDeque};
use std::time::Instant;

use cadence_core::{EntityHandle, WorkKind};

/// A due sensor, ordered by `next_due` ascending (handle breaks ties
/// deterministically).
#[derive(Clone, Copy, Debug)]
pub(crate) struct SensorItem {
    pub next_due: f64,
    pub handle: EntityHandle,
}

impl PartialEq for SensorItem {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for SensorItem {}

impl PartialOrd for SensorItem {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for SensorItem {
    fn cmp(&self, other: &Self) -> Ordering {
        self.next_due
            .total_cmp(&other.next_due)
            .then(self.handle.cmp(&other.handle))
    }
}

pub(crate) enum WorkItems {
    Platform(VecDeque<EntityHandle>),
    Sensor(BinaryHeap<Reverse<SensorItem>>),
}

impl WorkItems {
    fn pop(&mut self) -> Option<EntityHandle> {
        match self {
            Self::Platform(fifo) => fifo.pop_front(),
            Self::Sensor(heap) => heap.pop().map(|Reverse(item)| item.handle),
        }
    }

    fn drain_count(&mut self) -> usize {
        match self {
            Self::Platform(fifo) => std::mem::take(fifo).len(),
            Self::Sensor(heap) => std::mem::take(heap).len(),
        }
    }
}

/// The currently running pass.
pub(crate) struct ActivePass {
    pub kind: WorkKind,
    pub sim_time: f64,
    pub items: WorkItems,
    /// Soft wall-clock deadline; items popped after it are skipped.
    pub deadline: Option<Instant>,
}

/// What a worker should do next.
pub(crate) enum Task {
    /// Run the update hook for one entity.
    Run {
        kind: WorkKind,
        entity: EntityHandle,
        sim_time: f64,
    },
    /// The soft deadline expired; this many items were drained without
    /// running.
    Skip { count: usize },
}

/// Mutex-guarded dispatch state. Workers block on the paired condvar
/// while `active` is `None`.
#[derive(Default)]
pub(crate) struct PassState {
    pub active: Option<ActivePass>,
    pub shutdown: bool,
    /// Whether the most recent pass hit its soft deadline.
    pub truncated: bool,
}

impl PassState {
    /// Pop the next task, or `None` if no pass is active or the active
    /// pass is exhausted. Deadline expiry is checked at pop time, under
    /// the lock, so the remainder is drained exactly once.
    pub fn next_task(&mut self) -> Option<Task> {
        let pass = self.active.as_mut()?;
        if let Some(deadline) = pass.deadline {
            if Instant::now() >= deadline {
                let count = pass.items.drain_count();
                if count > 0 {
                    self.truncated = true;
                    return Some(Task::Skip { count });
                }
                return None;
            }
        }
        pass.items.pop().map(|entity| Task::Run {
            kind: pass.kind,
            entity,
            sim_time: pass.sim_time,
        })
    }
}
