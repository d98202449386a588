//! Time-ordered event queue with stable tie-breaking and lazy cancellation.
//!
//! Entries are ordered by `(time, priority, sequence)` ascending — a
//! strict weak order that makes pop order fully deterministic for a
//! given sequence of `schedule` calls (FIFO among equal time+priority).
//! `pop` transfers ownership of the boxed event to the caller; there is
//! no peek-then-mutate path into the heap.
//!
//! Cancellation is O(1) and lazy: the handle goes into a cancelled set
//! and the entry is discarded when it reaches the top of the heap. A
//! cancelled event's body is guaranteed never to execute.

use std::cmp::{Ordering, Reverse};
use std::collections::BinaryHeap;
use std::collections::HashSet;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use cadence_core::{EventHandle, Priority, ScheduleError, SimEvent};

// ── EventKey ─────────────────────────────────────────────────────

/// Full ordering key for a queued event.
#[derive(Clone, Copy, Debug)]
pub struct EventKey {
    /// Scheduled execution time, simulation seconds.
    pub time: f64,
    /// Tie-break priority; lower executes earlier among equal times.
    pub priority: Priority,
    /// Per-queue monotonic insertion counter; tie-breaks priority.
    pub sequence: u64,
}

impl PartialEq for EventKey {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for EventKey {}

impl PartialOrd for EventKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for EventKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.time
            .total_cmp(&other.time)
            .then(self.priority.cmp(&other.priority))
            .then(self.sequence.cmp(&other.sequence))
    }
}

// ── PendingEvent ─────────────────────────────────────────────────

/// An event popped from the queue, owned by the caller.
pub struct PendingEvent {
    /// The handle the event was scheduled (and may be re-entered) under.
    pub handle: EventHandle,
    /// The key it was popped at.
    pub key: EventKey,
    /// The event body.
    pub event: Box<dyn SimEvent>,
}

struct QueuedEvent {
    key: EventKey,
    handle: EventHandle,
    event: Box<dyn SimEvent>,
}

impl PartialEq for QueuedEvent {
    fn eq(&self, other: &Self) -> bool {
        self.key == other.key
    }
}

impl Eq for QueuedEvent {}

impl PartialOrd for QueuedEvent {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedEvent {
    fn cmp(&self, other: &Self) -> Ordering {
        self.key.cmp(&other.key)
    }
}

// ── EventQueue ───────────────────────────────────────────────────

/// Min-heap of pending events ordered by `(time, priority, sequence)`.
///
/// Handle allocation is per-instance (an atomic counter shared with the
/// ingress inbox so off-thread submitters receive a handle immediately);
/// no global state, so independent queues are fully isolated.
pub struct EventQueue {
    heap: BinaryHeap<Reverse<QueuedEvent>>,
    /// Handles currently in the heap and not cancelled.
    live: HashSet<EventHandle>,
    /// Handles cancelled but possibly still occupying a heap slot.
    cancelled: HashSet<EventHandle>,
    next_handle: Arc<AtomicU64>,
    next_sequence: u64,
    discards: u64,
}

impl Default for EventQueue {
    fn default() -> Self {
        Self::new()
    }
}

impl EventQueue {
    /// Create an empty queue with a fresh handle allocator.
    pub fn new() -> Self {
        Self {
            heap: BinaryHeap::new(),
            live: HashSet::new(),
            cancelled: HashSet::new(),
            next_handle: Arc::new(AtomicU64::new(0)),
            next_sequence: 0,
            discards: 0,
        }
    }

    /// The shared handle allocator, for wiring up the ingress inbox.
    pub(crate) fn handle_source(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.next_handle)
    }

    /// Number of live (non-cancelled) pending events.
    pub fn len(&self) -> usize {
        self.live.len()
    }

    /// Whether no live events are pending.
    pub fn is_empty(&self) -> bool {
        self.live.is_empty()
    }

    /// Cumulative count of cancelled entries lazily discarded so far.
    pub fn discard_count(&self) -> u64 {
        self.discards
    }

    /// Schedule an event, allocating a fresh handle.
    pub fn schedule(
        &mut self,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) -> Result<EventHandle, ScheduleError> {
        if !time.is_finite() {
            return Err(ScheduleError::InvalidTime { value: time });
        }
        let handle = EventHandle(self.next_handle.fetch_add(1, AtomicOrdering::Relaxed));
        self.insert(handle, event, time, priority);
        Ok(handle)
    }

    /// Insert an event under an existing handle (inbox drain, reschedule).
    ///
    /// The sequence number is always freshly allocated, so a reschedule
    /// interleaves FIFO-fairly with new events at its new time slot.
    pub(crate) fn insert(
        &mut self,
        handle: EventHandle,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) {
        let key = EventKey {
            time,
            priority,
            sequence: self.next_sequence,
        };
        self.next_sequence += 1;
        // A handle cancelled while outside the heap (in the inbox, or
        // mid-execution before a reschedule) stays dead: the entry goes
        // in but is never counted live and is purged at the top.
        if !self.cancelled.contains(&handle) {
            self.live.insert(handle);
        }
        self.heap.push(Reverse(QueuedEvent { key, handle, event }));
    }

    /// Mark an event cancelled. O(1); the heap entry is discarded when
    /// it surfaces. Returns `true` if the handle referred to a live
    /// pending entry.
    ///
    /// Cancelling a handle whose event already ran retains a kill note
    /// until [`reset`](Self::reset): the queue cannot tell a completed
    /// handle from a submission still in flight through the inbox, and
    /// dropping the note could let a cancelled event execute. That
    /// growth is bounded by the number of such stale cancels; notes for
    /// entries that do surface are reclaimed when they are purged.
    pub fn cancel(&mut self, handle: EventHandle) -> bool {
        let was_live = self.live.remove(&handle);
        // Handles at or above the allocator cursor were never issued
        // and can never arrive, so they need no kill note.
        if !was_live && handle.0 >= self.next_handle.load(AtomicOrdering::Relaxed) {
            return false;
        }
        self.cancelled.insert(handle);
        was_live
    }

    /// Discard cancelled entries sitting at the top of the heap.
    fn purge_cancelled(&mut self) {
        while let Some(Reverse(top)) = self.heap.peek() {
            if self.cancelled.contains(&top.handle) {
                let handle = top.handle;
                self.heap.pop();
                self.cancelled.remove(&handle);
                self.discards += 1;
            } else {
                break;
            }
        }
    }

    /// Observe the minimum live entry's key without removing it.
    pub fn peek(&mut self) -> Option<EventKey> {
        self.purge_cancelled();
        self.heap.peek().map(|Reverse(e)| e.key)
    }

    /// Remove and return the minimum live entry, transferring ownership
    /// of the event to the caller. `None` means the simulation is idle,
    /// not an error.
    pub fn pop(&mut self) -> Option<PendingEvent> {
        self.purge_cancelled();
        let Reverse(entry) = self.heap.pop()?;
        self.live.remove(&entry.handle);
        Some(PendingEvent {
            handle: entry.handle,
            key: entry.key,
            event: entry.event,
        })
    }

    /// Discard and destroy every pending event and all cancellation
    /// bookkeeping. Used on teardown or full restart.
    pub fn reset(&mut self) {
        self.heap.clear();
        self.live.clear();
        self.cancelled.clear();
    }
}
