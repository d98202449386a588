//! Cross-thread event submission funnel.
//!
//! The event queue has a single logical owner — the sim thread — so
//! there is no re-entrant lock around it. Worker threads (and any other
//! external thread) submit events through an [`EventSubmitter`], which
//! allocates a handle immediately from the queue's shared counter and
//! sends the entry down an unbounded channel. The scheduler drains the
//! inbox at tick boundaries and between pacing slices, so an external
//! event with an earlier time than the next due event still interrupts
//! a real-time wait.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{Receiver, Sender, TryRecvError};

use cadence_core::{EventHandle, Priority, SimEvent, SubmitError};

/// A submitted event waiting to be drained into the queue.
pub(crate) struct InboxEntry {
    pub handle: EventHandle,
    pub event: Box<dyn SimEvent>,
    pub time: f64,
    pub priority: Priority,
}

/// Cloneable, `Send` handle for submitting events from any thread.
///
/// The returned [`EventHandle`] is valid for cancellation immediately,
/// even before the sim thread drains the entry into the queue.
#[derive(Clone)]
pub struct EventSubmitter {
    tx: Sender<InboxEntry>,
    next_handle: Arc<AtomicU64>,
}

impl EventSubmitter {
    /// Submit an event for execution at `time` with tie-break
    /// `priority`.
    pub fn submit(
        &self,
        event: Box<dyn SimEvent>,
        time: f64,
        priority: Priority,
    ) -> Result<EventHandle, SubmitError> {
        if !time.is_finite() {
            return Err(SubmitError::InvalidTime { value: time });
        }
        let handle = EventHandle(self.next_handle.fetch_add(1, Ordering::Relaxed));
        self.tx
            .send(InboxEntry {
                handle,
                event,
                time,
                priority,
            })
            .map_err(|_| SubmitError::Shutdown)?;
        Ok(handle)
    }
}

/// The scheduler-side end of the inbox.
pub(crate) struct Inbox {
    rx: Receiver<InboxEntry>,
    tx: Sender<InboxEntry>,
    next_handle: Arc<AtomicU64>,
}

impl Inbox {
    /// Create an inbox whose submitters allocate handles from
    /// `next_handle` (the owning queue's counter).
    pub fn new(next_handle: Arc<AtomicU64>) -> Self {
        let (tx, rx) = crossbeam_channel::unbounded();
        Self {
            rx,
            tx,
            next_handle,
        }
    }

    /// A fresh submitter for hand-out to other threads.
    pub fn submitter(&self) -> EventSubmitter {
        EventSubmitter {
            tx: self.tx.clone(),
            next_handle: Arc::clone(&self.next_handle),
        }
    }

    /// Drain everything currently queued, without blocking.
    pub fn drain(&self, mut sink: impl FnMut(InboxEntry)) -> usize {
        let mut drained = 0;
        loop {
            match self.rx.try_recv() {
                Ok(entry) => {
                    sink(entry);
                    drained += 1;
                }
                Err(TryRecvError::Empty | TryRecvError::Disconnected) => break,
            }
        }
        drained
    }
}
