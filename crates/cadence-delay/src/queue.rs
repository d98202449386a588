//! The delay queue: servers, the waiting line, and completion events.

use std::collections::VecDeque;
use std::error::Error;
use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, Weak};

use cadence_core::{Disposition, Priority, ScheduleContext, ScheduleError, SimEvent};

// ── Request contract ─────────────────────────────────────────────

/// What a request's completion callback tells the queue to do.
#[derive(Clone, Copy, Debug, PartialEq)]
pub enum ServiceOutcome {
    /// Service finished; free the server.
    Done,
    /// Keep the server and run for this many more simulation seconds
    /// before completing again. The request does not re-enter the
    /// waiting line.
    MoreTime(f64),
}

/// A unit of work submitted to a [`DelayQueue`].
pub trait DelayRequest: Send {
    /// Service time in simulation seconds for the initial attachment.
    fn time_required(&self) -> f64;

    /// Waiting-line rank under [`Discipline::Priority`]; lower values
    /// are served first, matching the event-priority convention.
    fn priority(&self) -> Priority {
        0
    }

    /// Called at service completion. Runs on the sim thread.
    fn complete(&mut self, ctx: &mut dyn ScheduleContext) -> ServiceOutcome;
}

// ── Configuration ────────────────────────────────────────────────

/// How the waiting line picks the next request when a server frees up.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Discipline {
    /// First in, first out.
    Fifo,
    /// Last in, first out.
    Lifo,
    /// Lowest [`DelayRequest::priority`] first; FIFO among equals.
    Priority,
}

/// Errors detected constructing a [`DelayQueue`].
#[derive(Debug, PartialEq, Eq)]
pub enum DelayConfigError {
    /// `server_count` is zero.
    ZeroServers,
}

impl fmt::Display for DelayConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ZeroServers => write!(f, "server_count must be at least 1"),
        }
    }
}

impl Error for DelayConfigError {}

// ── Internal state ───────────────────────────────────────────────

struct Server {
    /// Bumped on every assignment and on `cancel_all`; a completion
    /// event carrying an older epoch is stale and ignores itself.
    epoch: u64,
    request: Option<Box<dyn DelayRequest>>,
}

struct DelayState {
    servers: Vec<Server>,
    discipline: Discipline,
    /// Waiting line. Always pushed at the back; the discipline decides
    /// which end (or element) leaves first.
    pending: VecDeque<Box<dyn DelayRequest>>,
}

impl DelayState {
    fn idle_server(&self) -> Option<usize> {
        self.servers.iter().position(|s| s.request.is_none())
    }

    /// Remove the next request per the discipline. The priority scan
    /// keeps the earliest arrival among equal priorities, so priority
    /// mode is FIFO within a rank.
    fn take_pending(&mut self) -> Option<Box<dyn DelayRequest>> {
        match self.discipline {
            Discipline::Fifo => self.pending.pop_front(),
            Discipline::Lifo => self.pending.pop_back(),
            Discipline::Priority => {
                let best = self
                    .pending
                    .iter()
                    .enumerate()
                    .min_by_key(|(_, r)| r.priority())
                    .map(|(i, _)| i)?;
                self.pending.remove(best)
            }
        }
    }
}

// ── DelayQueue ───────────────────────────────────────────────────

/// A bank of identical servers in front of a waiting line.
///
/// Cloning shares the underlying state; completion events hold only a
/// weak reference, so dropping every `DelayQueue` handle quietly
/// defuses any completions still in the event queue.
#[derive(Clone)]
pub struct DelayQueue {
    inner: Arc<Mutex<DelayState>>,
}

impl DelayQueue {
    /// Create a queue with `server_count` identical servers.
    pub fn new(server_count: usize, discipline: Discipline) -> Result<Self, DelayConfigError> {
        if server_count == 0 {
            return Err(DelayConfigError::ZeroServers);
        }
        let servers = (0..server_count)
            .map(|_| Server {
                epoch: 0,
                request: None,
            })
            .collect();
        Ok(Self {
            inner: Arc::new(Mutex::new(DelayState {
                servers,
                discipline,
                pending: VecDeque::new(),
            })),
        })
    }

    /// Submit a request: attach it to an idle server (a completion
    /// event goes into the kernel at `now + time_required`) or park it
    /// in the waiting line.
    pub fn submit(
        &self,
        request: Box<dyn DelayRequest>,
        ctx: &mut dyn ScheduleContext,
    ) -> Result<(), ScheduleError> {
        let mut state = self.lock();
        match state.idle_server() {
            Some(server) => self.attach(&mut state, server, request, ctx),
            None => {
                state.pending.push_back(request);
                Ok(())
            }
        }
    }

    /// Number of servers currently serving a request.
    pub fn busy_servers(&self) -> usize {
        self.lock().servers.iter().filter(|s| s.request.is_some()).count()
    }

    /// Number of requests in the waiting line.
    pub fn pending_len(&self) -> usize {
        self.lock().pending.len()
    }

    /// Drop every waiting request and abandon all in-service requests.
    /// Epochs are bumped, so in-flight completion events become stale
    /// no-ops.
    pub fn cancel_all(&self) {
        let mut state = self.lock();
        state.pending.clear();
        for server in &mut state.servers {
            server.epoch += 1;
            server.request = None;
        }
    }

    /// Bind `request` to `server` and schedule its completion. The
    /// epoch bump invalidates any completion event still in flight for
    /// this server.
    fn attach(
        &self,
        state: &mut MutexGuard<'_, DelayState>,
        server: usize,
        request: Box<dyn DelayRequest>,
        ctx: &mut dyn ScheduleContext,
    ) -> Result<(), ScheduleError> {
        let time = ctx.sim_time() + request.time_required();
        let priority = request.priority();
        state.servers[server].epoch += 1;
        let epoch = state.servers[server].epoch;
        state.servers[server].request = Some(request);
        let completion = Box::new(CompletionEvent {
            queue: Arc::downgrade(&self.inner),
            server,
            epoch,
        });
        match ctx.schedule(completion, time, priority) {
            Ok(_) => Ok(()),
            Err(err) => {
                // Roll the assignment back; a server must never stay
                // busy without a completion event in flight.
                state.servers[server].request = None;
                Err(err)
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, DelayState> {
        match self.inner.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

// ── Completion event ─────────────────────────────────────────────

/// Kernel event marking the end of one service interval.
struct CompletionEvent {
    queue: Weak<Mutex<DelayState>>,
    server: usize,
    epoch: u64,
}

impl CompletionEvent {
    fn lock(arc: &Arc<Mutex<DelayState>>) -> MutexGuard<'_, DelayState> {
        match arc.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

impl SimEvent for CompletionEvent {
    fn execute(&mut self, ctx: &mut dyn ScheduleContext) -> Disposition {
        let Some(inner) = self.queue.upgrade() else {
            // Queue dropped; nothing to complete.
            return Disposition::Delete;
        };

        // Take the request out and release the lock before running the
        // callback, which may submit to this same queue.
        let mut request = {
            let mut state = Self::lock(&inner);
            if state.servers[self.server].epoch != self.epoch {
                return Disposition::Delete;
            }
            match state.servers[self.server].request.take() {
                Some(request) => request,
                None => return Disposition::Delete,
            }
        };

        let outcome = request.complete(ctx);

        let mut state = Self::lock(&inner);
        if state.servers[self.server].epoch != self.epoch {
            // cancel_all ran inside the callback; the server is no
            // longer ours.
            return Disposition::Delete;
        }
        match outcome {
            ServiceOutcome::MoreTime(extra) => {
                let when = ctx.sim_time() + extra;
                let priority = request.priority();
                state.servers[self.server].request = Some(request);
                let extension = Box::new(CompletionEvent {
                    queue: Weak::clone(&self.queue),
                    server: self.server,
                    epoch: self.epoch,
                });
                if ctx.schedule(extension, when, priority).is_err() {
                    // Non-finite extension or a closing kernel: treat
                    // the service as finished rather than wedging the
                    // server.
                    state.servers[self.server].request = None;
                    self.pull_next(&mut state, ctx);
                }
            }
            ServiceOutcome::Done => {
                drop(request);
                self.pull_next(&mut state, ctx);
            }
        }
        Disposition::Delete
    }
}

impl CompletionEvent {
    /// Freed server pulls the next waiting request, if any.
    fn pull_next(&self, state: &mut MutexGuard<'_, DelayState>, ctx: &mut dyn ScheduleContext) {
        let Some(next) = state.take_pending() else {
            return;
        };
        let time = ctx.sim_time() + next.time_required();
        let priority = next.priority();
        state.servers[self.server].epoch += 1;
        let epoch = state.servers[self.server].epoch;
        state.servers[self.server].request = Some(next);
        let completion = Box::new(CompletionEvent {
            queue: Weak::clone(&self.queue),
            server: self.server,
            epoch,
        });
        if ctx.schedule(completion, time, priority).is_err() {
            state.servers[self.server].request = None;
        }
    }
}
