//! N-server delay/service queue built on the Cadence scheduler.
//!
//! A [`DelayQueue`] models a bank of identical servers in front of a
//! waiting line. [`DelayQueue::submit`] either attaches the request to
//! an idle server — scheduling a completion event `time_required`
//! seconds out through the kernel's [`ScheduleContext`] — or parks it
//! under the configured [`Discipline`]. When service completes, the
//! request's callback decides between [`ServiceOutcome::Done`] and
//! [`ServiceOutcome::MoreTime`], and a freed server immediately pulls
//! the next waiter.
//!
//! Completion events are epoch-guarded: reassigning a server or calling
//! [`DelayQueue::cancel_all`] bumps the server's epoch, and a completion
//! event carrying a stale epoch deletes itself without side effects.
//!
//! [`ScheduleContext`]: cadence_core::ScheduleContext

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod queue;

pub use queue::{DelayConfigError, DelayQueue, DelayRequest, Discipline, ServiceOutcome};
