//! The Cadence scheduling engine: event queue, clock, and scheduler.
//!
//! This crate is the kernel's sim-thread half. An [`EventQueue`] orders
//! pending events by `(time, priority, sequence)`; a [`Clock`] maps
//! simulation time to wall time for real-time pacing; a [`Scheduler`]
//! ties them together with the lifecycle state machine and the two
//! time-advance disciplines (event-stepped and frame-stepped). Threads
//! outside the sim thread inject events through an [`EventSubmitter`]
//! rather than locking the queue.
//!
//! ```
//! use cadence_core::{Disposition, ScheduleContext, SimEvent};
//! use cadence_engine::{Advance, Scheduler, SchedulerConfig};
//!
//! struct Hello;
//! impl SimEvent for Hello {
//!     fn execute(&mut self, ctx: &mut dyn ScheduleContext) -> Disposition {
//!         println!("hello at t={}", ctx.sim_time());
//!         Disposition::Delete
//!     }
//! }
//!
//! let mut sched = Scheduler::new(SchedulerConfig::default()).unwrap();
//! sched.schedule(Box::new(Hello), 1.0, 0).unwrap();
//! sched.initialize().unwrap();
//! sched.start().unwrap();
//! assert_eq!(sched.advance(), Advance::Executed { time: 1.0 });
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod clock;
pub mod config;
mod frame;
pub mod inbox;
pub mod metrics;
pub mod queue;
pub mod scheduler;

pub use clock::{Clock, Pacing};
pub use config::{ConfigError, SchedulerConfig, TimeAdvance};
pub use inbox::EventSubmitter;
pub use metrics::{FrameStats, SchedulerMetrics};
pub use queue::{EventKey, EventQueue, PendingEvent};
pub use scheduler::{Advance, Scheduler};
