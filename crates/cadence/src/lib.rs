//! Cadence: a discrete-event and fixed-frame simulation kernel.
//!
//! This is the top-level facade crate that re-exports the public API
//! from all Cadence sub-crates. For most users, adding `cadence` as a
//! single dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cadence::prelude::*;
//!
//! // An event that re-fires once, one second later.
//! struct Ping { fired: u32 }
//! impl SimEvent for Ping {
//!     fn execute(&mut self, ctx: &mut dyn ScheduleContext) -> Disposition {
//!         self.fired += 1;
//!         if self.fired < 2 {
//!             Disposition::Reschedule { time: ctx.sim_time() + 1.0, priority: None }
//!         } else {
//!             Disposition::Delete
//!         }
//!     }
//! }
//!
//! let mut sched = Scheduler::new(SchedulerConfig {
//!     end_time: Some(10.0),
//!     ..SchedulerConfig::default()
//! }).unwrap();
//! sched.schedule(Box::new(Ping { fired: 0 }), 1.0, 0).unwrap();
//! sched.initialize().unwrap();
//! sched.start().unwrap();
//! assert_eq!(sched.run(), Advance::Complete { time: 10.0 });
//! assert_eq!(sched.metrics().events_executed, 2);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in
//! the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cadence-core` | Handles, lifecycle states, event and observer traits, errors |
//! | [`engine`] | `cadence-engine` | Event queue, clock, scheduler, ingress inbox, metrics |
//! | [`dispatch`] | `cadence-dispatch` | Worker-pool entity-update dispatcher |
//! | [`delay`] | `cadence-delay` | N-server delay/service queue |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and handles (`cadence-core`).
///
/// Contains [`types::SimEvent`] and its [`types::Disposition`]
/// contract, the [`types::SimState`] lifecycle machine, the observer
/// hook, and the kernel error enums.
pub use cadence_core as types;

/// Event queue, clock, and scheduler (`cadence-engine`).
///
/// [`engine::Scheduler`] drives simulation time in either time-advance
/// discipline; [`engine::EventSubmitter`] injects events from other
/// threads.
pub use cadence_engine as engine;

/// Worker-pool entity-update dispatcher (`cadence-dispatch`).
///
/// [`dispatch::Dispatcher`] fans per-tick platform and sensor updates
/// across worker threads behind a completion barrier.
pub use cadence_dispatch as dispatch;

/// N-server delay/service queue (`cadence-delay`).
///
/// [`delay::DelayQueue`] models banks of servers with FIFO, LIFO, or
/// priority admission.
pub use cadence_delay as delay;

/// Common imports for typical Cadence usage.
///
/// ```rust
/// use cadence::prelude::*;
/// ```
pub mod prelude {
    // Core traits and handles
    pub use cadence_core::{
        Disposition, EntityHandle, EntityUpdater, EventHandle, FrameUpdater, KernelNotice,
        NullObserver, Priority, ScheduleContext, SimEvent, SimObserver, SimState, WorkKind,
    };

    // Errors
    pub use cadence_core::{LifecycleError, ScheduleError, SubmitError};

    // Engine
    pub use cadence_engine::{
        Advance, ConfigError, EventSubmitter, Scheduler, SchedulerConfig, SchedulerMetrics,
        TimeAdvance,
    };

    // Dispatch
    pub use cadence_dispatch::{Dispatcher, DispatcherConfig, PassReport};

    // Delay queue
    pub use cadence_delay::{DelayQueue, DelayRequest, Discipline, ServiceOutcome};
}
