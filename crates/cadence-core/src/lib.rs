//! Core types and traits for the Cadence simulation kernel.
//!
//! Everything the kernel's crates share lives here: the [`SimEvent`]
//! trait and its [`Disposition`] contract, strongly-typed handles,
//! the scheduler lifecycle state machine, the observer hook, and the
//! kernel error enums. This crate has no dependencies and no threads;
//! the machinery that uses these types lives in `cadence-engine`,
//! `cadence-dispatch`, and `cadence-delay`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod error;
pub mod event;
pub mod id;
pub mod lifecycle;
pub mod observer;

pub use error::{LifecycleError, ScheduleError, SubmitError};
pub use event::{Disposition, EntityUpdater, FrameUpdater, ScheduleContext, SimEvent};
pub use id::{EntityHandle, EventHandle, Priority};
pub use lifecycle::SimState;
pub use observer::{KernelNotice, NullObserver, SimObserver, WorkKind};
