//! Worker-pool entity-update dispatcher for the Cadence kernel.
//!
//! A [`Dispatcher`] owns a registry of entities (platforms, each with
//! an optional periodic sensor) and a pool of worker threads. The sim
//! thread drives passes: [`Dispatcher::update_platforms`] fans one
//! kinematic update per platform out across the pool,
//! [`Dispatcher::update_sensors`] does the same for due sensors, and
//! both block until every item has an outcome. Entities are addressed
//! through generation-checked [`EntityHandle`]s, so references to
//! deleted entities defuse silently instead of corrupting a neighbor.
//!
//! [`EntityHandle`]: cadence_core::EntityHandle

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

mod pool;
mod registry;
mod work;

pub use pool::{DispatchConfigError, Dispatcher, DispatcherConfig, PassReport};
