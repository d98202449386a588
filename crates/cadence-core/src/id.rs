//! Strongly-typed handles for events and entities.

use std::fmt;

/// Tie-break priority for events scheduled at the same simulation time.
///
/// Lower values execute earlier among equal times. The same convention
/// is used by `cadence-delay` for pending-request ordering so that one
/// rule covers the whole kernel.
pub type Priority = i32;

/// Identifies an event scheduled into an [`EventQueue`].
///
/// Handles are unique per queue instance and never reused, which makes
/// lazy cancellation safe: a handle in the cancelled set can only ever
/// refer to the entry it was issued for. Rescheduling an event preserves
/// its handle.
///
/// [`EventQueue`]: https://docs.rs/cadence-engine
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EventHandle(pub u64);

impl fmt::Display for EventHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for EventHandle {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Generation-checked handle to an entity registered with the dispatcher.
///
/// A handle is `(index, generation)`: the index names a registry slot
/// and the generation guards against reuse. Dereferencing a handle whose
/// generation no longer matches the slot's is treated as "entity absent"
/// and silently ignored, which is how stale references from in-flight
/// work items are defused after a mid-tick delete.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EntityHandle {
    /// Registry slot index.
    pub index: u32,
    /// Slot generation at the time the handle was issued.
    pub generation: u32,
}

impl fmt::Display for EntityHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}
