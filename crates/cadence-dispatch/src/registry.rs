//! Generation-checked entity registry.
//!
//! The registry is owned by the sim thread (all methods take `&mut
//! self` or `&self` on the dispatcher), so there is no lock here.
//! Handles are `(index, generation)` pairs: deleting an entity bumps
//! its slot generation, and any operation presented with a stale
//! handle is a silent no-op rather than an error. That is how
//! in-flight references to a deleted entity are defused.

use indexmap::IndexSet;

use cadence_core::EntityHandle;

/// Periodic-update state for a platform's sensor.
#[derive(Clone, Copy, Debug)]
pub(crate) struct SensorState {
    /// Seconds between updates once the sensor is running.
    pub interval: f64,
    /// Simulation time the next update falls due.
    pub next_due: f64,
}

struct Slot {
    generation: u32,
    live: bool,
    sensor: Option<SensorState>,
}

/// Slab of platform slots plus insertion-ordered live-handle set.
///
/// The `IndexSet` keeps pass order deterministic: a platform pass
/// visits entities in registration order, independent of slot reuse.
#[derive(Default)]
pub(crate) struct EntityRegistry {
    slots: Vec<Slot>,
    free: Vec<u32>,
    order: IndexSet<EntityHandle>,
}

impl EntityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live platforms.
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Register a platform, reusing a freed slot if one is available.
    pub fn add(&mut self) -> EntityHandle {
        let index = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.live = true;
                slot.sensor = None;
                index
            }
            None => {
                self.slots.push(Slot {
                    generation: 0,
                    live: true,
                    sensor: None,
                });
                (self.slots.len() - 1) as u32
            }
        };
        let handle = EntityHandle {
            index,
            generation: self.slots[index as usize].generation,
        };
        self.order.insert(handle);
        handle
    }

    /// Delete a platform (and its sensor). The slot generation is
    /// bumped so outstanding handles go stale. Returns `false` for a
    /// handle that is already stale.
    pub fn remove(&mut self, handle: EntityHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.live = false;
                slot.sensor = None;
                slot.generation = slot.generation.wrapping_add(1);
                self.free.push(handle.index);
                self.order.shift_remove(&handle);
                true
            }
            None => false,
        }
    }

    /// Start (or retune) the platform's periodic sensor. Stale handle
    /// is a no-op returning `false`.
    pub fn set_sensor(&mut self, handle: EntityHandle, interval: f64, first_due: f64) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => {
                slot.sensor = Some(SensorState {
                    interval,
                    next_due: first_due,
                });
                true
            }
            None => false,
        }
    }

    /// Stop the platform's sensor. Stale handle is a no-op.
    pub fn clear_sensor(&mut self, handle: EntityHandle) -> bool {
        match self.slot_mut(handle) {
            Some(slot) => slot.sensor.take().is_some(),
            None => false,
        }
    }

    /// Live platform handles in registration order.
    pub fn platforms(&self) -> impl Iterator<Item = EntityHandle> + '_ {
        self.order.iter().copied()
    }

    /// Handles and due times of sensors with `next_due <= now`.
    pub fn due_sensors(&self, now: f64) -> Vec<(EntityHandle, f64)> {
        self.order
            .iter()
            .filter_map(|&handle| {
                let slot = &self.slots[handle.index as usize];
                slot.sensor
                    .filter(|s| s.next_due <= now)
                    .map(|s| (handle, s.next_due))
            })
            .collect()
    }

    /// Advance a sensor's schedule after a completed update:
    /// `next_due = now + interval`. Stale handles (entity deleted
    /// mid-pass by an update hook) are silently ignored.
    pub fn complete_sensor(&mut self, handle: EntityHandle, now: f64) {
        if let Some(slot) = self.slot_mut(handle) {
            if let Some(sensor) = &mut slot.sensor {
                sensor.next_due = now + sensor.interval;
            }
        }
    }

    fn slot_mut(&mut self, handle: EntityHandle) -> Option<&mut Slot> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        (slot.live && slot.generation == handle.generation).then_some(slot)
    }
}
