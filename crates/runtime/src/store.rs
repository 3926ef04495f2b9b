//! Object store and mark-and-sweep garbage collector
//!
//! The store owns every live value. Consumers (operand stack, register file,
//! symbol map) hold [`Handle`]s: stable index+generation references that
//! survive store growth and detect use of a collected slot. Interior
//! pointers are never handed out.
//!
//! Resize policy:
//! - initial capacity 128 slots
//! - grow by 50% when used slots reach 90% of capacity (checked on every
//!   allocation, before the new value is placed)
//! - after a sweep, shrink by 25% when utilization is at or below 75%, never
//!   below the initial capacity
//!
//! Collection roots are the operand stack at the point of collection, every
//! object whose `global` flag is set, and every object with a constant name.
//! STRING is the only aggregate value and owns its bytes directly, so a
//! single-level mark is sufficient.

use crate::error::VmError;
use crate::value::Value;
use tracing::debug;

/// Initial (and minimum) store capacity in slots.
pub const INITIAL_STORE_CAPACITY: usize = 128;
/// Fraction the store grows by during expansion.
pub const STORE_GROWTH_FACTOR: f64 = 0.50;
/// Fraction of free slots remaining that triggers expansion.
pub const STORE_GROWTH_THRESHOLD: f64 = 0.10;
/// Fraction the store shrinks by during compaction.
pub const STORE_SHRINK_FACTOR: f64 = 0.25;
/// Utilization at or below which a post-sweep compaction runs.
pub const STORE_SHRINK_THRESHOLD: f64 = 0.75;

/// A stored value plus its management flags.
#[derive(Debug, Clone, PartialEq)]
pub struct Object {
    pub value: Value,
    /// GC mark bit. Set during the mark phase, cleared after sweep for
    /// non-constants.
    pub reachable: bool,
    /// Globals are collection roots.
    pub global: bool,
    /// Constants are named, never collected, and keep their mark bit.
    pub const_name: Option<String>,
}

impl Object {
    pub fn new(value: Value) -> Self {
        Object {
            value,
            reachable: false,
            global: false,
            const_name: None,
        }
    }

    pub fn global(value: Value) -> Self {
        Object {
            value,
            reachable: false,
            global: true,
            const_name: None,
        }
    }

    pub fn constant(value: Value, name: impl Into<String>) -> Self {
        Object {
            value,
            reachable: true,
            global: false,
            const_name: Some(name.into()),
        }
    }

    pub fn is_constant(&self) -> bool {
        self.const_name.is_some()
    }

    /// Approximate heap footprint in bytes, used for GC statistics.
    pub fn size_bytes(&self) -> usize {
        let mut size = std::mem::size_of::<Object>();
        if let Value::String(s) = &self.value {
            size += s.len() + 1;
        }
        size
    }
}

/// Stable reference to a store slot.
///
/// The generation disambiguates reuse: a handle whose generation no longer
/// matches its slot resolves to nothing instead of to an unrelated value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Handle {
    index: u32,
    generation: u32,
}

#[derive(Debug)]
struct Slot {
    generation: u32,
    object: Option<Object>,
}

/// Statistics returned by a collection cycle.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct GcStats {
    /// Objects freed by the sweep.
    pub collected: usize,
    /// Approximate bytes released.
    pub bytes_freed: usize,
}

/// The owning container of all live values.
#[derive(Debug)]
pub struct ObjectStore {
    slots: Vec<Slot>,
    used: usize,
    /// Starting generation for slots recreated by growth. Slots dropped by
    /// a shrink raise this, so a handle into a truncated slot can never
    /// match a later re-creation of the same index.
    generation_floor: u32,
}

impl Default for ObjectStore {
    fn default() -> Self {
        Self::new()
    }
}

impl ObjectStore {
    pub fn new() -> Self {
        let mut slots = Vec::with_capacity(INITIAL_STORE_CAPACITY);
        slots.resize_with(INITIAL_STORE_CAPACITY, || Slot {
            generation: 0,
            object: None,
        });
        debug!(capacity = INITIAL_STORE_CAPACITY, "object store initialized");
        ObjectStore {
            slots,
            used: 0,
            generation_floor: 0,
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn used_slots(&self) -> usize {
        self.used
    }

    pub fn free_slots(&self) -> usize {
        self.capacity() - self.used
    }

    /// Total approximate size of all stored objects in bytes.
    pub fn objects_size(&self) -> usize {
        self.slots
            .iter()
            .filter_map(|slot| slot.object.as_ref())
            .map(Object::size_bytes)
            .sum()
    }

    /// Place an object into a free slot and return its handle.
    ///
    /// The growth condition is checked first, so on success at least one
    /// free slot always remains.
    pub fn alloc(&mut self, object: Object) -> Result<Handle, VmError> {
        if (self.used as f64) >= self.capacity() as f64 * (1.0 - STORE_GROWTH_THRESHOLD) {
            self.resize((self.capacity() as f64 * (1.0 + STORE_GROWTH_FACTOR)).round() as usize);
        }
        let index = self
            .slots
            .iter()
            .position(|slot| slot.object.is_none())
            .ok_or(VmError::StoreExhausted)?;
        self.slots[index].object = Some(object);
        self.used += 1;
        Ok(Handle {
            index: index as u32,
            generation: self.slots[index].generation,
        })
    }

    /// Resolve a handle. Stale handles (collected or reused slots) yield
    /// `None`.
    pub fn get(&self, handle: Handle) -> Option<&Object> {
        let slot = self.slots.get(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.object.as_ref()
    }

    pub fn get_mut(&mut self, handle: Handle) -> Option<&mut Object> {
        let slot = self.slots.get_mut(handle.index as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        slot.object.as_mut()
    }

    /// Run a full mark-and-sweep cycle.
    ///
    /// `roots` is the operand stack contents at the point of collection;
    /// globals and constants are roots implicitly.
    pub fn collect(&mut self, roots: &[Handle]) -> GcStats {
        // Mark phase
        for &root in roots {
            if let Some(object) = self.get_mut(root) {
                object.reachable = true;
            }
        }
        for slot in &mut self.slots {
            if let Some(object) = slot.object.as_mut()
                && (object.global || object.is_constant())
            {
                object.reachable = true;
            }
        }

        // Sweep phase
        let mut stats = GcStats::default();
        for slot in &mut self.slots {
            let unreachable = slot.object.as_ref().is_some_and(|object| !object.reachable);
            if unreachable {
                let object = slot.object.take().expect("slot checked non-empty");
                stats.bytes_freed += object.size_bytes();
                stats.collected += 1;
                slot.generation = slot.generation.wrapping_add(1);
            }
        }
        self.used -= stats.collected;

        // Compaction
        if self.used > 0
            && (self.used as f64) <= self.capacity() as f64 * STORE_SHRINK_THRESHOLD
        {
            let target = (self.capacity() as f64 * (1.0 - STORE_SHRINK_FACTOR)).round() as usize;
            if target >= INITIAL_STORE_CAPACITY {
                self.resize(target);
            }
        }

        // Mark reset (constants keep their bit and are never collected)
        for slot in &mut self.slots {
            if let Some(object) = slot.object.as_mut()
                && !object.is_constant()
            {
                object.reachable = false;
            }
        }

        debug!(
            collected = stats.collected,
            bytes_freed = stats.bytes_freed,
            capacity = self.capacity(),
            used = self.used,
            "garbage collected"
        );
        stats
    }

    /// Grow or shrink to `new_capacity`, keeping every live slot in place.
    ///
    /// Shrinking only discards empty tail slots; a live object in the tail
    /// blocks further truncation.
    fn resize(&mut self, new_capacity: usize) {
        let old_capacity = self.capacity();
        if new_capacity > old_capacity {
            let floor = self.generation_floor;
            self.slots.resize_with(new_capacity, || Slot {
                generation: floor,
                object: None,
            });
        } else {
            let mut keep = old_capacity;
            while keep > new_capacity && self.slots[keep - 1].object.is_none() {
                keep -= 1;
            }
            for slot in &self.slots[keep..] {
                self.generation_floor = self.generation_floor.max(slot.generation + 1);
            }
            self.slots.truncate(keep);
        }
        debug!(
            from = old_capacity,
            to = self.capacity(),
            "object store resized"
        );
    }
}
