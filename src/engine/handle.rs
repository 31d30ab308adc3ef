//! Generational handles and the arena that issues them.

use std::fmt;

/// Slot index plus generation counter.
///
/// A slot's generation is bumped when its value is released, so a handle
/// kept past its release no longer resolves.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct RawHandle {
    idx: u32,
    generation: u32,
}

macro_rules! typed_handle {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, Copy, PartialEq, Eq, Hash)]
        pub struct $name(pub(crate) RawHandle);

        impl $name {
            /// Builds a handle from an engine's own slot numbering. Engines
            /// outside this crate use it to issue handles; the pair is only
            /// meaningful to the engine that created it.
            #[inline]
            pub const fn from_parts(index: u32, generation: u32) -> Self {
                Self(RawHandle {
                    idx: index,
                    generation,
                })
            }

            /// Returns the raw slot index (for diagnostics only).
            #[inline]
            pub const fn index(self) -> u32 {
                self.0.idx
            }

            #[inline]
            pub const fn generation(self) -> u32 {
                self.0.generation
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(
                    f,
                    "{}({}@gen{})",
                    stringify!($name),
                    self.0.idx,
                    self.0.generation
                )
            }
        }
    };
}

typed_handle!(
    /// Engine-side node handle.
    NodeHandle
);

typed_handle!(
    /// Engine-side style handle.
    StyleHandle
);

#[derive(Debug)]
struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot storage with a free list and per-slot generations.
#[derive(Debug)]
pub(crate) struct Arena<T> {
    slots: Vec<Slot<T>>,
    free_list: Vec<u32>,
    live: usize,
}

impl<T> Default for Arena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> Arena<T> {
    pub(crate) fn new() -> Self {
        Self {
            slots: Vec::new(),
            free_list: Vec::new(),
            live: 0,
        }
    }

    /// Stores `value` and returns its handle, or `None` once the index space
    /// is exhausted.
    pub(crate) fn insert(&mut self, value: T) -> Option<RawHandle> {
        let idx = match self.free_list.pop() {
            Some(idx) => {
                self.slots[idx as usize].value = Some(value);
                idx
            }
            None => {
                let idx = u32::try_from(self.slots.len()).ok()?;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                idx
            }
        };
        self.live += 1;
        Some(RawHandle {
            idx,
            generation: self.slots[idx as usize].generation,
        })
    }

    pub(crate) fn get(&self, handle: RawHandle) -> Option<&T> {
        self.slots
            .get(handle.idx as usize)
            .filter(|slot| slot.generation == handle.generation)
            .and_then(|slot| slot.value.as_ref())
    }

    /// Releases the value behind `handle`. Returns `None` for stale handles,
    /// which covers double frees.
    pub(crate) fn remove(&mut self, handle: RawHandle) -> Option<T> {
        let slot = self.slots.get_mut(handle.idx as usize)?;
        if slot.generation != handle.generation {
            return None;
        }
        let value = slot.value.take()?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free_list.push(handle.idx);
        self.live -= 1;
        Some(value)
    }

    pub(crate) fn len(&self) -> usize {
        self.live
    }
}
