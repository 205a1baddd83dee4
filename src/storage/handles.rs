use std::fmt;
use std::marker::PhantomData;

use crate::types::{DejavuError, Result};

/// Packed slot index plus the generation it was issued for.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct RawHandle {
    index: u32,
    generation: u32,
}

impl RawHandle {
    /// Packs the handle into a single integer for binding layers.
    pub fn to_raw(self) -> u64 {
        (u64::from(self.generation) << 32) | u64::from(self.index)
    }

    /// Reverses [`RawHandle::to_raw`].
    pub fn from_raw(raw: u64) -> Self {
        Self {
            index: raw as u32,
            generation: (raw >> 32) as u32,
        }
    }
}

impl fmt::Debug for RawHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}v{}", self.index, self.generation)
    }
}

/// Kind marker tying a handle type to the table it indexes.
pub trait HandleKind {
    /// Name used in `InvalidHandle` errors.
    const NAME: &'static str;
}

/// Typed handle into a [`HandleTable`].
pub struct Handle<K> {
    raw: RawHandle,
    _kind: PhantomData<fn() -> K>,
}

impl<K> Handle<K> {
    fn new(raw: RawHandle) -> Self {
        Self {
            raw,
            _kind: PhantomData,
        }
    }

    /// Packs the handle into a single integer.
    pub fn to_raw(self) -> u64 {
        self.raw.to_raw()
    }

    /// Rebuilds a handle from [`Handle::to_raw`] output. Validity is checked on use.
    pub fn from_raw(raw: u64) -> Self {
        Self::new(RawHandle::from_raw(raw))
    }
}

impl<K> Clone for Handle<K> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<K> Copy for Handle<K> {}

impl<K> PartialEq for Handle<K> {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl<K> Eq for Handle<K> {}

impl<K> std::hash::Hash for Handle<K> {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl<K: HandleKind> fmt::Debug for Handle<K> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}#{:?}", K::NAME, self.raw)
    }
}

/// Marker for graph descriptor handles.
#[derive(Debug)]
pub enum GraphKind {}
/// Marker for sampled path set handles.
#[derive(Debug)]
pub enum PathSetKind {}
/// Marker for automorphism result handles.
#[derive(Debug)]
pub enum ResultKind {}

impl HandleKind for GraphKind {
    const NAME: &'static str = "graph";
}
impl HandleKind for PathSetKind {
    const NAME: &'static str = "path set";
}
impl HandleKind for ResultKind {
    const NAME: &'static str = "result";
}

/// Handle to a graph descriptor.
pub type GraphHandle = Handle<GraphKind>;
/// Handle to a set of sampled paths.
pub type PathSetHandle = Handle<PathSetKind>;
/// Handle to an automorphism result.
pub type ResultHandle = Handle<ResultKind>;

struct Slot<T> {
    generation: u32,
    value: Option<T>,
}

/// Slot map issuing generation-checked handles.
///
/// Deleting bumps the slot generation, so a stale handle never resolves to a
/// value stored later in the same slot.
pub struct HandleTable<K, T> {
    slots: Vec<Slot<T>>,
    free: Vec<u32>,
    len: usize,
    _kind: PhantomData<fn() -> K>,
}

impl<K: HandleKind, T> Default for HandleTable<K, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: HandleKind, T> HandleTable<K, T> {
    /// Creates an empty table.
    pub fn new() -> Self {
        Self {
            slots: Vec::new(),
            free: Vec::new(),
            len: 0,
            _kind: PhantomData,
        }
    }

    /// Number of live entries.
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` when no entry is live.
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Stores `value` and returns its handle.
    pub fn insert(&mut self, value: T) -> Result<Handle<K>> {
        let raw = match self.free.pop() {
            Some(index) => {
                let slot = &mut self.slots[index as usize];
                slot.value = Some(value);
                RawHandle {
                    index,
                    generation: slot.generation,
                }
            }
            None => {
                let index = u32::try_from(self.slots.len())
                    .map_err(|_| DejavuError::InvalidState("handle table is full"))?;
                self.slots.push(Slot {
                    generation: 0,
                    value: Some(value),
                });
                RawHandle {
                    index,
                    generation: 0,
                }
            }
        };
        self.len += 1;
        Ok(Handle::new(raw))
    }

    /// Resolves `handle`.
    pub fn get(&self, handle: Handle<K>) -> Result<&T> {
        self.slots
            .get(handle.raw.index as usize)
            .filter(|slot| slot.generation == handle.raw.generation)
            .and_then(|slot| slot.value.as_ref())
            .ok_or(DejavuError::InvalidHandle(K::NAME))
    }

    /// Resolves `handle` mutably.
    pub fn get_mut(&mut self, handle: Handle<K>) -> Result<&mut T> {
        self.slots
            .get_mut(handle.raw.index as usize)
            .filter(|slot| slot.generation == handle.raw.generation)
            .and_then(|slot| slot.value.as_mut())
            .ok_or(DejavuError::InvalidHandle(K::NAME))
    }

    /// Removes and returns the value behind `handle`.
    pub fn remove(&mut self, handle: Handle<K>) -> Result<T> {
        let index = handle.raw.index;
        let slot = self
            .slots
            .get_mut(index as usize)
            .filter(|slot| slot.generation == handle.raw.generation)
            .ok_or(DejavuError::InvalidHandle(K::NAME))?;
        let value = slot.value.take().ok_or(DejavuError::InvalidHandle(K::NAME))?;
        slot.generation = slot.generation.wrapping_add(1);
        self.free.push(index);
        self.len -= 1;
        Ok(value)
    }
}
