use std::any::Any;
use std::collections::HashMap;
use std::fmt;

use parking_lot::Mutex;

use super::{SlotMap, Slots, Store, StoreKind};
use crate::Anticipatable;

/// Pool storage where every stored instance is handed out at most once.
///
/// Any number of instances can be pooled per key. Taking an instance removes it from the pool; a
/// key whose pool is exhausted behaves as if it had never been stored.
#[derive(Default)]
pub struct AllocationHeap {
    slots: SlotMap,
}

struct HeapSlots<D: Anticipatable> {
    pools: Mutex<HashMap<D, Vec<D::Output>>>,
}

impl<D: Anticipatable> Default for HeapSlots<D> {
    fn default() -> Self {
        Self {
            pools: Mutex::new(HashMap::new()),
        }
    }
}

impl<D: Anticipatable> HeapSlots<D> {
    fn push(&self, key: D, value: D::Output) {
        self.pools.lock().entry(key).or_default().push(value);
    }

    fn pop(&self, key: &D) -> Option<D::Output> {
        let mut pools = self.pools.lock();
        let pool = pools.get_mut(key)?;
        let value = pool.pop();
        if pool.is_empty() {
            pools.remove(key);
        }
        value
    }

    fn pooled(&self, key: &D) -> usize {
        self.pools.lock().get(key).map_or(0, Vec::len)
    }
}

impl<D: Anticipatable> Slots for HeapSlots<D> {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.pools.lock().values().map(Vec::len).sum()
    }
}

impl AllocationHeap {
    pub fn new() -> Self {
        Self::default()
    }

    /// The number of instances currently pooled for `key`.
    pub fn pooled<D: Anticipatable>(&self, key: &D) -> usize {
        self.slots
            .with(|slots: &HeapSlots<D>| slots.pooled(key))
            .unwrap_or(0)
    }

    /// The number of pooled instances, across all keys and descriptor types.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all instances that were never taken.
    ///
    /// Returns how many instances were dropped.
    pub fn dispose(&self) -> usize {
        self.slots.clear()
    }
}

impl<D: Anticipatable> Store<D> for AllocationHeap {
    fn kind(&self) -> StoreKind {
        StoreKind::AllocationHeap
    }

    fn set(&self, key: D, value: D::Output) -> bool {
        self.slots
            .with_or_default(|slots: &HeapSlots<D>| slots.push(key, value))
            .is_some()
    }

    fn try_get(&self, key: &D) -> Option<D::Output> {
        self.slots
            .with(|slots: &HeapSlots<D>| slots.pop(key))
            .flatten()
    }
}

impl fmt::Debug for AllocationHeap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AllocationHeap")
            .field("slots", &self.slots)
            .finish()
    }
}
