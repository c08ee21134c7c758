use std::any::Any;
use std::fmt;

use moka::sync::Cache;

use super::{SlotMap, Slots, Store, StoreKind};
use crate::Anticipatable;

/// Single-slot-per-key storage with first-writer-wins semantics.
///
/// Reading a value clones it and leaves it in place. Values are never evicted; they live until
/// [`dispose`](Self::dispose) is called or the cache is dropped.
#[derive(Default)]
pub struct ValueCache {
    slots: SlotMap,
}

struct CacheSlots<D: Anticipatable> {
    values: Cache<D, D::Output>,
}

impl<D> Default for CacheSlots<D>
where
    D: Anticipatable,
    D::Output: Clone + Sync,
{
    fn default() -> Self {
        Self {
            values: Cache::builder().build(),
        }
    }
}

impl<D> Slots for CacheSlots<D>
where
    D: Anticipatable,
    D::Output: Clone + Sync,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn len(&self) -> usize {
        self.values.iter().count()
    }
}

impl ValueCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns `true` if a value is stored for `key`.
    pub fn contains<D>(&self, key: &D) -> bool
    where
        D: Anticipatable,
        D::Output: Clone + Sync,
    {
        self.slots
            .with(|slots: &CacheSlots<D>| slots.values.contains_key(key))
            .unwrap_or(false)
    }

    /// The number of values stored, across all descriptor types.
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drops all stored values.
    ///
    /// Returns how many values were still resident.
    pub fn dispose(&self) -> usize {
        self.slots.clear()
    }
}

impl<D> Store<D> for ValueCache
where
    D: Anticipatable,
    D::Output: Clone + Sync,
{
    fn kind(&self) -> StoreKind {
        StoreKind::ValueCache
    }

    fn set(&self, key: D, value: D::Output) -> bool {
        self.slots
            .with_or_default(|slots: &CacheSlots<D>| {
                slots.values.entry(key).or_insert_with(|| value).is_fresh()
            })
            .unwrap_or(false)
    }

    fn try_get(&self, key: &D) -> Option<D::Output> {
        self.slots
            .with(|slots: &CacheSlots<D>| slots.values.get(key))
            .flatten()
    }
}

impl fmt::Debug for ValueCache {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueCache")
            .field("slots", &self.slots)
            .finish()
    }
}
