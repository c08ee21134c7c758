//! Storage for anticipated results.
//!
//! There are two kinds of stores, which differ in what happens when a result is read:
//!
//! - The [`ValueCache`] holds at most one result per key. The first result stored for a key wins,
//!   and reading it leaves it in place, so every reader gets a clone of the same value.
//! - The [`AllocationHeap`] holds any number of results per key. Reading takes one of them out of
//!   the pool, handing ownership to the reader; every stored result is handed out at most once.
//!
//! Both stores accept descriptors of any type. Internally, they keep one typed map per descriptor
//! type, so descriptors of different types never collide even if their fields do.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::Anticipatable;

mod cache;
mod heap;

pub use cache::ValueCache;
pub use heap::AllocationHeap;

/// The kind of a [`Store`], as reported in logs and metrics.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum StoreKind {
    ValueCache,
    AllocationHeap,
}

impl StoreKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            StoreKind::ValueCache => "value_cache",
            StoreKind::AllocationHeap => "allocation_heap",
        }
    }
}

impl fmt::Display for StoreKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A concurrent store of anticipated results for descriptors of type `D`.
///
/// Stores are written by the background worker and read from arbitrary threads; they do their own
/// synchronization.
pub trait Store<D: Anticipatable>: Send + Sync {
    /// The kind of this store.
    fn kind(&self) -> StoreKind;

    /// Stores a result for `key`.
    ///
    /// Returns `false` if the store declined the value, in which case it is dropped.
    fn set(&self, key: D, value: D::Output) -> bool;

    /// Looks up a result for `key`.
    fn try_get(&self, key: &D) -> Option<D::Output>;
}

/// The typed per-descriptor storage, with its type erased.
trait Slots: Send + Sync {
    fn as_any(&self) -> &dyn Any;

    /// The number of results currently held.
    fn len(&self) -> usize;
}

/// A map from a [`Slots`] type to its single instance.
#[derive(Default)]
struct SlotMap {
    slots: RwLock<HashMap<TypeId, Arc<dyn Slots>>>,
}

impl SlotMap {
    /// Runs `f` on the slots of type `S`, if they exist.
    fn with<S, R>(&self, f: impl FnOnce(&S) -> R) -> Option<R>
    where
        S: Slots + 'static,
    {
        let slots = self.slots.read().get(&TypeId::of::<S>()).cloned()?;
        slots.as_any().downcast_ref::<S>().map(f)
    }

    /// Runs `f` on the slots of type `S`, creating them first if needed.
    fn with_or_default<S, R>(&self, f: impl FnOnce(&S) -> R) -> Option<R>
    where
        S: Slots + Default + 'static,
    {
        let existing = self.slots.read().get(&TypeId::of::<S>()).cloned();
        let slots = match existing {
            Some(slots) => slots,
            None => {
                let mut map = self.slots.write();
                let slots = map
                    .entry(TypeId::of::<S>())
                    .or_insert_with(|| Arc::new(S::default()));
                Arc::clone(slots)
            }
        };
        slots.as_any().downcast_ref::<S>().map(f)
    }

    fn len(&self) -> usize {
        self.slots.read().values().map(|slots| slots.len()).sum()
    }

    /// Removes all slots, dropping the results they hold.
    ///
    /// Returns the number of results that were dropped.
    fn clear(&self) -> usize {
        let slots = std::mem::take(&mut *self.slots.write());
        slots.values().map(|slots| slots.len()).sum()
    }
}

impl fmt::Debug for SlotMap {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let slots = self.slots.read();
        f.debug_struct("SlotMap")
            .field("descriptor_types", &slots.len())
            .field("results", &slots.values().map(|s| s.len()).sum::<usize>())
            .finish()
    }
}
