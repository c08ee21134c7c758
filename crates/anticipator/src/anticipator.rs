use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Instant;

use crate::config::SchedulerConfig;
use crate::error::ScheduleError;
use crate::scheduler::{self, Scheduler};
use crate::store::{AllocationHeap, Store, ValueCache};
use crate::Anticipatable;

/// Precomputes values and pre-builds objects on a background worker.
///
/// Work is described by [`Anticipatable`] descriptors. Anticipating a descriptor schedules its
/// computation on the worker and stores the result; retrieving it later through an equal
/// descriptor hands out the stored result, or computes it inline if there is none (yet). Retrieval
/// never waits for the worker.
///
/// There are two stores with different retrieval semantics:
///
/// - [`anticipate_value`](Self::anticipate_value) / [`get_value`](Self::get_value) go through the
///   [`ValueCache`], which keeps one shared value per descriptor.
/// - [`anticipate_allocation`](Self::anticipate_allocation) / [`allocate`](Self::allocate) go
///   through the [`AllocationHeap`], where each anticipation produces one instance that is handed
///   out exactly once.
///
/// Dropping the anticipator [disposes](Self::dispose) it.
pub struct Anticipator {
    scheduler: Box<dyn Scheduler>,
    cache: Arc<ValueCache>,
    heap: Arc<AllocationHeap>,
    disposed: AtomicBool,
}

impl Anticipator {
    /// Creates an anticipator with a background worker and default settings.
    pub fn new() -> Self {
        Self::from_config(&SchedulerConfig::default())
    }

    pub fn from_config(config: &SchedulerConfig) -> Self {
        Self::with_scheduler(scheduler::from_config(config))
    }

    /// Creates an anticipator that runs its anticipations on the given scheduler.
    pub fn with_scheduler(scheduler: Box<dyn Scheduler>) -> Self {
        Self {
            scheduler,
            cache: Arc::new(ValueCache::new()),
            heap: Arc::new(AllocationHeap::new()),
            disposed: AtomicBool::new(false),
        }
    }

    /// Schedules the computation of a value for `key`.
    ///
    /// The result is only stored if the cache holds no value for `key` yet, so anticipating the
    /// same key twice keeps the first result.
    pub fn anticipate_value<D>(&self, key: D) -> Result<(), ScheduleError>
    where
        D: Anticipatable,
        D::Output: Clone + Sync,
    {
        self.anticipate(Arc::clone(&self.cache), key)
    }

    /// Returns the anticipated value for `key`, or computes it inline.
    ///
    /// An inline computation is not stored; only anticipations fill the cache.
    pub fn get_value<D>(&self, key: &D) -> Result<D::Output, D::Error>
    where
        D: Anticipatable,
        D::Output: Clone + Sync,
    {
        fetch(&*self.cache, key)
    }

    /// Schedules the construction of one instance for `key`.
    ///
    /// Every call adds another instance to the pool of `key`.
    pub fn anticipate_allocation<D>(&self, key: D) -> Result<(), ScheduleError>
    where
        D: Anticipatable,
    {
        self.anticipate(Arc::clone(&self.heap), key)
    }

    /// Takes a pre-built instance for `key` out of the pool, or constructs one inline.
    pub fn allocate<D>(&self, key: &D) -> Result<D::Output, D::Error>
    where
        D: Anticipatable,
    {
        fetch(&*self.heap, key)
    }

    /// The store backing [`get_value`](Self::get_value).
    pub fn value_cache(&self) -> &ValueCache {
        &self.cache
    }

    /// The store backing [`allocate`](Self::allocate).
    pub fn allocation_heap(&self) -> &AllocationHeap {
        &self.heap
    }

    /// Waits for all scheduled anticipations, then drops every result that was never claimed.
    ///
    /// Returns the number of dropped results. Afterwards, new anticipations are rejected, while
    /// retrieval keeps working by computing inline. Disposing more than once is a no-op.
    ///
    /// Called from within an anticipation, this cannot wait for the other anticipations. It then
    /// only rejects new anticipations and keeps all results, so a later `dispose` from outside the
    /// worker still releases them.
    pub fn dispose(&self) -> usize {
        if self.disposed.swap(true, Ordering::AcqRel) {
            return 0;
        }

        if !self.scheduler.join() {
            self.disposed.store(false, Ordering::Release);
            tracing::warn!("anticipator disposed from within an anticipation, keeping results");
            return 0;
        }

        let values = self.cache.dispose();
        let allocations = self.heap.dispose();
        tracing::debug!(values, allocations, "anticipator disposed");

        values + allocations
    }

    fn anticipate<D, S>(&self, store: Arc<S>, key: D) -> Result<(), ScheduleError>
    where
        D: Anticipatable,
        S: Store<D> + 'static,
    {
        let kind = store.kind();
        let job = Box::new(move || {
            let start = Instant::now();
            let result = key.compute();
            let elapsed = start.elapsed();
            metric!(timer("anticipator.compute") = elapsed, "store" => kind.as_str());

            match result {
                Ok(value) => {
                    tracing::debug!(store = %kind, key = %key, ?elapsed, "anticipated");
                    if !store.set(key, value) {
                        tracing::trace!(store = %kind, "anticipation already present");
                    }
                    metric!(counter("anticipator.anticipated") += 1, "store" => kind.as_str());
                }
                Err(error) => {
                    tracing::warn!(
                        store = %kind,
                        key = %key,
                        error = &error as &dyn std::error::Error,
                        "anticipation failed"
                    );
                    metric!(counter("anticipator.failed") += 1, "store" => kind.as_str());
                }
            }
        });

        self.scheduler.schedule(job)
    }
}

fn fetch<D, S>(store: &S, key: &D) -> Result<D::Output, D::Error>
where
    D: Anticipatable,
    S: Store<D>,
{
    let kind = store.kind();

    if let Some(value) = store.try_get(key) {
        tracing::debug!(store = %kind, key = %key, "anticipation hit");
        metric!(counter("anticipator.hit") += 1, "store" => kind.as_str());
        return Ok(value);
    }

    tracing::debug!(store = %kind, key = %key, "anticipation miss");
    metric!(counter("anticipator.miss") += 1, "store" => kind.as_str());
    key.compute()
}

impl Default for Anticipator {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for Anticipator {
    fn drop(&mut self) {
        self.dispose();
    }
}

impl fmt::Debug for Anticipator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Anticipator")
            .field("cache", &self.cache)
            .field("heap", &self.heap)
            .field("disposed", &self.disposed.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}
