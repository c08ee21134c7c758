//! Hides startup latency by computing values and building objects before they are needed.
//!
//! An [`Anticipator`] runs [`Anticipatable`] work on a background worker and keeps the results
//! until a caller asks for them with an equal descriptor. Callers never wait for the worker: if a
//! result is not there yet, it is computed right away on the calling thread.

#[macro_use]
pub mod metrics;

pub mod activator;
pub mod anticipator;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod global;
pub mod host;
pub mod keys;
pub mod logging;
pub mod scheduler;
pub mod store;
pub mod warmup;

#[cfg(test)]
#[allow(unused)]
pub mod test;

pub use activator::{Activator, Constructors, Specialized, ViewType};
pub use anticipator::Anticipator;
pub use descriptor::{Anticipatable, StaticInit};
pub use error::{ActivationError, AlreadyInitialized, ScheduleError};
pub use host::{Host, HostRef, ResourceId};
pub use scheduler::{InlineScheduler, Job, Scheduler, WorkerScheduler};
pub use store::{AllocationHeap, Store, StoreKind, ValueCache};
pub use warmup::{Warmup, WarmupConfig};
