//! A process-wide [`Anticipator`].
//!
//! Call sites that cannot easily be handed an anticipator use the free functions in this module.
//! The instance is installed once, either explicitly through [`init`] or with default settings by
//! the first call to [`get`]. It is never uninstalled: after [`dispose`], retrievals keep working
//! by computing inline, while new anticipations are rejected.

use std::sync::OnceLock;

use crate::anticipator::Anticipator;
use crate::config::SchedulerConfig;
use crate::error::{AlreadyInitialized, ScheduleError};
use crate::Anticipatable;

static ANTICIPATOR: OnceLock<Anticipator> = OnceLock::new();

/// Installs the process-wide anticipator.
///
/// Fails if an anticipator has already been installed, including a default one installed by
/// [`get`].
pub fn init(config: &SchedulerConfig) -> Result<&'static Anticipator, AlreadyInitialized> {
    let mut installed = false;
    let anticipator = ANTICIPATOR.get_or_init(|| {
        installed = true;
        Anticipator::from_config(config)
    });

    if installed {
        tracing::debug!(mode = ?config.mode, "installed global anticipator");
        Ok(anticipator)
    } else {
        Err(AlreadyInitialized)
    }
}

/// Returns the process-wide anticipator, installing a default one if needed.
pub fn get() -> &'static Anticipator {
    ANTICIPATOR.get_or_init(Anticipator::new)
}

/// Schedules a value on the process-wide anticipator.
///
/// See [`Anticipator::anticipate_value`].
pub fn anticipate_value<D>(key: D) -> Result<(), ScheduleError>
where
    D: Anticipatable,
    D::Output: Clone + Sync,
{
    get().anticipate_value(key)
}

/// See [`Anticipator::get_value`].
pub fn get_value<D>(key: &D) -> Result<D::Output, D::Error>
where
    D: Anticipatable,
    D::Output: Clone + Sync,
{
    get().get_value(key)
}

/// See [`Anticipator::anticipate_allocation`].
pub fn anticipate_allocation<D: Anticipatable>(key: D) -> Result<(), ScheduleError> {
    get().anticipate_allocation(key)
}

/// See [`Anticipator::allocate`].
pub fn allocate<D: Anticipatable>(key: &D) -> Result<D::Output, D::Error> {
    get().allocate(key)
}

/// Disposes the process-wide anticipator, if one was installed.
///
/// Returns the number of anticipated results that were never claimed.
pub fn dispose() -> usize {
    ANTICIPATOR.get().map_or(0, Anticipator::dispose)
}
