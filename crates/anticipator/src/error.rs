use std::io;

use thiserror::Error;

/// An error returned when a job cannot be handed to a [`Scheduler`](crate::Scheduler).
///
/// The job is dropped without running.
#[derive(Debug, Error)]
pub enum ScheduleError {
    /// The scheduler was joined and does not accept work anymore.
    #[error("scheduler has been joined")]
    Joined,
    /// The background worker thread could not be started.
    #[error("failed to spawn worker thread")]
    Spawn(#[source] io::Error),
}

/// Returned when the process-wide anticipator is installed a second time.
#[derive(Clone, Copy, Debug, Error)]
#[error("the global anticipator is already initialized")]
pub struct AlreadyInitialized;

/// An error constructing an object through an [`Activator`](crate::Activator).
#[derive(Debug, Error)]
pub enum ActivationError {
    /// No constructor is known for the requested type.
    #[error("no constructor registered for `{0}`")]
    UnknownType(&'static str),
    /// The constructor for the requested type failed.
    #[error("failed to construct `{ty}`")]
    Failed {
        ty: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}
