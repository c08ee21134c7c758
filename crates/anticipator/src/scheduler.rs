//! Background execution of anticipation jobs.
//!
//! The [`WorkerScheduler`] owns a single worker thread which runs submitted jobs one at a time,
//! in submission order. The worker exits on its own after being idle for a while, and is started
//! again by the next [`schedule`](Scheduler::schedule) call. [`InlineScheduler`] runs jobs right
//! away on the calling thread, for targets that have no use for a background thread.

use std::any::Any;
use std::fmt;
use std::io;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
#[cfg(test)]
use std::sync::atomic::{AtomicBool, Ordering};
use std::thread::{self, JoinHandle, ThreadId};
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use parking_lot::{Condvar, Mutex};

use crate::config::{SchedulerConfig, SchedulerMode};
use crate::error::ScheduleError;

/// A unit of work handed to a [`Scheduler`].
pub type Job = Box<dyn FnOnce() + Send + 'static>;

/// Executes jobs off the caller's critical path.
pub trait Scheduler: Send + Sync {
    /// Enqueues a job and returns without waiting for it.
    ///
    /// Jobs run in the order they were scheduled. A job that panics is logged and does not affect
    /// jobs scheduled after it.
    fn schedule(&self, job: Job) -> Result<(), ScheduleError>;

    /// Blocks until every job scheduled before this call has finished.
    ///
    /// After `join` the scheduler rejects new jobs with [`ScheduleError::Joined`]. A job cannot
    /// wait for itself: called from within a job, `join` only stops accepting new jobs and returns
    /// `false` right away, while the jobs still queued keep running.
    fn join(&self) -> bool;
}

/// Creates the scheduler selected by the configuration.
pub fn from_config(config: &SchedulerConfig) -> Box<dyn Scheduler> {
    match config.mode {
        SchedulerMode::Background => Box::new(WorkerScheduler::new(
            config.thread_name.clone(),
            config.idle_timeout,
        )),
        SchedulerMode::Inline => Box::new(InlineScheduler::default()),
    }
}

/// A scheduler backed by one dedicated worker thread.
pub struct WorkerScheduler {
    thread_name: String,
    idle_timeout: Duration,
    receiver: Receiver<Job>,
    state: Arc<Mutex<WorkerState>>,
    #[cfg(test)]
    fail_spawns: AtomicBool,
}

struct WorkerState {
    /// The only sender of the job queue. `None` once joined.
    sender: Option<Sender<Job>>,
    /// Whether a worker thread is currently responsible for the queue.
    running: bool,
    handle: Option<JoinHandle<()>>,
}

impl WorkerScheduler {
    /// Creates a new scheduler.
    ///
    /// The worker thread is only started once the first job is scheduled, and it exits after
    /// `idle_timeout` passes without any new job.
    pub fn new(thread_name: impl Into<String>, idle_timeout: Duration) -> Self {
        let (sender, receiver) = crossbeam_channel::unbounded();
        let state = WorkerState {
            sender: Some(sender),
            running: false,
            handle: None,
        };

        Self {
            thread_name: thread_name.into(),
            idle_timeout,
            receiver,
            state: Arc::new(Mutex::new(state)),
            #[cfg(test)]
            fail_spawns: AtomicBool::new(false),
        }
    }

    fn spawn_worker(&self) -> io::Result<JoinHandle<()>> {
        #[cfg(test)]
        if self.fail_spawns.load(Ordering::Relaxed) {
            return Err(io::Error::other("spawning is disabled"));
        }

        // `thread::Builder` panics on these instead of returning an error.
        if self.thread_name.contains('\0') {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "thread name contains a NUL byte",
            ));
        }

        let worker = Worker {
            receiver: self.receiver.clone(),
            state: Arc::clone(&self.state),
            idle_timeout: self.idle_timeout,
        };

        thread::Builder::new()
            .name(self.thread_name.clone())
            .spawn(move || worker.run())
    }

    #[cfg(test)]
    fn is_running(&self) -> bool {
        self.state.lock().running
    }
}

impl Scheduler for WorkerScheduler {
    fn schedule(&self, job: Job) -> Result<(), ScheduleError> {
        let mut state = self.state.lock();
        if state.sender.is_none() {
            return Err(ScheduleError::Joined);
        }

        // The worker decides to exit while holding the same lock, so either it sees this job, or
        // we see that it is gone and start a new one. It is started before the job is queued, so
        // a job is never left behind when that fails.
        if !state.running {
            let handle = self.spawn_worker().map_err(ScheduleError::Spawn)?;
            state.running = true;
            state.handle = Some(handle);
        }

        let sender = state.sender.as_ref().ok_or(ScheduleError::Joined)?;
        sender.send(job).map_err(|_| ScheduleError::Joined)
    }

    fn join(&self) -> bool {
        let handle = {
            let mut state = self.state.lock();
            // Dropping the sender disconnects the queue: the worker drains it and exits.
            state.sender = None;
            if let Some(handle) = &state.handle {
                if handle.thread().id() == thread::current().id() {
                    return false;
                }
            }
            state.handle.take()
        };

        if let Some(handle) = handle {
            if handle.join().is_err() {
                tracing::error!("anticipation worker terminated abnormally");
            }
        }

        true
    }
}

impl Drop for WorkerScheduler {
    fn drop(&mut self) {
        if !self.join() {
            tracing::debug!("anticipation scheduler dropped by its own worker");
        }
    }
}

impl fmt::Debug for WorkerScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let running = self.state.try_lock().map(|state| state.running);
        f.debug_struct("WorkerScheduler")
            .field("thread_name", &self.thread_name)
            .field("idle_timeout", &self.idle_timeout)
            .field("queued", &self.receiver.len())
            .field("running", &running)
            .finish()
    }
}

struct Worker {
    receiver: Receiver<Job>,
    state: Arc<Mutex<WorkerState>>,
    idle_timeout: Duration,
}

impl Worker {
    fn run(self) {
        tracing::debug!("anticipation worker started");

        loop {
            match self.receiver.recv_timeout(self.idle_timeout) {
                Ok(job) => run_job(job),
                Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {
                    let mut state = self.state.lock();
                    if self.receiver.is_empty() {
                        state.running = false;
                        break;
                    }
                }
            }
        }

        tracing::debug!("anticipation worker exiting");
    }
}

/// A scheduler that runs every job immediately on the calling thread.
///
/// Jobs may be scheduled from several threads at once. `join` waits for the jobs that are still
/// running on other threads.
#[derive(Debug, Default)]
pub struct InlineScheduler {
    state: Mutex<InlineState>,
    idle: Condvar,
}

#[derive(Debug, Default)]
struct InlineState {
    joined: bool,
    /// The threads currently running a job, once per nested job.
    running: Vec<ThreadId>,
}

impl Scheduler for InlineScheduler {
    fn schedule(&self, job: Job) -> Result<(), ScheduleError> {
        let current = thread::current().id();
        {
            let mut state = self.state.lock();
            if state.joined {
                return Err(ScheduleError::Joined);
            }
            state.running.push(current);
        }

        run_job(job);

        let mut state = self.state.lock();
        if let Some(index) = state.running.iter().position(|id| *id == current) {
            state.running.swap_remove(index);
        }
        if state.running.is_empty() {
            self.idle.notify_all();
        }
        Ok(())
    }

    fn join(&self) -> bool {
        let mut state = self.state.lock();
        state.joined = true;
        if state.running.contains(&thread::current().id()) {
            return false;
        }
        while !state.running.is_empty() {
            self.idle.wait(&mut state);
        }
        true
    }
}

fn run_job(job: Job) {
    if let Err(payload) = panic::catch_unwind(AssertUnwindSafe(job)) {
        tracing::error!(panic = panic_message(&*payload), "anticipation job panicked");
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(message) = payload.downcast_ref::<&'static str>() {
        message
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message
    } else {
        "Box<dyn Any>"
    }
}
