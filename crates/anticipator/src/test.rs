//! Descriptors shared by the unit tests.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{Receiver, Sender};

use parking_lot::Mutex;
use thiserror::Error;

use crate::Anticipatable;

#[derive(Debug, Error)]
#[error("computation {0} failed")]
pub struct ComputeFailed(pub u32);

/// Squares a number, counting how often it actually computed.
#[derive(Clone, Debug)]
pub struct Square {
    pub n: u64,
    pub calls: Arc<AtomicUsize>,
}

impl Square {
    pub fn new(n: u64) -> Self {
        Self {
            n,
            calls: Default::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PartialEq for Square {
    fn eq(&self, other: &Self) -> bool {
        self.n == other.n
    }
}

impl Eq for Square {}

impl Hash for Square {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.n.hash(state);
    }
}

impl fmt::Display for Square {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "square, n={}", self.n)
    }
}

impl Anticipatable for Square {
    type Output = u64;
    type Error = ComputeFailed;

    fn compute(&self) -> Result<u64, ComputeFailed> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(self.n * self.n)
    }
}

/// Always fails to compute.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Broken(pub u32);

impl fmt::Display for Broken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "broken, id={}", self.0)
    }
}

impl Anticipatable for Broken {
    type Output = u64;
    type Error = ComputeFailed;

    fn compute(&self) -> Result<u64, ComputeFailed> {
        Err(ComputeFailed(self.0))
    }
}

/// Counts how many of its instances have been dropped.
#[derive(Debug)]
pub struct Tracked {
    pub serial: usize,
    drops: Arc<AtomicUsize>,
}

impl Drop for Tracked {
    fn drop(&mut self) {
        self.drops.fetch_add(1, Ordering::SeqCst);
    }
}

/// Produces a fresh, uniquely numbered [`Tracked`] on every computation.
#[derive(Clone, Debug)]
pub struct Tracker {
    pub id: u32,
    pub created: Arc<AtomicUsize>,
    pub drops: Arc<AtomicUsize>,
}

impl Tracker {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            created: Default::default(),
            drops: Default::default(),
        }
    }

    pub fn drops(&self) -> usize {
        self.drops.load(Ordering::SeqCst)
    }
}

impl PartialEq for Tracker {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Tracker {}

impl Hash for Tracker {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Tracker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "tracker, id={}", self.id)
    }
}

impl Anticipatable for Tracker {
    type Output = Tracked;
    type Error = ComputeFailed;

    fn compute(&self) -> Result<Tracked, ComputeFailed> {
        Ok(Tracked {
            serial: self.created.fetch_add(1, Ordering::SeqCst),
            drops: Arc::clone(&self.drops),
        })
    }
}

/// Reports that its computation started, then waits until it is released.
#[derive(Clone, Debug)]
pub struct Gated {
    pub id: u32,
    started: Sender<()>,
    release: Arc<Mutex<Receiver<()>>>,
}

impl Gated {
    pub fn new(id: u32, started: Sender<()>, release: Receiver<()>) -> Self {
        Self {
            id,
            started,
            release: Arc::new(Mutex::new(release)),
        }
    }
}

impl PartialEq for Gated {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for Gated {}

impl Hash for Gated {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Display for Gated {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "gated, id={}", self.id)
    }
}

impl Anticipatable for Gated {
    type Output = u64;
    type Error = ComputeFailed;

    fn compute(&self) -> Result<u64, ComputeFailed> {
        self.started.send(()).ok();
        self.release.lock().recv().ok();
        Ok(self.id.into())
    }
}
