//! Helpers for testing the anticipator.
//!
//! When writing tests, keep the following points in mind:
//!
//!  - In every test, call [`setup`]. This will set up the logger so that all console output
//!    is captured by the test runner.
//!
//!  - Background anticipations finish at some point after they were scheduled. Use [`wait_until`]
//!    to poll for their effect, or dispose the anticipator, which waits for all of them.
//!
//!  - Descriptors in this crate compare by their id only. Clones share their counters, so a clone
//!    handed to the anticipator reports back to the one kept by the test.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;
use std::time::{Duration, Instant};

use anticipator::{Anticipatable, Host, HostRef, ResourceId};
use parking_lot::Mutex;
use tracing_subscriber::filter::EnvFilter;
use tracing_subscriber::fmt::fmt;

/// Setup the test environment.
///
///  - Initializes logs: The logger only captures logs from the `anticipator` crate and mutes all
///    other logs.
pub fn setup() {
    fmt()
        .with_env_filter(EnvFilter::new("anticipator=trace"))
        .with_target(false)
        .pretty()
        .with_test_writer()
        .try_init()
        .ok();
}

/// Polls `condition` until it holds, for at most `timeout`.
///
/// Returns whether the condition was met.
pub fn wait_until(timeout: Duration, mut condition: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + timeout;
    loop {
        if condition() {
            return true;
        }
        if Instant::now() >= deadline {
            return false;
        }
        thread::sleep(Duration::from_millis(2));
    }
}

/// The error of all failing test descriptors.
#[derive(Debug, thiserror::Error)]
#[error("test computation {0} failed")]
pub struct TestError(pub u32);

#[derive(Clone, Debug, Default)]
pub struct Calls(Arc<AtomicUsize>);

impl Calls {
    fn record(&self) {
        self.0.fetch_add(1, Ordering::SeqCst);
    }

    pub fn get(&self) -> usize {
        self.0.load(Ordering::SeqCst)
    }
}

macro_rules! impl_id_identity {
    ($ty:ident, $($field:ident),+) => {
        impl PartialEq for $ty {
            fn eq(&self, other: &Self) -> bool {
                $(self.$field == other.$field)&&+
            }
        }

        impl Eq for $ty {}

        impl Hash for $ty {
            fn hash<H: Hasher>(&self, state: &mut H) {
                $(self.$field.hash(state);)+
            }
        }
    };
}

/// Returns a fixed value and counts its computations.
#[derive(Clone, Debug)]
pub struct Constant {
    pub name: String,
    pub value: u64,
    pub calls: Calls,
}

impl Constant {
    pub fn new(name: impl Into<String>, value: u64) -> Self {
        Self {
            name: name.into(),
            value,
            calls: Calls::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl_id_identity!(Constant, name);

impl fmt::Display for Constant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "constant, name={}", self.name)
    }
}

impl Anticipatable for Constant {
    type Output = u64;
    type Error = TestError;

    fn compute(&self) -> Result<u64, TestError> {
        self.calls.record();
        Ok(self.value)
    }
}

/// Fails every time it is computed.
#[derive(Clone, Debug)]
pub struct Failing {
    pub id: u32,
    pub calls: Calls,
}

impl Failing {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            calls: Calls::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl_id_identity!(Failing, id);

impl fmt::Display for Failing {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "failing, id={}", self.id)
    }
}

impl Anticipatable for Failing {
    type Output = u64;
    type Error = TestError;

    fn compute(&self) -> Result<u64, TestError> {
        self.calls.record();
        Err(TestError(self.id))
    }
}

/// Panics every time it is computed.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Panicking(pub u32);

impl fmt::Display for Panicking {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "panicking, id={}", self.0)
    }
}

impl Anticipatable for Panicking {
    type Output = u64;
    type Error = TestError;

    fn compute(&self) -> Result<u64, TestError> {
        panic!("panicking descriptor {}", self.0)
    }
}

/// Takes a while to compute.
#[derive(Clone, Debug)]
pub struct Slow {
    pub id: u32,
    pub delay: Duration,
    pub calls: Calls,
}

impl Slow {
    pub fn new(id: u32, delay: Duration) -> Self {
        Self {
            id,
            delay,
            calls: Calls::default(),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.get()
    }
}

impl_id_identity!(Slow, id);

impl fmt::Display for Slow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slow, id={}, delay={:?}", self.id, self.delay)
    }
}

impl Anticipatable for Slow {
    type Output = u64;
    type Error = TestError;

    fn compute(&self) -> Result<u64, TestError> {
        thread::sleep(self.delay);
        self.calls.record();
        Ok(u64::from(self.id))
    }
}

/// An object that reports when it is dropped.
#[derive(Debug)]
pub struct Instance {
    pub serial: usize,
    drops: Calls,
}

impl Drop for Instance {
    fn drop(&mut self) {
        self.drops.record();
    }
}

/// Builds a new, uniquely numbered [`Instance`] on every computation.
#[derive(Clone, Debug)]
pub struct Instances {
    pub id: u32,
    pub created: Calls,
    pub drops: Calls,
}

impl Instances {
    pub fn new(id: u32) -> Self {
        Self {
            id,
            created: Calls::default(),
            drops: Calls::default(),
        }
    }

    /// The number of instances built so far.
    pub fn created(&self) -> usize {
        self.created.get()
    }

    /// The number of instances dropped so far.
    pub fn drops(&self) -> usize {
        self.drops.get()
    }
}

impl_id_identity!(Instances, id);

impl fmt::Display for Instances {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "instances, id={}", self.id)
    }
}

impl Anticipatable for Instances {
    type Output = Instance;
    type Error = TestError;

    fn compute(&self) -> Result<Instance, TestError> {
        let serial = self.created.0.fetch_add(1, Ordering::SeqCst);
        Ok(Instance {
            serial,
            drops: self.drops.clone(),
        })
    }
}

/// A view produced by [`TestHost`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TestView {
    pub layout: ResourceId,
    pub label: String,
}

impl TestView {
    pub fn new(layout: ResourceId, label: impl Into<String>) -> Self {
        Self {
            layout,
            label: label.into(),
        }
    }
}

/// A host with a fixed set of properties and resources that records every call made to it.
#[derive(Debug, Default)]
pub struct TestHost {
    properties: BTreeMap<String, String>,
    identifiers: BTreeMap<(String, String), ResourceId>,
    attributes: BTreeSet<ResourceId>,
    names: BTreeMap<ResourceId, String>,
    calls: Mutex<Vec<String>>,
}

impl TestHost {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_property(mut self, name: &str, value: &str) -> Self {
        self.properties.insert(name.to_owned(), value.to_owned());
        self
    }

    /// Adds an attribute that the theme resolves, findable by `name` and kind `attr`.
    pub fn with_attribute(mut self, id: ResourceId, name: &str) -> Self {
        self.attributes.insert(id);
        self.identifiers
            .insert((name.to_owned(), "attr".to_owned()), id);
        self.names.insert(id, name.to_owned());
        self
    }

    pub fn into_ref(self) -> HostRef<Self> {
        HostRef::new(self)
    }

    /// All calls made so far, in order.
    pub fn calls(&self) -> Vec<String> {
        self.calls.lock().clone()
    }

    fn record(&self, call: String) {
        self.calls.lock().push(call);
    }
}

impl Host for TestHost {
    type View = TestView;
    type Error = TestError;

    fn system_property(&self, name: &str) -> Result<Option<String>, TestError> {
        self.record(format!("system_property({name})"));
        Ok(self.properties.get(name).cloned())
    }

    fn identifier(&self, name: &str, kind: &str) -> Result<ResourceId, TestError> {
        self.record(format!("identifier({name}, {kind})"));
        let key = (name.to_owned(), kind.to_owned());
        Ok(self.identifiers.get(&key).copied().unwrap_or_default())
    }

    fn resolve_attribute(&self, id: ResourceId) -> Result<bool, TestError> {
        self.record(format!("resolve_attribute({id})"));
        Ok(self.attributes.contains(&id))
    }

    fn inflate(&self, id: ResourceId) -> Result<TestView, TestError> {
        self.record(format!("inflate({id})"));
        Ok(TestView::new(id, "inflated"))
    }

    fn inflate_from_context(&self, id: ResourceId) -> Result<TestView, TestError> {
        self.record(format!("inflate_from_context({id})"));
        Ok(TestView::new(id, "inflated from context"))
    }

    fn resource_name(&self, id: ResourceId) -> Option<&str> {
        self.names.get(&id).map(String::as_str)
    }
}
