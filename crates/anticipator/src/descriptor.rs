use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};

/// A unit of deferred work that can be anticipated.
///
/// Implementors are cheap, immutable keys: two descriptors that describe the same work must
/// compare equal and hash identically, so that a value computed in the background for one of them
/// can be handed out when the other is requested. Construction, equality and hashing must not have
/// side effects; only [`compute`](Self::compute) may.
///
/// The [`Display`](fmt::Display) implementation is the diagnostic string used in logs. It should
/// name the kind of work and its discriminating fields.
pub trait Anticipatable: Clone + Eq + Hash + fmt::Display + Send + Sync + 'static {
    /// The value produced by this work.
    type Output: Send + 'static;
    /// The error returned when the work fails.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Performs the work.
    ///
    /// This may be expensive, and it is called either on the background worker or, on a miss,
    /// inline on the thread asking for the value.
    fn compute(&self) -> Result<Self::Output, Self::Error>;
}

/// Runs a one-time static initializer.
///
/// This is used to warm up expensive statics (typically a [`LazyLock`](std::sync::LazyLock)) off
/// the main thread. Two `StaticInit`s are the same work if they have the same name.
#[derive(Clone, Copy)]
pub struct StaticInit {
    name: &'static str,
    init: fn(),
}

impl StaticInit {
    /// Creates a descriptor that calls `init` when computed.
    pub const fn new(name: &'static str, init: fn()) -> Self {
        Self { name, init }
    }

    /// The name identifying this initializer.
    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for StaticInit {
    fn eq(&self, other: &Self) -> bool {
        self.name == other.name
    }
}

impl Eq for StaticInit {}

impl Hash for StaticInit {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name.hash(state);
    }
}

impl fmt::Debug for StaticInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("StaticInit")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl fmt::Display for StaticInit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "static_init={}", self.name)
    }
}

impl Anticipatable for StaticInit {
    type Output = ();
    type Error = Infallible;

    fn compute(&self) -> Result<(), Infallible> {
        (self.init)();
        Ok(())
    }
}
