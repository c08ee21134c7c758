//! The platform a UI runs on, as far as anticipations are concerned.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use serde::Deserialize;

/// The numeric id of a platform resource, such as a layout or a theme attribute.
///
/// The id `0` never refers to a resource.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq, Hash, Ord, PartialOrd, Deserialize)]
#[serde(transparent)]
pub struct ResourceId(pub u32);

impl ResourceId {
    /// The id that does not refer to any resource.
    pub const NONE: ResourceId = ResourceId(0);

    pub fn is_none(self) -> bool {
        self == Self::NONE
    }
}

impl From<u32> for ResourceId {
    fn from(id: u32) -> Self {
        Self(id)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:#010x}", self.0)
    }
}

/// Access to the platform services that anticipated work needs.
///
/// A host usually wraps the UI context (an activity, a window) together with its theme, resources
/// and layout inflater. All methods may be called from the background worker.
pub trait Host: Send + Sync + 'static {
    /// The platform's view type, as produced by inflating a layout.
    type View: Send + 'static;
    /// The error returned by platform calls.
    type Error: std::error::Error + Send + Sync + 'static;

    /// Reads a system property, such as the platform SDK version.
    fn system_property(&self, name: &str) -> Result<Option<String>, Self::Error>;

    /// Looks up an identifier by name and kind, returning [`ResourceId::NONE`] if there is none.
    fn identifier(&self, name: &str, kind: &str) -> Result<ResourceId, Self::Error>;

    /// Whether the current theme resolves the attribute `id`.
    fn resolve_attribute(&self, id: ResourceId) -> Result<bool, Self::Error>;

    /// Inflates the layout `id` into a new, detached view.
    fn inflate(&self, id: ResourceId) -> Result<Self::View, Self::Error>;

    /// Inflates the layout `id` with an inflater scoped to the host's context, rather than the
    /// one of its window.
    ///
    /// Hosts without such a distinction inflate the same way as [`inflate`](Self::inflate).
    fn inflate_from_context(&self, id: ResourceId) -> Result<Self::View, Self::Error> {
        self.inflate(id)
    }

    /// A readable name for `id`, used in diagnostics.
    fn resource_name(&self, id: ResourceId) -> Option<&str> {
        let _ = id;
        None
    }
}

/// A shared reference to a [`Host`] that compares by identity.
///
/// Two descriptors refer to the same work only if they run against the very same host instance,
/// regardless of whether two hosts would compare equal by value.
pub struct HostRef<H>(Arc<H>);

impl<H> HostRef<H> {
    pub fn new(host: H) -> Self {
        Self(Arc::new(host))
    }

    /// Formats `id` with its registered name, if the host knows one.
    pub(crate) fn display_id(&self, id: ResourceId) -> ResourceName<'_, H> {
        ResourceName { host: self, id }
    }
}

impl<H> From<Arc<H>> for HostRef<H> {
    fn from(host: Arc<H>) -> Self {
        Self(host)
    }
}

impl<H> Clone for HostRef<H> {
    fn clone(&self) -> Self {
        Self(Arc::clone(&self.0))
    }
}

impl<H> Deref for HostRef<H> {
    type Target = H;

    fn deref(&self) -> &H {
        &self.0
    }
}

impl<H> PartialEq for HostRef<H> {
    fn eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl<H> Eq for HostRef<H> {}

impl<H> Hash for HostRef<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        Arc::as_ptr(&self.0).hash(state);
    }
}

impl<H> fmt::Debug for HostRef<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("HostRef").field(&Arc::as_ptr(&self.0)).finish()
    }
}

pub(crate) struct ResourceName<'a, H> {
    host: &'a HostRef<H>,
    id: ResourceId,
}

impl<H: Host> fmt::Display for ResourceName<'_, H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.host.resource_name(self.id) {
            Some(name) if !self.id.is_none() => f.write_str(name),
            _ => self.id.fmt(f),
        }
    }
}
