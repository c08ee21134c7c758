//! Descriptors for work against a [`Host`].
//!
//! Every descriptor holds a [`HostRef`], so work anticipated for one host is never handed out for
//! another one.

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::activator::{Activator, ViewType};
use crate::error::ActivationError;
use crate::host::{Host, HostRef, ResourceId};
use crate::Anticipatable;

/// Reads a system property.
pub struct SystemProperty<H> {
    pub host: HostRef<H>,
    pub name: Arc<str>,
}

impl<H> SystemProperty<H> {
    pub fn new(host: HostRef<H>, name: impl Into<Arc<str>>) -> Self {
        Self {
            host,
            name: name.into(),
        }
    }
}

impl<H: Host> Anticipatable for SystemProperty<H> {
    type Output = Option<String>;
    type Error = H::Error;

    fn compute(&self) -> Result<Option<String>, H::Error> {
        self.host.system_property(&self.name)
    }
}

impl<H> fmt::Display for SystemProperty<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "system_property, name='{}'", self.name)
    }
}

/// Checks whether the theme resolves an attribute, given its id.
pub struct IdedResourceExists<H> {
    pub host: HostRef<H>,
    pub id: ResourceId,
}

impl<H> IdedResourceExists<H> {
    pub fn new(host: HostRef<H>, id: ResourceId) -> Self {
        Self { host, id }
    }
}

impl<H: Host> Anticipatable for IdedResourceExists<H> {
    type Output = bool;
    type Error = H::Error;

    fn compute(&self) -> Result<bool, H::Error> {
        if self.id.is_none() {
            return Ok(false);
        }
        self.host.resolve_attribute(self.id)
    }
}

impl<H: Host> fmt::Display for IdedResourceExists<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "ided_resource_exists, id={}", self.host.display_id(self.id))
    }
}

/// Checks whether the theme resolves an attribute, given its name and kind.
pub struct NamedResourceExists<H> {
    pub host: HostRef<H>,
    pub name: Arc<str>,
    pub kind: Arc<str>,
}

impl<H> NamedResourceExists<H> {
    pub fn new(host: HostRef<H>, name: impl Into<Arc<str>>, kind: impl Into<Arc<str>>) -> Self {
        Self {
            host,
            name: name.into(),
            kind: kind.into(),
        }
    }
}

impl<H: Host> Anticipatable for NamedResourceExists<H> {
    type Output = bool;
    type Error = H::Error;

    fn compute(&self) -> Result<bool, H::Error> {
        let id = self.host.identifier(&self.name, &self.kind)?;
        if id.is_none() {
            return Ok(false);
        }
        self.host.resolve_attribute(id)
    }
}

impl<H> fmt::Display for NamedResourceExists<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "named_resource_exists, name='{}', kind='{}'",
            self.name, self.kind
        )
    }
}

/// Inflates a layout into a new view.
pub struct InflateResource<H> {
    pub host: HostRef<H>,
    pub id: ResourceId,
}

impl<H> InflateResource<H> {
    pub fn new(host: HostRef<H>, id: ResourceId) -> Self {
        Self { host, id }
    }
}

impl<H: Host> Anticipatable for InflateResource<H> {
    type Output = Option<H::View>;
    type Error = H::Error;

    fn compute(&self) -> Result<Option<H::View>, H::Error> {
        if self.id.is_none() {
            return Ok(None);
        }
        self.host.inflate(self.id).map(Some)
    }
}

impl<H: Host> fmt::Display for InflateResource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inflate_resource, id={}", self.host.display_id(self.id))
    }
}

/// Inflates a layout through the host's context, see [`Host::inflate_from_context`].
///
/// Instances are pooled apart from those of [`InflateResource`], even for the same layout.
pub struct InflateContextResource<H> {
    pub host: HostRef<H>,
    pub id: ResourceId,
}

impl<H> InflateContextResource<H> {
    pub fn new(host: HostRef<H>, id: ResourceId) -> Self {
        Self { host, id }
    }
}

impl<H: Host> Anticipatable for InflateContextResource<H> {
    type Output = Option<H::View>;
    type Error = H::Error;

    fn compute(&self) -> Result<Option<H::View>, H::Error> {
        if self.id.is_none() {
            return Ok(None);
        }
        self.host.inflate_from_context(self.id).map(Some)
    }
}

impl<H: Host> fmt::Display for InflateContextResource<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "inflate_context_resource, id={}", self.host.display_id(self.id))
    }
}

/// Constructs a view of a given type through an [`Activator`].
///
/// The activator only decides how the view is built: two `ActivateView`s for the same host and
/// type are the same work, whichever activator they carry.
pub struct ActivateView<H: Host> {
    pub host: HostRef<H>,
    pub ty: ViewType,
    pub activator: Arc<dyn Activator<H, H::View>>,
}

impl<H: Host> ActivateView<H> {
    pub fn new(host: HostRef<H>, ty: ViewType, activator: Arc<dyn Activator<H, H::View>>) -> Self {
        Self {
            host,
            ty,
            activator,
        }
    }
}

impl<H: Host> Anticipatable for ActivateView<H> {
    type Output = H::View;
    type Error = ActivationError;

    fn compute(&self) -> Result<H::View, ActivationError> {
        self.activator.activate(self.ty, &self.host)
    }
}

impl<H: Host> Clone for ActivateView<H> {
    fn clone(&self) -> Self {
        Self {
            host: self.host.clone(),
            ty: self.ty,
            activator: Arc::clone(&self.activator),
        }
    }
}

impl<H: Host> PartialEq for ActivateView<H> {
    fn eq(&self, other: &Self) -> bool {
        self.host == other.host && self.ty == other.ty
    }
}

impl<H: Host> Eq for ActivateView<H> {}

impl<H: Host> Hash for ActivateView<H> {
    fn hash<S: Hasher>(&self, state: &mut S) {
        self.host.hash(state);
        self.ty.hash(state);
    }
}

impl<H: Host> fmt::Debug for ActivateView<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActivateView")
            .field("host", &self.host)
            .field("ty", &self.ty)
            .finish_non_exhaustive()
    }
}

impl<H: Host> fmt::Display for ActivateView<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "activate_view, type={}", self.ty)
    }
}

// The remaining descriptors compare by all of their fields. Derives would needlessly require
// `H: Clone + Eq + Hash`, hence the manual impls.
macro_rules! impl_value_traits {
    ($ty:ident { $($field:ident),+ }) => {
        impl<H> Clone for $ty<H> {
            fn clone(&self) -> Self {
                Self { $($field: self.$field.clone()),+ }
            }
        }

        impl<H> PartialEq for $ty<H> {
            fn eq(&self, other: &Self) -> bool {
                $(self.$field == other.$field)&&+
            }
        }

        impl<H> Eq for $ty<H> {}

        impl<H> Hash for $ty<H> {
            fn hash<S: Hasher>(&self, state: &mut S) {
                $(self.$field.hash(state);)+
            }
        }

        impl<H> fmt::Debug for $ty<H> {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.debug_struct(stringify!($ty))
                    $(.field(stringify!($field), &self.$field))+
                    .finish()
            }
        }
    };
}

impl_value_traits!(SystemProperty { host, name });
impl_value_traits!(IdedResourceExists { host, id });
impl_value_traits!(NamedResourceExists { host, name, kind });
impl_value_traits!(InflateResource { host, id });
impl_value_traits!(InflateContextResource { host, id });
