//! Strategies for constructing views by type.

use std::any::{self, TypeId};
use std::collections::HashMap;
use std::convert::Infallible;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::error::ActivationError;

type BoxError = Box<dyn std::error::Error + Send + Sync>;
type Constructor<C, T> = Box<dyn Fn(&C) -> Result<T, BoxError> + Send + Sync>;

/// Identifies the type of view to construct.
#[derive(Clone, Copy)]
pub struct ViewType {
    id: TypeId,
    name: &'static str,
}

impl ViewType {
    pub fn of<V: 'static>() -> Self {
        Self {
            id: TypeId::of::<V>(),
            name: any::type_name::<V>(),
        }
    }

    /// The full type name.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The type name without its module path.
    pub fn short_name(&self) -> &'static str {
        let base = self.name.split('<').next().unwrap_or(self.name);
        let start = base.rfind("::").map_or(0, |pos| pos + 2);
        &self.name[start..]
    }
}

impl PartialEq for ViewType {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for ViewType {}

impl Hash for ViewType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.id.hash(state);
    }
}

impl fmt::Debug for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("ViewType").field(&self.name).finish()
    }
}

impl fmt::Display for ViewType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.short_name())
    }
}

/// Constructs objects of type `T` for a given [`ViewType`] in a context `C`.
///
/// Which activator is used never influences what is stored by the anticipator; it only decides
/// how an object is built.
pub trait Activator<C, T>: Send + Sync {
    fn activate(&self, ty: ViewType, context: &C) -> Result<T, ActivationError>;
}

/// A registry of constructors, keyed by view type.
///
/// This is the generic way of building views. Types without a registered constructor fail with
/// [`ActivationError::UnknownType`].
pub struct Constructors<C, T> {
    constructors: HashMap<ViewType, Constructor<C, T>>,
}

impl<C, T> Constructors<C, T> {
    pub fn new() -> Self {
        Self {
            constructors: HashMap::new(),
        }
    }

    /// Registers an infallible constructor for the view type `V`.
    pub fn register<V, F>(&mut self, constructor: F) -> &mut Self
    where
        V: 'static,
        F: Fn(&C) -> T + Send + Sync + 'static,
    {
        self.try_register::<V, _, Infallible>(move |context: &C| Ok(constructor(context)))
    }

    /// Registers a constructor for the view type `V`.
    ///
    /// A previously registered constructor for `V` is replaced.
    pub fn try_register<V, F, E>(&mut self, constructor: F) -> &mut Self
    where
        V: 'static,
        F: Fn(&C) -> Result<T, E> + Send + Sync + 'static,
        E: Into<BoxError>,
    {
        let constructor: Constructor<C, T> =
            Box::new(move |context: &C| constructor(context).map_err(Into::into));
        self.constructors.insert(ViewType::of::<V>(), constructor);
        self
    }

    pub fn contains(&self, ty: ViewType) -> bool {
        self.constructors.contains_key(&ty)
    }

    pub fn len(&self) -> usize {
        self.constructors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.constructors.is_empty()
    }

    fn construct(&self, ty: ViewType, context: &C) -> Option<Result<T, ActivationError>> {
        let constructor = self.constructors.get(&ty)?;
        Some(constructor(context).map_err(|source| ActivationError::Failed {
            ty: ty.name(),
            source,
        }))
    }
}

impl<C, T> Default for Constructors<C, T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<C, T> fmt::Debug for Constructors<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.constructors.keys()).finish()
    }
}

impl<C, T> Activator<C, T> for Constructors<C, T> {
    fn activate(&self, ty: ViewType, context: &C) -> Result<T, ActivationError> {
        self.construct(ty, context)
            .unwrap_or(Err(ActivationError::UnknownType(ty.name())))
    }
}

/// Shortcut constructors for well-known types, layered over a fallback activator.
pub struct Specialized<C, T> {
    shortcuts: Constructors<C, T>,
    fallback: Arc<dyn Activator<C, T>>,
}

impl<C, T> Specialized<C, T> {
    pub fn new(shortcuts: Constructors<C, T>, fallback: Arc<dyn Activator<C, T>>) -> Self {
        Self {
            shortcuts,
            fallback,
        }
    }
}

impl<C, T> Activator<C, T> for Specialized<C, T> {
    fn activate(&self, ty: ViewType, context: &C) -> Result<T, ActivationError> {
        match self.shortcuts.construct(ty, context) {
            Some(result) => {
                tracing::debug!(ty = %ty, "activator hit");
                result
            }
            None => {
                tracing::debug!(ty = %ty, "activator miss");
                self.fallback.activate(ty, context)
            }
        }
    }
}

impl<C, T> fmt::Debug for Specialized<C, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Specialized")
            .field("shortcuts", &self.shortcuts)
            .finish_non_exhaustive()
    }
}
