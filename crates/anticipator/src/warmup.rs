//! Anticipations registered when the host starts up.

use std::sync::Arc;

use serde::Deserialize;

use crate::activator::{Activator, ViewType};
use crate::anticipator::Anticipator;
use crate::descriptor::StaticInit;
use crate::error::{ActivationError, ScheduleError};
use crate::host::{Host, HostRef, ResourceId};
use crate::keys::{
    ActivateView, IdedResourceExists, InflateContextResource, InflateResource,
    NamedResourceExists, SystemProperty,
};

/// A resource looked up by name.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct NamedResource {
    pub name: String,
    /// The resource kind, such as `attr` or `layout`.
    pub kind: String,
}

/// A layout to pre-inflate.
#[derive(Clone, Debug, Deserialize, Eq, PartialEq)]
pub struct Layout {
    pub id: ResourceId,
    /// How many instances to keep ready.
    #[serde(default = "default_layout_count")]
    pub count: usize,
}

fn default_layout_count() -> usize {
    1
}

/// What to anticipate when the host starts up.
#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq)]
#[serde(default)]
pub struct WarmupConfig {
    /// System properties to read, such as the SDK version.
    pub system_properties: Vec<String>,
    /// Theme attributes to resolve by id.
    pub attributes: Vec<ResourceId>,
    /// Theme attributes to resolve by name.
    pub named_resources: Vec<NamedResource>,
    /// Layouts to inflate ahead of time.
    pub layouts: Vec<Layout>,
    /// Layouts to inflate ahead of time through the host's context.
    pub context_layouts: Vec<Layout>,
}

impl WarmupConfig {
    /// The number of anticipations this plan schedules.
    pub fn len(&self) -> usize {
        self.system_properties.len()
            + self.attributes.len()
            + self.named_resources.len()
            + self.layouts.iter().map(|layout| layout.count).sum::<usize>()
            + self.context_layouts.iter().map(|layout| layout.count).sum::<usize>()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Binds an [`Anticipator`] to a [`Host`].
///
/// The host registers its startup work through [`register`](Self::register) and
/// [`anticipate_view`](Self::anticipate_view), then retrieves results through the typed accessors,
/// which build the same descriptors. Everything that was not anticipated is computed inline.
#[derive(Debug)]
pub struct Warmup<'a, H: Host> {
    anticipator: &'a Anticipator,
    host: HostRef<H>,
}

impl<'a, H: Host> Warmup<'a, H> {
    pub fn new(anticipator: &'a Anticipator, host: HostRef<H>) -> Self {
        Self { anticipator, host }
    }

    pub fn anticipator(&self) -> &'a Anticipator {
        self.anticipator
    }

    pub fn host(&self) -> &HostRef<H> {
        &self.host
    }

    /// Schedules everything in `config`, plus the given static initializers.
    ///
    /// Returns the number of anticipations scheduled. Stops at the first one the scheduler refuses.
    pub fn register(
        &self,
        config: &WarmupConfig,
        statics: &[StaticInit],
    ) -> Result<usize, ScheduleError> {
        let anticipator = self.anticipator;
        let mut scheduled = 0;

        for name in &config.system_properties {
            anticipator.anticipate_value(SystemProperty::new(self.host.clone(), name.as_str()))?;
            scheduled += 1;
        }

        for init in statics {
            anticipator.anticipate_value(*init)?;
            scheduled += 1;
        }

        for id in &config.attributes {
            anticipator.anticipate_value(IdedResourceExists::new(self.host.clone(), *id))?;
            scheduled += 1;
        }

        for resource in &config.named_resources {
            anticipator.anticipate_value(NamedResourceExists::new(
                self.host.clone(),
                resource.name.as_str(),
                resource.kind.as_str(),
            ))?;
            scheduled += 1;
        }

        for layout in &config.layouts {
            for _ in 0..layout.count {
                anticipator.anticipate_allocation(InflateResource::new(
                    self.host.clone(),
                    layout.id,
                ))?;
                scheduled += 1;
            }
        }

        for layout in &config.context_layouts {
            for _ in 0..layout.count {
                anticipator.anticipate_allocation(InflateContextResource::new(
                    self.host.clone(),
                    layout.id,
                ))?;
                scheduled += 1;
            }
        }

        tracing::debug!(scheduled, "registered startup anticipations");
        Ok(scheduled)
    }

    /// Schedules the construction of `count` views of type `ty`.
    pub fn anticipate_view(
        &self,
        ty: ViewType,
        activator: Arc<dyn Activator<H, H::View>>,
        count: usize,
    ) -> Result<(), ScheduleError> {
        let key = ActivateView::new(self.host.clone(), ty, activator);
        for _ in 0..count {
            self.anticipator.anticipate_allocation(key.clone())?;
        }
        Ok(())
    }

    pub fn system_property(&self, name: &str) -> Result<Option<String>, H::Error> {
        self.anticipator
            .get_value(&SystemProperty::new(self.host.clone(), name))
    }

    pub fn ided_resource_exists(&self, id: ResourceId) -> Result<bool, H::Error> {
        self.anticipator
            .get_value(&IdedResourceExists::new(self.host.clone(), id))
    }

    pub fn named_resource_exists(&self, name: &str, kind: &str) -> Result<bool, H::Error> {
        self.anticipator
            .get_value(&NamedResourceExists::new(self.host.clone(), name, kind))
    }

    /// Takes a pre-inflated instance of layout `id`, or inflates one.
    pub fn inflate_resource(&self, id: ResourceId) -> Result<Option<H::View>, H::Error> {
        self.anticipator
            .allocate(&InflateResource::new(self.host.clone(), id))
    }

    /// Takes a pre-inflated instance of layout `id` from the context layouts, or inflates one
    /// through the host's context.
    pub fn inflate_context_resource(&self, id: ResourceId) -> Result<Option<H::View>, H::Error> {
        self.anticipator
            .allocate(&InflateContextResource::new(self.host.clone(), id))
    }

    /// Takes a pre-built view of type `ty`, or builds one with `activator`.
    pub fn activate_view(
        &self,
        ty: ViewType,
        activator: Arc<dyn Activator<H, H::View>>,
    ) -> Result<H::View, ActivationError> {
        self.anticipator
            .allocate(&ActivateView::new(self.host.clone(), ty, activator))
    }

    /// Disposes the anticipator, once the host shuts down.
    ///
    /// Returns the number of anticipated results that were never claimed.
    pub fn finish(self) -> usize {
        self.anticipator.dispose()
    }
}
