use std::convert::Infallible;
use std::fmt;
use std::thread;
use std::time::{Duration, Instant};

use anticipator::{Anticipatable, Anticipator, Host, ResourceId, ScheduleError};
use serde::{Deserialize, Serialize};

#[derive(Debug, Deserialize, Serialize)]
pub struct WorkloadsConfig {
    pub workloads: Vec<Workload>,
}

#[derive(Debug, Deserialize, Serialize)]
pub struct Workload {
    /// Number of threads retrieving results.
    pub concurrency: usize,
    /// Which store the workload goes through.
    pub store: StoreChoice,
    /// Number of distinct descriptors.
    #[serde(default = "default_keys")]
    pub keys: usize,
    /// How long a single computation takes.
    #[serde(with = "humantime_serde")]
    pub cost: Duration,
    /// Number of anticipations registered per descriptor before retrieval starts.
    #[serde(default)]
    pub anticipate: usize,
}

fn default_keys() -> usize {
    1
}

#[derive(Clone, Copy, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StoreChoice {
    Value,
    Allocation,
}

/// Simulates expensive work by spinning for a fixed time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub struct Synthetic {
    pub workload: usize,
    pub key: usize,
    pub cost: Duration,
}

impl fmt::Display for Synthetic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "synthetic, workload={}, key={}, cost={:?}",
            self.workload, self.key, self.cost
        )
    }
}

impl Anticipatable for Synthetic {
    type Output = Vec<u8>;
    type Error = Infallible;

    fn compute(&self) -> Result<Vec<u8>, Infallible> {
        spin(self.cost);
        Ok(vec![self.key as u8; 64])
    }
}

/// A host whose platform calls return canned results, after spinning for `cost`.
///
/// Used to run the startup warm-up plan of the configuration.
#[derive(Debug)]
pub struct SyntheticHost {
    pub cost: Duration,
}

fn spin(cost: Duration) {
    let deadline = Instant::now() + cost;
    while Instant::now() < deadline {
        thread::yield_now();
    }
}

impl Host for SyntheticHost {
    type View = Vec<u8>;
    type Error = Infallible;

    fn system_property(&self, name: &str) -> Result<Option<String>, Infallible> {
        spin(self.cost);
        Ok(Some(format!("synthetic {name}")))
    }

    fn identifier(&self, name: &str, _kind: &str) -> Result<ResourceId, Infallible> {
        spin(self.cost);
        Ok(ResourceId(name.len() as u32))
    }

    fn resolve_attribute(&self, _id: ResourceId) -> Result<bool, Infallible> {
        spin(self.cost);
        Ok(true)
    }

    fn inflate(&self, id: ResourceId) -> Result<Vec<u8>, Infallible> {
        spin(self.cost);
        Ok(vec![id.0 as u8; 256])
    }
}

/// A workload with its descriptors resolved.
#[derive(Debug)]
pub struct PreparedWorkload {
    pub concurrency: usize,
    pub store: StoreChoice,
    pub anticipate: usize,
    pub keys: Vec<Synthetic>,
}

pub fn prepare_workload(index: usize, workload: Workload) -> PreparedWorkload {
    let keys = (0..workload.keys.max(1))
        .map(|key| Synthetic {
            workload: index,
            key,
            cost: workload.cost,
        })
        .collect();

    PreparedWorkload {
        concurrency: workload.concurrency.max(1),
        store: workload.store,
        anticipate: workload.anticipate,
        keys,
    }
}

/// Registers the initial anticipations of a workload.
pub fn register(
    anticipator: &Anticipator,
    workload: &PreparedWorkload,
) -> Result<(), ScheduleError> {
    for key in &workload.keys {
        for _ in 0..workload.anticipate {
            match workload.store {
                StoreChoice::Value => anticipator.anticipate_value(key.clone())?,
                StoreChoice::Allocation => anticipator.anticipate_allocation(key.clone())?,
            }
        }
    }
    Ok(())
}

/// Retrieves the result for `key` once.
///
/// Allocations are replenished right away, so the pool keeps up if the worker can.
pub fn process(anticipator: &Anticipator, store: StoreChoice, key: &Synthetic) {
    match store {
        StoreChoice::Value => {
            let Ok(value) = anticipator.get_value(key);
            std::hint::black_box(value);
        }
        StoreChoice::Allocation => {
            let Ok(instance) = anticipator.allocate(key);
            std::hint::black_box(instance);
            if let Err(error) = anticipator.anticipate_allocation(key.clone()) {
                tracing::debug!(%error, "failed to replenish pool");
            }
        }
    }
}
