//! Canal model
//!
//! A canal is a directed link from a donor region to a recipient region,
//! fed by at most one water source. Several canals may connect the same
//! ordered pair of regions.
//!
//! Flow state is a per-hour observation: every canal is closed with zero
//! flow at the start of each hour and only re-opened when it carries water.

use crate::core::time::SECONDS_PER_HOUR;
use crate::models::region::RegionId;
use crate::models::water_source::SourceId;
use serde::{Deserialize, Serialize};

/// Arena index of a canal inside a [`WaterNetwork`](crate::WaterNetwork)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CanalId(pub usize);

impl CanalId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for CanalId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "canal#{}", self.0)
    }
}

/// Directed transfer link between two regions
///
/// # Example
/// ```
/// use acequia_core_rs::{Canal, RegionId, SourceId};
///
/// let mut canal = Canal::new(
///     "ACEQUIA_MADRE".to_string(),
///     RegionId(0),
///     RegionId(1),
///     Some(SourceId(0)),
/// );
/// assert!(!canal.is_open());
///
/// canal.toggle_open(true);
/// canal.set_flow_rate(6.0 / 3600.0);
/// assert!((canal.hourly_volume() - 6.0).abs() < 1e-9);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Canal {
    name: String,

    /// Donor end
    source_region: RegionId,

    /// Recipient end
    destination_region: RegionId,

    /// Reservoir feeding the canal (None = canal can never carry water)
    water_source: Option<SourceId>,

    is_open: bool,

    /// Volumetric flow (m³/s) for the current hour
    flow_rate: f64,
}

impl Canal {
    /// Create a closed canal with zero flow
    pub fn new(
        name: String,
        source_region: RegionId,
        destination_region: RegionId,
        water_source: Option<SourceId>,
    ) -> Self {
        Self {
            name,
            source_region,
            destination_region,
            water_source,
            is_open: false,
            flow_rate: 0.0,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source_region(&self) -> RegionId {
        self.source_region
    }

    pub fn destination_region(&self) -> RegionId {
        self.destination_region
    }

    pub fn water_source(&self) -> Option<SourceId> {
        self.water_source
    }

    pub fn is_open(&self) -> bool {
        self.is_open
    }

    pub fn flow_rate(&self) -> f64 {
        self.flow_rate
    }

    pub fn toggle_open(&mut self, open: bool) {
        self.is_open = open;
    }

    pub fn set_flow_rate(&mut self, flow_rate: f64) {
        self.flow_rate = flow_rate;
    }

    /// Close the canal and zero its flow (start of every hour)
    pub fn reset(&mut self) {
        self.is_open = false;
        self.flow_rate = 0.0;
    }

    /// Volume carried this hour, derived from the flow rate
    pub fn hourly_volume(&self) -> f64 {
        self.flow_rate * SECONDS_PER_HOUR
    }
}
