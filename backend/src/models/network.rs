//! Water Network State
//!
//! Owns every region, water source and canal of the simulated system in
//! flat arenas addressed by [`RegionId`], [`SourceId`] and [`CanalId`].
//! Canals refer to their endpoints by index, never by reference, so there
//! are no ownership cycles between canals and regions.
//!
//! # Critical Invariants
//!
//! 1. **Capacity**: every region satisfies `0 <= level <= capacity`
//! 2. **Reservoirs**: every source level is `>= 0`
//! 3. **Referential Integrity**: every canal references existing regions and
//!    (if any) an existing source
//! 4. **Unique Names**: names are unique per entity kind

use crate::core::time::SECONDS_PER_HOUR;
use crate::models::canal::{Canal, CanalId};
use crate::models::region::{Region, RegionError, RegionId};
use crate::models::water_source::{SourceId, WaterSource};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use thiserror::Error;

/// Slack allowed at the `[0, capacity]` bounds for accumulated float error
pub const BOUNDS_TOLERANCE: f64 = 1e-9;

/// Errors raised while constructing or validating a network
#[derive(Debug, Error, PartialEq)]
pub enum NetworkError {
    #[error("Duplicate {kind} name: {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("Canal {canal} references unknown region {region}")]
    UnknownRegion { canal: String, region: String },

    #[error("Canal {canal} references unknown water source {source_name}")]
    UnknownSource { canal: String, source_name: String },

    #[error("Canal {canal} references region index {index} out of range")]
    RegionIndexOutOfRange { canal: String, index: usize },

    #[error("Canal {canal} references source index {index} out of range")]
    SourceIndexOutOfRange { canal: String, index: usize },

    #[error("Water source {name} has invalid level {level}")]
    InvalidSourceLevel { name: String, level: f64 },

    #[error("Invalid region: {0}")]
    InvalidRegion(#[from] RegionError),
}

// ============================================================================
// Configuration Types
// ============================================================================

/// Declarative description of a network, resolved by name
///
/// # Example
///
/// ```rust
/// use acequia_core_rs::{NetworkConfig, WaterNetwork};
///
/// let json = r#"{
///     "regions": [
///         {"name": "A", "water_level": 10.0, "water_need": 2.0, "water_capacity": 20.0},
///         {"name": "B", "water_level": 0.0, "water_need": 8.0, "water_capacity": 10.0}
///     ],
///     "sources": [{"name": "RIVER", "water_level": 100.0}],
///     "canals": [{"name": "A_TO_B", "from": "A", "to": "B", "source": "RIVER"}]
/// }"#;
///
/// let config: NetworkConfig = serde_json::from_str(json).unwrap();
/// let network = WaterNetwork::from_config(&config).unwrap();
/// assert_eq!(network.num_regions(), 2);
/// assert_eq!(network.num_canals(), 1);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NetworkConfig {
    pub regions: Vec<RegionConfig>,

    #[serde(default)]
    pub sources: Vec<SourceConfig>,

    #[serde(default)]
    pub canals: Vec<CanalConfig>,
}

/// Initial state of one region
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionConfig {
    pub name: String,
    pub water_level: f64,
    pub water_need: f64,
    pub water_capacity: f64,
}

/// Initial state of one reservoir
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    pub name: String,
    pub water_level: f64,
}

/// One directed canal; endpoints and source are referenced by name
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CanalConfig {
    pub name: String,
    pub from: String,
    pub to: String,

    /// Feeding reservoir (None = canal never carries water)
    #[serde(default)]
    pub source: Option<String>,
}

// ============================================================================
// Network
// ============================================================================

/// Complete water network state
///
/// # Example
///
/// ```rust
/// use acequia_core_rs::{Canal, Region, RegionId, SourceId, WaterNetwork, WaterSource};
///
/// let network = WaterNetwork::new(
///     vec![
///         Region::new("A".to_string(), 10.0, 2.0, 20.0),
///         Region::new("B".to_string(), 0.0, 8.0, 10.0),
///     ],
///     vec![WaterSource::new("RIVER".to_string(), 100.0)],
///     vec![Canal::new("A_TO_B".to_string(), RegionId(0), RegionId(1), Some(SourceId(0)))],
/// )
/// .unwrap();
///
/// assert!(!network.solved(1e-3));
/// assert_eq!(network.unmet_deficit(), 8.0);
/// ```
#[derive(Debug, Clone)]
pub struct WaterNetwork {
    regions: Vec<Region>,
    sources: Vec<WaterSource>,
    canals: Vec<Canal>,

    /// Name → index lookup for regions
    region_names: HashMap<String, RegionId>,
}

impl WaterNetwork {
    /// Build a network from already-indexed entities
    ///
    /// Validates every invariant listed in the module docs.
    pub fn new(
        regions: Vec<Region>,
        sources: Vec<WaterSource>,
        canals: Vec<Canal>,
    ) -> Result<Self, NetworkError> {
        let mut region_names = HashMap::with_capacity(regions.len());
        for (index, region) in regions.iter().enumerate() {
            if region_names
                .insert(region.name().to_string(), RegionId(index))
                .is_some()
            {
                return Err(NetworkError::DuplicateName {
                    kind: "region",
                    name: region.name().to_string(),
                });
            }
        }

        check_unique_names("water source", sources.iter().map(|s| s.name()))?;
        check_unique_names("canal", canals.iter().map(|c| c.name()))?;

        let network = Self {
            regions,
            sources,
            canals,
            region_names,
        };
        network.validate(BOUNDS_TOLERANCE)?;

        Ok(network)
    }

    /// Resolve a name-based configuration into an indexed network
    pub fn from_config(config: &NetworkConfig) -> Result<Self, NetworkError> {
        let regions: Vec<Region> = config
            .regions
            .iter()
            .map(|rc| {
                Region::new(
                    rc.name.clone(),
                    rc.water_level,
                    rc.water_need,
                    rc.water_capacity,
                )
            })
            .collect();

        let sources: Vec<WaterSource> = config
            .sources
            .iter()
            .map(|sc| WaterSource::new(sc.name.clone(), sc.water_level))
            .collect();

        // Names must be unique before canals are resolved against them
        let region_index = index_names(
            "region",
            config.regions.iter().map(|rc| rc.name.as_str()),
            RegionId,
        )?;
        let source_index = index_names(
            "water source",
            config.sources.iter().map(|sc| sc.name.as_str()),
            SourceId,
        )?;

        let mut canals = Vec::with_capacity(config.canals.len());
        for cc in &config.canals {
            let resolve_region = |name: &str| {
                region_index
                    .get(name)
                    .copied()
                    .ok_or_else(|| NetworkError::UnknownRegion {
                        canal: cc.name.clone(),
                        region: name.to_string(),
                    })
            };
            let from = resolve_region(cc.from.as_str())?;
            let to = resolve_region(cc.to.as_str())?;

            let source = match &cc.source {
                Some(name) => Some(source_index.get(name.as_str()).copied().ok_or_else(|| {
                    NetworkError::UnknownSource {
                        canal: cc.name.clone(),
                        source_name: name.clone(),
                    }
                })?),
                None => None,
            };

            canals.push(Canal::new(cc.name.clone(), from, to, source));
        }

        Self::new(regions, sources, canals)
    }

    /// Check every network invariant
    pub fn validate(&self, tolerance: f64) -> Result<(), NetworkError> {
        for region in &self.regions {
            region.validate(tolerance)?;
        }

        for source in &self.sources {
            let level = source.water_level();
            if !level.is_finite() || level < -tolerance {
                return Err(NetworkError::InvalidSourceLevel {
                    name: source.name().to_string(),
                    level,
                });
            }
        }

        for canal in &self.canals {
            for endpoint in [canal.source_region(), canal.destination_region()] {
                if endpoint.index() >= self.regions.len() {
                    return Err(NetworkError::RegionIndexOutOfRange {
                        canal: canal.name().to_string(),
                        index: endpoint.index(),
                    });
                }
            }
            if let Some(source) = canal.water_source() {
                if source.index() >= self.sources.len() {
                    return Err(NetworkError::SourceIndexOutOfRange {
                        canal: canal.name().to_string(),
                        index: source.index(),
                    });
                }
            }
        }

        Ok(())
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    /// All regions in iteration order
    pub fn regions(&self) -> &[Region] {
        &self.regions
    }

    /// All canals in declaration order
    pub fn canals(&self) -> &[Canal] {
        &self.canals
    }

    pub fn sources(&self) -> &[WaterSource] {
        &self.sources
    }

    pub fn region(&self, id: RegionId) -> Option<&Region> {
        self.regions.get(id.index())
    }

    pub fn region_mut(&mut self, id: RegionId) -> Option<&mut Region> {
        self.regions.get_mut(id.index())
    }

    pub fn source(&self, id: SourceId) -> Option<&WaterSource> {
        self.sources.get(id.index())
    }

    pub fn source_mut(&mut self, id: SourceId) -> Option<&mut WaterSource> {
        self.sources.get_mut(id.index())
    }

    pub fn canal(&self, id: CanalId) -> Option<&Canal> {
        self.canals.get(id.index())
    }

    pub fn canal_mut(&mut self, id: CanalId) -> Option<&mut Canal> {
        self.canals.get_mut(id.index())
    }

    /// Look up a region by name
    pub fn region_id(&self, name: &str) -> Option<RegionId> {
        self.region_names.get(name).copied()
    }

    /// Look up a region by name
    pub fn region_by_name(&self, name: &str) -> Option<&Region> {
        self.region_id(name).and_then(|id| self.region(id))
    }

    /// Look up a canal by name
    pub fn canal_id(&self, name: &str) -> Option<CanalId> {
        self.canals
            .iter()
            .position(|c| c.name() == name)
            .map(CanalId)
    }

    /// Look up a source by name
    pub fn source_id(&self, name: &str) -> Option<SourceId> {
        self.sources
            .iter()
            .position(|s| s.name() == name)
            .map(SourceId)
    }

    pub fn num_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn num_sources(&self) -> usize {
        self.sources.len()
    }

    pub fn num_canals(&self) -> usize {
        self.canals.len()
    }

    // ========================================================================
    // Hourly bookkeeping
    // ========================================================================

    /// Close every canal and zero its flow
    pub fn reset_canals(&mut self) {
        for canal in &mut self.canals {
            canal.reset();
        }
    }

    /// Move `amount` from `donor` to `recipient` through `canal`, drawing
    /// the same amount from `source`
    ///
    /// Opens the canal and adds `amount / 3600` to its flow. Returns false
    /// without touching anything if any id is out of range.
    pub fn apply_transfer(
        &mut self,
        canal: CanalId,
        source: SourceId,
        donor: RegionId,
        recipient: RegionId,
        amount: f64,
    ) -> bool {
        let resolved = canal.index() < self.canals.len()
            && source.index() < self.sources.len()
            && donor.index() < self.regions.len()
            && recipient.index() < self.regions.len();
        if !resolved {
            return false;
        }

        let canal = &mut self.canals[canal.index()];
        canal.toggle_open(true);
        // A canal used twice in one hour carries the sum of both volumes
        canal.set_flow_rate(canal.flow_rate() + amount / SECONDS_PER_HOUR);

        self.sources[source.index()].update_water_level(-amount);
        self.regions[donor.index()].update_water_level(-amount);
        self.regions[recipient.index()].update_water_level(amount);

        true
    }

    /// True when no region has a deficit above `epsilon`
    pub fn solved(&self, epsilon: f64) -> bool {
        self.regions.iter().all(|r| r.deficit() <= epsilon)
    }

    /// Sum of all region deficits
    pub fn unmet_deficit(&self) -> f64 {
        self.regions.iter().map(|r| r.deficit()).sum()
    }

    /// Number of regions with a deficit above `epsilon`
    pub fn needy_region_count(&self, epsilon: f64) -> usize {
        self.regions
            .iter()
            .filter(|r| r.deficit() > epsilon)
            .count()
    }

    /// Sum of all region levels
    pub fn total_region_water(&self) -> f64 {
        self.regions.iter().map(|r| r.water_level()).sum()
    }

    /// Sum of all reservoir levels
    pub fn total_source_water(&self) -> f64 {
        self.sources.iter().map(|s| s.water_level()).sum()
    }

    /// Canals currently open
    pub fn open_canals(&self) -> impl Iterator<Item = (CanalId, &Canal)> {
        self.canals
            .iter()
            .enumerate()
            .filter(|(_, c)| c.is_open())
            .map(|(i, c)| (CanalId(i), c))
    }
}

/// Name → id map, rejecting the first repeated name
fn index_names<'a, Id>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
    id: impl Fn(usize) -> Id,
) -> Result<HashMap<&'a str, Id>, NetworkError> {
    let mut index = HashMap::new();
    for (i, name) in names.enumerate() {
        if index.insert(name, id(i)).is_some() {
            return Err(NetworkError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(index)
}

fn check_unique_names<'a>(
    kind: &'static str,
    names: impl Iterator<Item = &'a str>,
) -> Result<(), NetworkError> {
    let mut seen = HashSet::new();
    for name in names {
        if !seen.insert(name) {
            return Err(NetworkError::DuplicateName {
                kind,
                name: name.to_string(),
            });
        }
    }
    Ok(())
}
