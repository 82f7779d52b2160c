//! Checkpoint - Save/Load Simulation State
//!
//! Enables serialization and deserialization of the mutable simulation
//! state (levels, canal flow, hour counter, status) for pause/resume.
//! Topology and capacities come from the configuration, which is pinned by
//! hash.
//!
//! # Critical Invariants
//!
//! - **Capacity**: restored region levels lie within `[0, capacity]`
//! - **Reservoirs**: restored source levels are non-negative
//! - **Shape**: entity counts and names match the configured network
//! - **Config Matching**: state can only be loaded with matching config

use crate::core::time::SECONDS_PER_HOUR;
use crate::models::canal::Canal;
use crate::models::network::{WaterNetwork, BOUNDS_TOLERANCE};
use crate::models::region::Region;
use crate::models::water_source::WaterSource;
use crate::orchestrator::{SimulationError, SimulationStatus, Termination};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

// ============================================================================
// Snapshot Structures
// ============================================================================

/// Complete orchestrator state snapshot
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StateSnapshot {
    pub current_hour: usize,

    pub status: SimulationStatus,

    pub total_transfers: usize,

    pub total_volume: f64,

    /// Region states in network order
    pub regions: Vec<RegionSnapshot>,

    /// Source states in network order
    pub sources: Vec<SourceSnapshot>,

    /// Canal states in network order
    pub canals: Vec<CanalSnapshot>,

    /// SHA256 hash of the config the state was produced under
    pub config_hash: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegionSnapshot {
    pub name: String,
    pub water_level: f64,
}

impl From<&Region> for RegionSnapshot {
    fn from(region: &Region) -> Self {
        RegionSnapshot {
            name: region.name().to_string(),
            water_level: region.water_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SourceSnapshot {
    pub name: String,
    pub water_level: f64,
}

impl From<&WaterSource> for SourceSnapshot {
    fn from(source: &WaterSource) -> Self {
        SourceSnapshot {
            name: source.name().to_string(),
            water_level: source.water_level(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CanalSnapshot {
    pub name: String,
    pub is_open: bool,
    pub flow_rate: f64,
}

impl From<&Canal> for CanalSnapshot {
    fn from(canal: &Canal) -> Self {
        CanalSnapshot {
            name: canal.name().to_string(),
            is_open: canal.is_open(),
            flow_rate: canal.flow_rate(),
        }
    }
}

// ============================================================================
// Config Hashing
// ============================================================================

/// Compute deterministic SHA256 hash of config
///
/// Snapshots store only levels and flow; the hash pins the topology,
/// capacities, needs and allocation parameters they were taken under.
/// Uses canonical JSON serialization with sorted keys so the hash does not
/// depend on map iteration order.
pub fn compute_config_hash<T: Serialize>(config: &T) -> Result<String, SimulationError> {
    use serde_json::Value;
    use std::collections::BTreeMap;

    let value = serde_json::to_value(config).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    fn canonicalize(value: Value) -> Value {
        match value {
            Value::Object(map) => {
                let sorted: BTreeMap<String, Value> =
                    map.into_iter().map(|(k, v)| (k, canonicalize(v))).collect();
                Value::Object(sorted.into_iter().collect())
            }
            Value::Array(arr) => Value::Array(arr.into_iter().map(canonicalize).collect()),
            other => other,
        }
    }

    let json = serde_json::to_string(&canonicalize(value)).map_err(|e| {
        SimulationError::SerializationError(format!("Config serialization failed: {}", e))
    })?;

    let mut hasher = Sha256::new();
    hasher.update(json.as_bytes());

    Ok(format!("{:x}", hasher.finalize()))
}

// ============================================================================
// Validation Functions
// ============================================================================

/// Validate a snapshot against the network it will be restored into
///
/// Checks:
/// - Entity counts and names line up with the network
/// - Region levels within `[0, capacity]`
/// - Source levels non-negative
/// - Canal flow finite and non-negative, zero when closed
/// - Hour counter within the configured maximum
/// - Status consistent with the hour counter and the saved levels
pub fn validate_snapshot(
    snapshot: &StateSnapshot,
    network: &WaterNetwork,
    max_hours: usize,
    epsilon: f64,
) -> Result<(), SimulationError> {
    if snapshot.current_hour > max_hours {
        return Err(SimulationError::StateValidationError(format!(
            "Hour {} exceeds max_hours {}",
            snapshot.current_hour, max_hours
        )));
    }

    check_shape(
        "region",
        snapshot.regions.iter().map(|r| r.name.as_str()),
        network.regions().iter().map(|r| r.name()),
    )?;
    check_shape(
        "source",
        snapshot.sources.iter().map(|s| s.name.as_str()),
        network.sources().iter().map(|s| s.name()),
    )?;
    check_shape(
        "canal",
        snapshot.canals.iter().map(|c| c.name.as_str()),
        network.canals().iter().map(|c| c.name()),
    )?;

    for (saved, region) in snapshot.regions.iter().zip(network.regions()) {
        let level = saved.water_level;
        if !level.is_finite()
            || level < -BOUNDS_TOLERANCE
            || level > region.water_capacity() + BOUNDS_TOLERANCE
        {
            return Err(SimulationError::StateValidationError(format!(
                "Region {} level {} outside [0, {}]",
                saved.name,
                level,
                region.water_capacity()
            )));
        }
    }

    for saved in &snapshot.sources {
        if !saved.water_level.is_finite() || saved.water_level < -BOUNDS_TOLERANCE {
            return Err(SimulationError::StateValidationError(format!(
                "Source {} has invalid level {}",
                saved.name, saved.water_level
            )));
        }
    }

    for saved in &snapshot.canals {
        let closed_with_flow = !saved.is_open && saved.flow_rate != 0.0;
        if !saved.flow_rate.is_finite() || saved.flow_rate < 0.0 || closed_with_flow {
            return Err(SimulationError::StateValidationError(format!(
                "Canal {} has invalid flow {} m³/s ({} m³/h, open={})",
                saved.name,
                saved.flow_rate,
                saved.flow_rate * SECONDS_PER_HOUR,
                saved.is_open
            )));
        }
    }

    check_status(snapshot, network, max_hours, epsilon)
}

/// A snapshot's status must be one the hour loop could have produced
fn check_status(
    snapshot: &StateSnapshot,
    network: &WaterNetwork,
    max_hours: usize,
    epsilon: f64,
) -> Result<(), SimulationError> {
    let solved = snapshot
        .regions
        .iter()
        .zip(network.regions())
        .all(|(saved, region)| (region.water_need() - saved.water_level).max(0.0) <= epsilon);

    let problem = match snapshot.status {
        SimulationStatus::Running if snapshot.current_hour >= max_hours => {
            Some("running at or past max_hours")
        }
        SimulationStatus::Running if solved => Some("running with every need met"),
        SimulationStatus::Done(Termination::Solved) if !solved => {
            Some("solved with outstanding deficits")
        }
        SimulationStatus::Done(Termination::MaxHoursReached)
            if snapshot.current_hour != max_hours =>
        {
            Some("max hours reached before max_hours")
        }
        _ => None,
    };

    match problem {
        Some(reason) => Err(SimulationError::StateValidationError(format!(
            "Status {:?} at hour {} is inconsistent: {}",
            snapshot.status, snapshot.current_hour, reason
        ))),
        None => Ok(()),
    }
}

fn check_shape<'a>(
    kind: &str,
    saved: impl ExactSizeIterator<Item = &'a str>,
    expected: impl ExactSizeIterator<Item = &'a str>,
) -> Result<(), SimulationError> {
    if saved.len() != expected.len() {
        return Err(SimulationError::StateValidationError(format!(
            "Snapshot has {} {}s, network has {}",
            saved.len(),
            kind,
            expected.len()
        )));
    }

    for (i, (s, e)) in saved.zip(expected).enumerate() {
        if s != e {
            return Err(SimulationError::StateValidationError(format!(
                "Snapshot {} #{} is {}, network has {}",
                kind, i, s, e
            )));
        }
    }

    Ok(())
}
