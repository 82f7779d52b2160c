//! Orchestrator Engine - Hour-Loop Controller
//!
//! Drives the simulation one hour at a time, composing the allocation
//! components:
//! - Canal reset (flow state is a per-hour observation)
//! - Demand/supply classification
//! - Greedy transfer pass
//! - Stagnation detection and time advancement
//! - Event logging (complete simulation history)
//!
//! # Architecture
//!
//! ```text
//! For each hour h (while RUNNING):
//! 1. Close every canal, zero its flow
//! 2. Classify regions → deficit queue + donor list
//! 3. Run the greedy transfer pass
//! 4. No transfer?  → DONE(Stagnated), hour not advanced
//! 5. Advance hour
//! 6. solved()?     → DONE(Solved)
//!    hour == max?  → DONE(MaxHoursReached)
//! ```
//!
//! Stagnation is a deliberate termination mode: when an hour moves no water,
//! no later hour can either (levels only move through transfers), so the run
//! stops even though deficits may remain.
//!
//! # Example
//!
//! ```rust
//! use acequia_core_rs::orchestrator::{Orchestrator, OrchestratorConfig, Termination};
//! use acequia_core_rs::models::network::{CanalConfig, NetworkConfig, RegionConfig, SourceConfig};
//!
//! let config = OrchestratorConfig {
//!     max_hours: 24,
//!     network: NetworkConfig {
//!         regions: vec![
//!             RegionConfig { name: "A".to_string(), water_level: 10.0, water_need: 2.0, water_capacity: 20.0 },
//!             RegionConfig { name: "B".to_string(), water_level: 0.0, water_need: 6.0, water_capacity: 10.0 },
//!         ],
//!         sources: vec![SourceConfig { name: "RIVER".to_string(), water_level: 100.0 }],
//!         canals: vec![CanalConfig {
//!             name: "A_TO_B".to_string(),
//!             from: "A".to_string(),
//!             to: "B".to_string(),
//!             source: Some("RIVER".to_string()),
//!         }],
//!     },
//!     allocation: Default::default(),
//! };
//!
//! let mut orchestrator = Orchestrator::new(config).unwrap();
//! let summary = orchestrator.run().unwrap();
//!
//! assert_eq!(summary.termination, Termination::Solved);
//! assert_eq!(summary.final_hour, 1);
//! ```

use crate::allocation::{allocate, classify, AllocationConfig, CanalIndex, ConfigError, TransferRecord};
use crate::core::time::HourClock;
use crate::models::event::{Event, EventLog};
use crate::models::network::{NetworkConfig, NetworkError, WaterNetwork};
use crate::models::{CanalId, RegionId, SourceId};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Configuration Types
// ============================================================================

/// Complete orchestrator configuration
///
/// # Fields
///
/// * `max_hours` - Upper bound on simulated hours
/// * `network` - Regions, sources and canals
/// * `allocation` - Tolerance, safety margin, loop bound, donor order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrchestratorConfig {
    pub max_hours: usize,

    pub network: NetworkConfig,

    #[serde(default)]
    pub allocation: AllocationConfig,
}

impl OrchestratorConfig {
    /// Parse a configuration from JSON
    pub fn from_json(json: &str) -> Result<Self, SimulationError> {
        serde_json::from_str(json).map_err(|e| {
            SimulationError::DeserializationError(format!("Failed to parse config JSON: {}", e))
        })
    }
}

// ============================================================================
// Status & Result Types
// ============================================================================

/// Why the simulation stopped
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Termination {
    /// Every region's deficit is within tolerance
    Solved,

    /// The hour counter reached `max_hours`
    MaxHoursReached,

    /// A full hour passed without a single transfer; deficits may remain
    Stagnated,
}

impl std::fmt::Display for Termination {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Termination::Solved => write!(f, "solved"),
            Termination::MaxHoursReached => write!(f, "max hours reached"),
            Termination::Stagnated => write!(f, "stagnated"),
        }
    }
}

/// Controller state machine: RUNNING → DONE
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SimulationStatus {
    Running,
    Done(Termination),
}

impl SimulationStatus {
    pub fn is_running(&self) -> bool {
        matches!(self, SimulationStatus::Running)
    }

    pub fn termination(&self) -> Option<Termination> {
        match self {
            SimulationStatus::Running => None,
            SimulationStatus::Done(termination) => Some(*termination),
        }
    }
}

/// Result of a single hour
#[derive(Debug, Clone)]
pub struct HourResult {
    /// Hour that was simulated
    pub hour: usize,

    /// Regions queued with a deficit at the start of the hour
    pub needy_regions: usize,

    /// Donor candidates at the start of the hour
    pub donor_regions: usize,

    pub num_transfers: usize,

    /// Total volume moved this hour
    pub volume_transferred: f64,

    /// Need dequeues performed
    pub loops: usize,

    /// Matching was cut off at the dequeue bound
    pub loop_cap_reached: bool,

    /// No transfer happened; the simulation has halted
    pub stagnated: bool,

    /// Sum of region deficits after the hour
    pub unmet_deficit: f64,

    /// Controller status after the hour
    pub status: SimulationStatus,
}

/// Summary of a complete run
#[derive(Debug, Clone, PartialEq)]
pub struct RunSummary {
    /// Hour counter when the run stopped
    pub final_hour: usize,
    pub termination: Termination,
    pub total_transfers: usize,
    pub total_volume: f64,
    pub unmet_deficit: f64,
}

/// Simulation error types
#[derive(Debug, Error, PartialEq)]
pub enum SimulationError {
    #[error("Invalid config: {0}")]
    InvalidConfig(String),

    #[error("Network error: {0}")]
    Network(#[from] NetworkError),

    #[error("Allocation config error: {0}")]
    Config(#[from] ConfigError),

    #[error("Simulation already terminated ({0})")]
    AlreadyTerminated(Termination),

    #[error("Serialization error: {0}")]
    SerializationError(String),

    #[error("Deserialization error: {0}")]
    DeserializationError(String),

    #[error("State validation error: {0}")]
    StateValidationError(String),

    #[error("Config mismatch: checkpoint expects {expected}, got {actual}")]
    ConfigMismatch { expected: String, actual: String },
}

// ============================================================================
// Orchestrator
// ============================================================================

/// Main orchestrator owning the network and driving the hour loop
///
/// Single-threaded: all mutation of region, source and canal state happens
/// inside [`Orchestrator::tick`].
#[derive(Debug)]
pub struct Orchestrator {
    /// Regions, sources, canals
    network: WaterNetwork,

    /// (donor, recipient) → canals, built once
    canal_index: CanalIndex,

    clock: HourClock,

    config: OrchestratorConfig,

    status: SimulationStatus,

    event_log: EventLog,

    /// Transfers executed since hour 0
    total_transfers: usize,

    /// Volume moved since hour 0
    total_volume: f64,
}

impl Orchestrator {
    /// Create new orchestrator from configuration
    ///
    /// Builds the network and the canal index. A network that is already
    /// solved starts in `Done(Solved)`.
    ///
    /// # Returns
    ///
    /// * `Ok(Orchestrator)` - Successfully initialized orchestrator
    /// * `Err(SimulationError)` - Configuration validation failed
    pub fn new(config: OrchestratorConfig) -> Result<Self, SimulationError> {
        Self::validate_config(&config)?;

        let network = WaterNetwork::from_config(&config.network)?;
        let canal_index = CanalIndex::build(network.canals());
        let clock = HourClock::new(config.max_hours);

        let mut orchestrator = Self {
            network,
            canal_index,
            clock,
            config,
            status: SimulationStatus::Running,
            event_log: EventLog::new(),
            total_transfers: 0,
            total_volume: 0.0,
        };

        if orchestrator.solved() {
            orchestrator.finish(Termination::Solved);
        }

        Ok(orchestrator)
    }

    /// Validate configuration
    fn validate_config(config: &OrchestratorConfig) -> Result<(), SimulationError> {
        if config.max_hours == 0 {
            return Err(SimulationError::InvalidConfig(
                "max_hours must be > 0".to_string(),
            ));
        }

        if config.network.regions.is_empty() {
            return Err(SimulationError::InvalidConfig(
                "Must have at least one region".to_string(),
            ));
        }

        config.allocation.validate()?;

        Ok(())
    }

    /// Reassemble an orchestrator from restored parts (checkpoint load)
    pub(crate) fn from_parts(
        config: OrchestratorConfig,
        network: WaterNetwork,
        clock: HourClock,
        status: SimulationStatus,
        total_transfers: usize,
        total_volume: f64,
    ) -> Self {
        let canal_index = CanalIndex::build(network.canals());
        Self {
            network,
            canal_index,
            clock,
            config,
            status,
            event_log: EventLog::new(),
            total_transfers,
            total_volume,
        }
    }

    // ========================================================================
    // Accessors
    // ========================================================================

    pub fn current_hour(&self) -> usize {
        self.clock.current_hour()
    }

    pub fn max_hours(&self) -> usize {
        self.clock.max_hours()
    }

    pub fn status(&self) -> SimulationStatus {
        self.status
    }

    pub fn is_running(&self) -> bool {
        self.status.is_running()
    }

    pub fn network(&self) -> &WaterNetwork {
        &self.network
    }

    /// Get mutable reference to the network
    ///
    /// Primarily for testing. Direct mutation bypasses the allocation
    /// invariants.
    pub fn network_mut(&mut self) -> &mut WaterNetwork {
        &mut self.network
    }

    pub fn canal_index(&self) -> &CanalIndex {
        &self.canal_index
    }

    pub fn config(&self) -> &OrchestratorConfig {
        &self.config
    }

    pub fn event_log(&self) -> &EventLog {
        &self.event_log
    }

    pub fn event_count(&self) -> usize {
        self.event_log.len()
    }

    pub fn total_transfers(&self) -> usize {
        self.total_transfers
    }

    pub fn total_volume(&self) -> f64 {
        self.total_volume
    }

    /// True when no region has a deficit above the configured tolerance
    pub fn solved(&self) -> bool {
        self.network.solved(self.config.allocation.epsilon)
    }

    fn log_event(&mut self, event: Event) {
        self.event_log.log(event);
    }

    // ========================================================================
    // Hour Loop Implementation
    // ========================================================================

    /// Execute one simulation hour
    ///
    /// # Returns
    ///
    /// * `Ok(HourResult)` - Hour executed; `status` tells whether the run continues
    /// * `Err(SimulationError::AlreadyTerminated)` - Called after the run stopped
    pub fn tick(&mut self) -> Result<HourResult, SimulationError> {
        if let SimulationStatus::Done(termination) = self.status {
            return Err(SimulationError::AlreadyTerminated(termination));
        }

        let hour = self.current_hour();
        let allocation = self.config.allocation.clone();

        // STEP 1: RESET CANALS
        self.network.reset_canals();
        let canal_count = self.network.num_canals();
        self.log_event(Event::CanalsReset { hour, canal_count });

        // STEP 2: CLASSIFY
        let classification = classify(self.network.regions(), &allocation);
        let needy_regions = classification.num_needs();
        let donor_regions = classification.num_donors();
        self.log_event(Event::Classified {
            hour,
            needy_regions,
            donor_regions,
            total_deficit: classification.total_deficit(),
        });

        // STEP 3: GREEDY TRANSFERS
        let outcome = allocate(
            &mut self.network,
            &self.canal_index,
            classification,
            &allocation,
        );

        let transfer_events: Vec<Event> = outcome
            .transfers
            .iter()
            .map(|record| self.transfer_event(hour, record))
            .collect();
        for event in transfer_events {
            self.log_event(event);
        }

        if outcome.loop_cap_reached {
            self.log_event(Event::LoopCapReached {
                hour,
                loops: outcome.loops,
                outstanding_needs: outcome.unserved.len(),
            });
        }

        let num_transfers = outcome.num_transfers();
        let volume_transferred = outcome.total_volume();
        let stagnated = !outcome.did_transfer();

        // STEP 4: STAGNATION CHECK / ADVANCE TIME
        if stagnated {
            let unmet_deficit = self.network.unmet_deficit();
            let needy = self.network.needy_region_count(allocation.epsilon);
            tracing::warn!(hour, needy, unmet_deficit, "simulation.stagnation");
            self.log_event(Event::Stagnation {
                hour,
                needy_regions: needy,
                unmet_deficit,
            });
            self.finish(Termination::Stagnated);
        } else {
            self.total_transfers += num_transfers;
            self.total_volume += volume_transferred;
            self.log_event(Event::HourCompleted {
                hour,
                transfers: num_transfers,
                volume: volume_transferred,
            });

            self.clock.advance_hour();

            if self.solved() {
                self.finish(Termination::Solved);
            } else if self.clock.is_exhausted() {
                self.finish(Termination::MaxHoursReached);
            }
        }

        Ok(HourResult {
            hour,
            needy_regions,
            donor_regions,
            num_transfers,
            volume_transferred,
            loops: outcome.loops,
            loop_cap_reached: outcome.loop_cap_reached,
            stagnated,
            unmet_deficit: self.network.unmet_deficit(),
            status: self.status,
        })
    }

    /// Run hours until the simulation terminates
    ///
    /// Returns immediately if the simulation has already stopped.
    pub fn run(&mut self) -> Result<RunSummary, SimulationError> {
        while self.is_running() {
            self.tick()?;
        }

        let termination = self.status.termination().ok_or_else(|| {
            SimulationError::StateValidationError("run ended while still running".to_string())
        })?;

        Ok(RunSummary {
            final_hour: self.current_hour(),
            termination,
            total_transfers: self.total_transfers,
            total_volume: self.total_volume,
            unmet_deficit: self.network.unmet_deficit(),
        })
    }

    fn finish(&mut self, termination: Termination) {
        self.status = SimulationStatus::Done(termination);

        let hour = self.current_hour();
        let unmet_deficit = self.network.unmet_deficit();
        tracing::info!(hour, %termination, unmet_deficit, "simulation.terminated");
        self.log_event(Event::SimulationTerminated {
            hour,
            termination,
            unmet_deficit,
        });
    }

    fn transfer_event(&self, hour: usize, record: &TransferRecord) -> Event {
        let region_name = |id| {
            self.network
                .region(id)
                .map(|r| r.name().to_string())
                .unwrap_or_default()
        };

        Event::Transfer {
            hour,
            canal: self
                .network
                .canal(record.canal)
                .map(|c| c.name().to_string())
                .unwrap_or_default(),
            donor: region_name(record.donor),
            recipient: region_name(record.recipient),
            source: self
                .network
                .source(record.source)
                .map(|s| s.name().to_string())
                .unwrap_or_default(),
            amount: record.amount,
            flow_rate: record.flow_rate(),
        }
    }

    // ========================================================================
    // Checkpointing
    // ========================================================================

    /// Serialize the mutable simulation state to JSON
    ///
    /// The snapshot carries a hash of the configuration so it can only be
    /// restored against the same network and allocation parameters.
    pub fn save_state(&self) -> Result<String, SimulationError> {
        use crate::orchestrator::checkpoint::{compute_config_hash, validate_snapshot, StateSnapshot};

        let snapshot = StateSnapshot {
            current_hour: self.clock.current_hour(),
            status: self.status,
            total_transfers: self.total_transfers,
            total_volume: self.total_volume,
            regions: self.network.regions().iter().map(Into::into).collect(),
            sources: self.network.sources().iter().map(Into::into).collect(),
            canals: self.network.canals().iter().map(Into::into).collect(),
            config_hash: compute_config_hash(&self.config)?,
        };

        validate_snapshot(
            &snapshot,
            &self.network,
            self.clock.max_hours(),
            self.config.allocation.epsilon,
        )?;

        serde_json::to_string(&snapshot).map_err(|e| {
            SimulationError::SerializationError(format!("Failed to serialize state: {}", e))
        })
    }

    /// Restore an orchestrator from a JSON snapshot
    ///
    /// # Errors
    ///
    /// * `ConfigMismatch` - snapshot was taken under a different config
    /// * `StateValidationError` - snapshot violates network invariants
    pub fn load_state(config: OrchestratorConfig, state_json: &str) -> Result<Self, SimulationError> {
        use crate::orchestrator::checkpoint::{compute_config_hash, validate_snapshot, StateSnapshot};

        let snapshot: StateSnapshot = serde_json::from_str(state_json).map_err(|e| {
            SimulationError::DeserializationError(format!("Failed to parse state JSON: {}", e))
        })?;

        let config_hash = compute_config_hash(&config)?;
        if snapshot.config_hash != config_hash {
            return Err(SimulationError::ConfigMismatch {
                expected: snapshot.config_hash,
                actual: config_hash,
            });
        }

        Self::validate_config(&config)?;
        let mut network = WaterNetwork::from_config(&config.network)?;
        validate_snapshot(
            &snapshot,
            &network,
            config.max_hours,
            config.allocation.epsilon,
        )?;

        for (region, saved) in snapshot.regions.iter().enumerate() {
            if let Some(r) = network.region_mut(RegionId(region)) {
                r.restore_water_level(saved.water_level);
            }
        }
        for (source, saved) in snapshot.sources.iter().enumerate() {
            if let Some(s) = network.source_mut(SourceId(source)) {
                s.restore_water_level(saved.water_level);
            }
        }
        for (canal, saved) in snapshot.canals.iter().enumerate() {
            if let Some(c) = network.canal_mut(CanalId(canal)) {
                c.toggle_open(saved.is_open);
                c.set_flow_rate(saved.flow_rate);
            }
        }

        let clock = HourClock::at_hour(snapshot.current_hour, config.max_hours);

        Ok(Self::from_parts(
            config,
            network,
            clock,
            snapshot.status,
            snapshot.total_transfers,
            snapshot.total_volume,
        ))
    }
}

// ============================================================================
// Tests
// ============================================================================
