//! Acequia Water Allocation - Rust Engine
//!
//! Hour-by-hour redistribution of water across a network of regions
//! connected by directed canals fed by finite reservoirs.
//!
//! # Architecture
//!
//! - **core**: Hour clock and unit conversion
//! - **models**: Domain types (Region, WaterSource, Canal, WaterNetwork, Event)
//! - **allocation**: Topology index, demand/supply classifier, greedy transfer engine
//! - **orchestrator**: Hour-loop controller and checkpointing
//!
//! # Critical Invariants
//!
//! 1. Every transfer conserves donor + recipient volume and draws the same
//!    amount from the feeding source
//! 2. Region levels stay within `[0, capacity]`; sources never go negative
//! 3. Donors keep `need + safety_margin × capacity`
//! 4. Each hour performs a bounded number of dequeues; each run a bounded number of hours

// Module declarations
pub mod allocation;
pub mod core;
pub mod models;
pub mod orchestrator;

// Re-exports for convenience
pub use allocation::{AllocationConfig, AllocationOutcome, CanalIndex, DonorOrdering, Need};
pub use crate::core::time::{HourClock, SECONDS_PER_HOUR};
pub use models::{
    canal::{Canal, CanalId},
    event::{Event, EventLog},
    network::{NetworkConfig, NetworkError, WaterNetwork},
    region::{Region, RegionError, RegionId},
    water_source::{SourceId, WaterSource},
};
pub use orchestrator::{
    HourResult, Orchestrator, OrchestratorConfig, RunSummary, SimulationError, SimulationStatus,
    Termination,
};
