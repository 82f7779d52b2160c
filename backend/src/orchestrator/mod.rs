//! Orchestrator - hour-loop controller
//!
//! Runs the simulation hour by hour until it is solved, reaches the
//! configured maximum, or stagnates.
//!
//! See `engine.rs` for full implementation.

pub mod checkpoint;
pub mod engine;

// Re-export main types for convenience
pub use engine::{
    HourResult, Orchestrator, OrchestratorConfig, RunSummary, SimulationError, SimulationStatus,
    Termination,
};

// Re-export checkpoint types
pub use checkpoint::{CanalSnapshot, RegionSnapshot, SourceSnapshot, StateSnapshot};
