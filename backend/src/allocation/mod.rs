//! Hourly Allocation Core
//!
//! The per-hour greedy redistribution pass:
//! - **topology**: (donor, recipient) → canals lookup, built once per run
//! - **classifier**: partitions regions into a deficit queue and donor list
//! - **transfer**: greedy matching loop that moves water through canals
//!
//! # Example
//!
//! ```rust
//! use acequia_core_rs::allocation::{allocate, classify, AllocationConfig, CanalIndex};
//! use acequia_core_rs::{Canal, Region, RegionId, SourceId, WaterNetwork, WaterSource};
//!
//! let mut network = WaterNetwork::new(
//!     vec![
//!         Region::new("A".to_string(), 10.0, 2.0, 20.0),
//!         Region::new("B".to_string(), 0.0, 8.0, 10.0),
//!     ],
//!     vec![WaterSource::new("RIVER".to_string(), 100.0)],
//!     vec![Canal::new("A_TO_B".to_string(), RegionId(0), RegionId(1), Some(SourceId(0)))],
//! )
//! .unwrap();
//!
//! let config = AllocationConfig::default();
//! let index = CanalIndex::build(network.canals());
//!
//! network.reset_canals();
//! let classification = classify(network.regions(), &config);
//! let outcome = allocate(&mut network, &index, classification, &config);
//!
//! assert!(outcome.did_transfer());
//! ```

pub mod classifier;
pub mod config;
pub mod topology;
pub mod transfer;

// Re-export public API
pub use classifier::{classify, Classification, Need};
pub use config::{AllocationConfig, ConfigError, DonorOrdering};
pub use topology::CanalIndex;
pub use transfer::{allocate, transferable_amount, AllocationOutcome, TransferRecord};
