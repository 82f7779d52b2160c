//! Domain models for the water network

pub mod canal;
pub mod event;
pub mod network;
pub mod region;
pub mod water_source;

// Re-exports
pub use canal::{Canal, CanalId};
pub use event::{Event, EventLog};
pub use network::{NetworkConfig, NetworkError, WaterNetwork};
pub use region::{Region, RegionError, RegionId};
pub use water_source::{SourceId, WaterSource};
