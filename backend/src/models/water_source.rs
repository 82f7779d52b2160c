//! Water source (reservoir) model
//!
//! A finite reservoir feeding a canal. Every transfer through a canal draws
//! the transferred volume from the canal's source.

use serde::{Deserialize, Serialize};

/// Arena index of a water source inside a [`WaterNetwork`](crate::WaterNetwork)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SourceId(pub usize);

impl SourceId {
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for SourceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "source#{}", self.0)
    }
}

/// Finite reservoir
///
/// # Example
/// ```
/// use acequia_core_rs::WaterSource;
///
/// let mut source = WaterSource::new("RIO_GRANDE".to_string(), 100.0);
/// source.update_water_level(-6.0);
/// assert_eq!(source.water_level(), 94.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WaterSource {
    name: String,

    /// Remaining extractable volume (never negative)
    water_level: f64,
}

impl WaterSource {
    pub fn new(name: String, water_level: f64) -> Self {
        Self { name, water_level }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn water_level(&self) -> f64 {
        self.water_level
    }

    /// Apply a signed adjustment; callers keep the level non-negative
    pub fn update_water_level(&mut self, delta: f64) {
        self.water_level += delta;
    }

    pub(crate) fn restore_water_level(&mut self, level: f64) {
        self.water_level = level;
    }

    /// True when the remaining volume is negligible
    pub fn is_depleted(&self, epsilon: f64) -> bool {
        self.water_level <= epsilon
    }
}
