//! Region model
//!
//! A region is a demand/supply node in the water network. Each region has:
//! - Current stock (`water_level`)
//! - Target stock (`water_need`)
//! - Maximum stock (`water_capacity`)
//!
//! # Critical Invariants
//!
//! 1. `0 <= water_level <= water_capacity` at all times
//! 2. Levels only change through transfers (donor loses, recipient gains)
//!
//! The transfer engine upholds invariant 1 by construction when it sizes a
//! transfer; [`Region::update_water_level`] itself does not clamp.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Arena index of a region inside a [`WaterNetwork`](crate::WaterNetwork)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct RegionId(pub usize);

impl RegionId {
    /// Position of the region in the network's region list
    pub fn index(self) -> usize {
        self.0
    }
}

impl std::fmt::Display for RegionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "region#{}", self.0)
    }
}

/// Errors raised when a region's stored values violate its invariants
#[derive(Debug, Error, PartialEq)]
pub enum RegionError {
    #[error("Region {region} has non-finite {field}: {value}")]
    NonFinite {
        region: String,
        field: &'static str,
        value: f64,
    },

    #[error("Region {region} has negative capacity {capacity}")]
    NegativeCapacity { region: String, capacity: f64 },

    #[error("Region {region} has negative need {need}")]
    NegativeNeed { region: String, need: f64 },

    #[error("Region {region} level {level} outside [0, {capacity}]")]
    LevelOutOfBounds {
        region: String,
        level: f64,
        capacity: f64,
    },
}

/// A consumer/producer node in the water network
///
/// # Example
/// ```
/// use acequia_core_rs::Region;
///
/// let mut region = Region::new("NORTH".to_string(), 10.0, 2.0, 20.0);
/// assert_eq!(region.deficit(), 0.0);
/// assert_eq!(region.safe_surplus(0.10), 6.0); // 10 - 2 - 0.1 × 20
///
/// region.update_water_level(-6.0);
/// assert_eq!(region.water_level(), 4.0);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Region {
    /// Unique region name (e.g., "NORTH_FIELDS")
    name: String,

    /// Current stock
    water_level: f64,

    /// Target stock; anything below this is a deficit
    water_need: f64,

    /// Maximum stock the region can hold
    water_capacity: f64,
}

impl Region {
    /// Create a new region
    ///
    /// No validation happens here; [`Region::validate`] is run when the
    /// region is placed in a network.
    pub fn new(name: String, water_level: f64, water_need: f64, water_capacity: f64) -> Self {
        Self {
            name,
            water_level,
            water_need,
            water_capacity,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn water_level(&self) -> f64 {
        self.water_level
    }

    pub fn water_need(&self) -> f64 {
        self.water_need
    }

    pub fn water_capacity(&self) -> f64 {
        self.water_capacity
    }

    /// Unmet demand: `max(0, need - level)`
    ///
    /// # Example
    /// ```
    /// use acequia_core_rs::Region;
    ///
    /// let region = Region::new("SOUTH".to_string(), 0.0, 8.0, 10.0);
    /// assert_eq!(region.deficit(), 8.0);
    /// ```
    pub fn deficit(&self) -> f64 {
        (self.water_need - self.water_level).max(0.0)
    }

    /// Surplus the region can give away while keeping a safety buffer
    ///
    /// `max(0, (level - need) - margin_fraction × capacity)`
    ///
    /// # Arguments
    /// * `margin_fraction` - Fraction of capacity held back beyond the region's own need
    pub fn safe_surplus(&self, margin_fraction: f64) -> f64 {
        let extra = self.water_level - self.water_need;
        let buffer = margin_fraction * self.water_capacity;
        (extra - buffer).max(0.0)
    }

    /// Free space before the region reaches capacity
    pub fn headroom(&self) -> f64 {
        (self.water_capacity - self.water_level).max(0.0)
    }

    /// Apply a signed adjustment to the water level
    ///
    /// Callers must keep the result within `[0, capacity]`.
    pub fn update_water_level(&mut self, delta: f64) {
        self.water_level += delta;
    }

    /// Overwrite the level (checkpoint restore)
    pub(crate) fn restore_water_level(&mut self, level: f64) {
        self.water_level = level;
    }

    /// Check the region's stored values against its invariants
    ///
    /// `tolerance` absorbs floating-point drift at the bounds.
    ///
    /// # Example
    /// ```
    /// use acequia_core_rs::{Region, RegionError};
    ///
    /// let overfull = Region::new("EAST".to_string(), 12.0, 5.0, 10.0);
    /// assert!(matches!(
    ///     overfull.validate(0.0),
    ///     Err(RegionError::LevelOutOfBounds { .. })
    /// ));
    /// ```
    pub fn validate(&self, tolerance: f64) -> Result<(), RegionError> {
        for (field, value) in [
            ("water_level", self.water_level),
            ("water_need", self.water_need),
            ("water_capacity", self.water_capacity),
        ] {
            if !value.is_finite() {
                return Err(RegionError::NonFinite {
                    region: self.name.clone(),
                    field,
                    value,
                });
            }
        }

        if self.water_capacity < 0.0 {
            return Err(RegionError::NegativeCapacity {
                region: self.name.clone(),
                capacity: self.water_capacity,
            });
        }

        if self.water_need < 0.0 {
            return Err(RegionError::NegativeNeed {
                region: self.name.clone(),
                need: self.water_need,
            });
        }

        if self.water_level < -tolerance || self.water_level > self.water_capacity + tolerance {
            return Err(RegionError::LevelOutOfBounds {
                region: self.name.clone(),
                level: self.water_level,
                capacity: self.water_capacity,
            });
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deficit_floors_at_zero() {
        let region = Region::new("A".to_string(), 15.0, 10.0, 20.0);
        assert_eq!(region.deficit(), 0.0);
    }

    #[test]
    fn test_safe_surplus_respects_margin() {
        // extra = 4, buffer = 0.1 × 50 = 5 → nothing to give
        let region = Region::new("A".to_string(), 14.0, 10.0, 50.0);
        assert_eq!(region.safe_surplus(0.10), 0.0);
        assert_eq!(region.safe_surplus(0.0), 4.0);
    }

    #[test]
    fn test_headroom() {
        let region = Region::new("A".to_string(), 7.5, 0.0, 10.0);
        assert_eq!(region.headroom(), 2.5);
    }

    #[test]
    fn test_validate_rejects_nan() {
        let region = Region::new("A".to_string(), f64::NAN, 0.0, 10.0);
        assert!(matches!(
            region.validate(0.0),
            Err(RegionError::NonFinite { field: "water_level", .. })
        ));
    }

    #[test]
    fn test_validate_tolerates_drift() {
        let region = Region::new("A".to_string(), 10.0 + 1e-12, 0.0, 10.0);
        assert!(region.validate(1e-9).is_ok());
        assert!(region.validate(0.0).is_err());
    }
}
