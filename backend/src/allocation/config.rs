//! Allocation parameters
//!
//! Tunables of the hourly greedy allocation pass. Defaults match the
//! reference behaviour: 1e-3 tolerance, 10% safety margin, 1000 dequeues
//! per hour, donors scanned in region order.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors raised by [`AllocationConfig::validate`]
#[derive(Debug, Error, PartialEq)]
pub enum ConfigError {
    #[error("epsilon must be finite and > 0, got {0}")]
    InvalidEpsilon(f64),

    #[error("safety_margin must be within [0, 1], got {0}")]
    InvalidSafetyMargin(f64),

    #[error("max_loops must be > 0")]
    ZeroMaxLoops,
}

/// Order in which donor candidates are scanned for each need
///
/// The scan order decides which donor is drained first when several can
/// serve the same region, so it is fixed explicitly rather than left to
/// whatever order the regions happen to be stored in.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DonorOrdering {
    /// Ascending region index (region iteration order)
    #[default]
    RegionOrder,

    /// Descending safe surplus at classification time, ties by region index
    LargestSurplusFirst,
}

/// Configuration for the hourly allocation pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AllocationConfig {
    /// Amounts at or below this are treated as zero
    pub epsilon: f64,

    /// Fraction of capacity a donor keeps beyond its own need
    pub safety_margin: f64,

    /// Maximum need dequeues per hour
    pub max_loops: usize,

    /// Donor scan order
    pub donor_ordering: DonorOrdering,
}

impl Default for AllocationConfig {
    fn default() -> Self {
        Self {
            epsilon: 1e-3,
            safety_margin: 0.10,
            max_loops: 1000,
            donor_ordering: DonorOrdering::RegionOrder,
        }
    }
}

impl AllocationConfig {
    /// Check parameters are usable
    ///
    /// # Example
    ///
    /// ```rust
    /// use acequia_core_rs::allocation::{AllocationConfig, ConfigError};
    ///
    /// let config = AllocationConfig {
    ///     safety_margin: 1.5,
    ///     ..AllocationConfig::default()
    /// };
    /// assert_eq!(config.validate(), Err(ConfigError::InvalidSafetyMargin(1.5)));
    /// ```
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.epsilon.is_finite() || self.epsilon <= 0.0 {
            return Err(ConfigError::InvalidEpsilon(self.epsilon));
        }

        if !self.safety_margin.is_finite() || !(0.0..=1.0).contains(&self.safety_margin) {
            return Err(ConfigError::InvalidSafetyMargin(self.safety_margin));
        }

        if self.max_loops == 0 {
            return Err(ConfigError::ZeroMaxLoops);
        }

        Ok(())
    }
}
