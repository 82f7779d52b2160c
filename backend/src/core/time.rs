//! Time management for the simulation
//!
//! The simulation operates in discrete hours, bounded by a configured maximum.
//! Transfers are sized as hourly volumes; canal flow rates are expressed per
//! second, so conversions go through [`SECONDS_PER_HOUR`].

use serde::{Deserialize, Serialize};

/// Number of seconds in one simulated hour (volume/hour → m³/s conversion)
pub const SECONDS_PER_HOUR: f64 = 3600.0;

/// Tracks the current simulated hour against the configured maximum
///
/// # Example
/// ```
/// use acequia_core_rs::HourClock;
///
/// let mut clock = HourClock::new(24);
/// assert_eq!(clock.current_hour(), 0);
///
/// clock.advance_hour();
/// assert_eq!(clock.current_hour(), 1);
/// assert_eq!(clock.remaining_hours(), 23);
/// ```
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HourClock {
    /// Hours elapsed since simulation start
    current_hour: usize,
    /// Upper bound on simulated hours
    max_hours: usize,
}

impl HourClock {
    /// Create a new clock at hour 0
    ///
    /// # Arguments
    /// * `max_hours` - Number of hours the simulation may run
    ///
    /// # Example
    /// ```
    /// use acequia_core_rs::HourClock;
    ///
    /// let clock = HourClock::new(100);
    /// assert!(!clock.is_exhausted());
    /// ```
    pub fn new(max_hours: usize) -> Self {
        assert!(max_hours > 0, "max_hours must be positive");
        Self {
            current_hour: 0,
            max_hours,
        }
    }

    /// Restore a clock at a given hour (checkpoint restore)
    pub(crate) fn at_hour(current_hour: usize, max_hours: usize) -> Self {
        let mut clock = Self::new(max_hours);
        clock.current_hour = current_hour;
        clock
    }

    /// Advance time by one hour
    pub fn advance_hour(&mut self) {
        self.current_hour += 1;
    }

    /// Current hour (hours elapsed since start)
    pub fn current_hour(&self) -> usize {
        self.current_hour
    }

    /// Configured maximum number of hours
    pub fn max_hours(&self) -> usize {
        self.max_hours
    }

    /// Hours left before the maximum is reached
    ///
    /// # Example
    /// ```
    /// use acequia_core_rs::HourClock;
    ///
    /// let mut clock = HourClock::new(2);
    /// clock.advance_hour();
    /// clock.advance_hour();
    /// clock.advance_hour();
    /// assert_eq!(clock.remaining_hours(), 0);
    /// ```
    pub fn remaining_hours(&self) -> usize {
        self.max_hours.saturating_sub(self.current_hour)
    }

    /// True once the hour counter has reached the maximum
    pub fn is_exhausted(&self) -> bool {
        self.current_hour >= self.max_hours
    }
}
