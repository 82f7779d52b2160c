//! Canal Topology Index
//!
//! Provides O(1) lookup of the canals connecting an ordered
//! (donor, recipient) region pair.
//!
//! # Problem
//!
//! Without an index, finding the canals between two regions requires
//! scanning the entire canal list: O(Canals). The transfer engine asks this
//! question for every (need, donor) combination it considers, every hour.
//!
//! # Solution
//!
//! Maintain a `HashMap<(RegionId, RegionId), Vec<CanalId>>` built once from
//! the canal list before the hourly loop. Topology never changes during a
//! run, so the index is read-only afterwards.
//!
//! Build cost: O(Canals) - single scan
//! Lookup cost: O(1) - hash table lookup
//!
//! # Usage
//!
//! ```rust
//! use acequia_core_rs::allocation::CanalIndex;
//! use acequia_core_rs::{Canal, CanalId, RegionId};
//!
//! let canals = vec![
//!     Canal::new("MAIN".to_string(), RegionId(0), RegionId(1), None),
//!     Canal::new("SPUR".to_string(), RegionId(0), RegionId(1), None),
//! ];
//! let index = CanalIndex::build(&canals);
//!
//! assert_eq!(index.canals_between(RegionId(0), RegionId(1)), &[CanalId(0), CanalId(1)]);
//! assert!(index.canals_between(RegionId(1), RegionId(0)).is_empty());
//! ```

use crate::models::canal::{Canal, CanalId};
use crate::models::region::RegionId;
use std::collections::HashMap;

/// Pair-indexed view of the canal list
#[derive(Debug, Clone, Default)]
pub struct CanalIndex {
    /// Map: (donor, recipient) → canals in declaration order
    by_pair: HashMap<(RegionId, RegionId), Vec<CanalId>>,

    /// Total canals indexed
    canal_count: usize,
}

impl CanalIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build the index from the full canal list
    ///
    /// Parallel canals between the same ordered pair keep their relative
    /// order from `canals`.
    pub fn build(canals: &[Canal]) -> Self {
        let mut index = Self::new();
        index.rebuild(canals);
        index
    }

    /// Rebuild from scratch: O(Canals)
    pub fn rebuild(&mut self, canals: &[Canal]) {
        self.by_pair.clear();

        for (i, canal) in canals.iter().enumerate() {
            self.by_pair
                .entry((canal.source_region(), canal.destination_region()))
                .or_default()
                .push(CanalId(i));
        }

        self.canal_count = canals.len();
    }

    /// Canals from `donor` to `recipient`: O(1) lookup
    ///
    /// Returns an empty slice when the pair is not connected.
    pub fn canals_between(&self, donor: RegionId, recipient: RegionId) -> &[CanalId] {
        self.by_pair
            .get(&(donor, recipient))
            .map(|v| v.as_slice())
            .unwrap_or(&[])
    }

    /// True if at least one canal runs from `donor` to `recipient`
    pub fn is_connected(&self, donor: RegionId, recipient: RegionId) -> bool {
        !self.canals_between(donor, recipient).is_empty()
    }

    /// Number of connected ordered pairs
    pub fn num_pairs(&self) -> usize {
        self.by_pair.len()
    }

    /// Number of canals indexed
    pub fn num_canals(&self) -> usize {
        self.canal_count
    }

    pub fn is_empty(&self) -> bool {
        self.by_pair.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn canal(name: &str, from: usize, to: usize) -> Canal {
        Canal::new(name.to_string(), RegionId(from), RegionId(to), None)
    }

    #[test]
    fn test_new_index_is_empty() {
        let index = CanalIndex::new();

        assert!(index.is_empty());
        assert_eq!(index.num_pairs(), 0);
        assert_eq!(index.num_canals(), 0);
        assert!(index.canals_between(RegionId(0), RegionId(1)).is_empty());
    }

    #[test]
    fn test_direction_matters() {
        let index = CanalIndex::build(&[canal("AB", 0, 1)]);

        assert!(index.is_connected(RegionId(0), RegionId(1)));
        assert!(!index.is_connected(RegionId(1), RegionId(0)));
    }

    #[test]
    fn test_rebuild_replaces_contents() {
        let mut index = CanalIndex::build(&[canal("AB", 0, 1), canal("BC", 1, 2)]);
        assert_eq!(index.num_pairs(), 2);

        index.rebuild(&[canal("CA", 2, 0)]);

        assert_eq!(index.num_pairs(), 1);
        assert_eq!(index.num_canals(), 1);
        assert!(!index.is_connected(RegionId(0), RegionId(1)));
        assert_eq!(index.canals_between(RegionId(2), RegionId(0)), &[CanalId(0)]);
    }
}
