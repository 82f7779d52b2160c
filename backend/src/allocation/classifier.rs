//! Demand/Supply Classifier
//!
//! Each hour, partitions regions into:
//! - **Needy** regions: `deficit > ε`, queued by descending deficit
//! - **Donor** regions: not needy, and `safe_surplus > ε`
//!
//! Everything else (satisfied regions without exportable surplus) is left
//! out of the hour's matching. A region is never both needy and a donor:
//! a positive deficit means `level < need`, which forces a zero surplus.

use crate::allocation::config::{AllocationConfig, DonorOrdering};
use crate::models::region::{Region, RegionId};
use std::cmp::Ordering;
use std::collections::BinaryHeap;

/// Outstanding deficit of one region within a single hour
///
/// Ordered so that a [`BinaryHeap`] pops the largest deficit first.
/// Equal deficits pop the lower region index first.
#[derive(Debug, Clone, Copy)]
pub struct Need {
    pub region: RegionId,
    pub amount: f64,
}

impl Need {
    pub fn new(region: RegionId, amount: f64) -> Self {
        Self { region, amount }
    }
}

impl Ord for Need {
    fn cmp(&self, other: &Self) -> Ordering {
        self.amount
            .total_cmp(&other.amount)
            .then_with(|| other.region.cmp(&self.region))
    }
}

impl PartialOrd for Need {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for Need {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Need {}

/// Result of classifying the regions for one hour
#[derive(Debug, Clone, Default)]
pub struct Classification {
    /// Max-priority queue of deficits
    pub needs: BinaryHeap<Need>,

    /// Donor candidates in scan order
    pub donors: Vec<RegionId>,
}

impl Classification {
    pub fn num_needs(&self) -> usize {
        self.needs.len()
    }

    pub fn num_donors(&self) -> usize {
        self.donors.len()
    }

    /// Sum of all queued deficits
    pub fn total_deficit(&self) -> f64 {
        self.needs.iter().map(|n| n.amount).sum()
    }
}

/// Partition regions into needy and donor sets
///
/// # Example
///
/// ```rust
/// use acequia_core_rs::allocation::{classify, AllocationConfig};
/// use acequia_core_rs::{Region, RegionId};
///
/// let regions = vec![
///     Region::new("A".to_string(), 10.0, 2.0, 20.0), // surplus 6
///     Region::new("B".to_string(), 0.0, 8.0, 10.0),  // deficit 8
/// ];
///
/// let classification = classify(&regions, &AllocationConfig::default());
/// assert_eq!(classification.donors, vec![RegionId(0)]);
/// assert_eq!(classification.needs.peek().unwrap().region, RegionId(1));
/// ```
pub fn classify(regions: &[Region], config: &AllocationConfig) -> Classification {
    let mut needs = BinaryHeap::new();
    let mut donors: Vec<(RegionId, f64)> = Vec::new();

    for (i, region) in regions.iter().enumerate() {
        let id = RegionId(i);
        let deficit = region.deficit();

        if deficit > config.epsilon {
            needs.push(Need::new(id, deficit));
        } else {
            let surplus = region.safe_surplus(config.safety_margin);
            if surplus > config.epsilon {
                donors.push((id, surplus));
            }
        }
    }

    // Region order is already ascending index
    if config.donor_ordering == DonorOrdering::LargestSurplusFirst {
        donors.sort_by(|(a_id, a_surplus), (b_id, b_surplus)| {
            b_surplus.total_cmp(a_surplus).then_with(|| a_id.cmp(b_id))
        });
    }

    Classification {
        needs,
        donors: donors.into_iter().map(|(id, _)| id).collect(),
    }
}
