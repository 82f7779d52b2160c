//! Greedy Transfer Engine
//!
//! Serves the largest outstanding deficit first from the hour's donor
//! candidates, through whichever canals connect donor and recipient.
//!
//! # Algorithm
//!
//! ```text
//! while needs and donors remain and loops < max_loops:
//!     pop the largest need
//!     for each donor (classifier order):
//!         for each canal donor → needy region:
//!             amount = min(deficit, donor safe surplus, source level, recipient headroom)
//!             if amount > ε: open canal, move water
//!             stop once the deficit is ≤ ε
//!     requeue the need if its deficit is still > ε
//! ```
//!
//! # Critical Invariants
//!
//! - **Conservation**: donor level + recipient level is unchanged by every
//!   transfer; the feeding source drops by the transferred amount
//! - **Capacity**: no recipient exceeds its capacity, no level or source
//!   goes negative
//! - **Margin**: no donor drops below `need + safety_margin × capacity`
//! - **Granularity**: every executed transfer is larger than ε
//!
//! Degenerate cases (no canal, canal without source, exhausted source, no
//! headroom, exhausted donor) are skips, never errors. Hitting the loop
//! bound is reported in [`AllocationOutcome::loop_cap_reached`].

use crate::allocation::classifier::{Classification, Need};
use crate::allocation::config::AllocationConfig;
use crate::allocation::topology::CanalIndex;
use crate::core::time::SECONDS_PER_HOUR;
use crate::models::canal::CanalId;
use crate::models::network::WaterNetwork;
use crate::models::region::RegionId;
use crate::models::water_source::SourceId;

/// One executed transfer
#[derive(Debug, Clone, PartialEq)]
pub struct TransferRecord {
    pub canal: CanalId,
    pub donor: RegionId,
    pub recipient: RegionId,
    pub source: SourceId,

    /// Hourly volume moved
    pub amount: f64,
}

impl TransferRecord {
    /// Flow rate (m³/s) contributed by this transfer
    pub fn flow_rate(&self) -> f64 {
        self.amount / SECONDS_PER_HOUR
    }
}

/// Result of one hour's allocation pass
#[derive(Debug, Clone, Default)]
pub struct AllocationOutcome {
    /// Transfers in execution order
    pub transfers: Vec<TransferRecord>,

    /// Need dequeues performed
    pub loops: usize,

    /// True if matching stopped at the dequeue bound with needs outstanding
    pub loop_cap_reached: bool,

    /// Needs still queued when the pass ended, largest first
    pub unserved: Vec<Need>,
}

impl AllocationOutcome {
    pub fn did_transfer(&self) -> bool {
        !self.transfers.is_empty()
    }

    pub fn num_transfers(&self) -> usize {
        self.transfers.len()
    }

    /// Total volume moved this hour
    pub fn total_volume(&self) -> f64 {
        self.transfers.iter().map(|t| t.amount).sum()
    }

    /// Sum of deficits left in the queue
    pub fn unserved_deficit(&self) -> f64 {
        self.unserved.iter().map(|n| n.amount).sum()
    }
}

/// Size of a single canal transfer
///
/// `min(remaining deficit, donor safe surplus, source level, recipient headroom)`
///
/// # Example
///
/// ```rust
/// use acequia_core_rs::allocation::transferable_amount;
///
/// // Deficit 8, surplus 6, source 100, headroom 10 → limited by surplus
/// assert_eq!(transferable_amount(8.0, 6.0, 100.0, 10.0), 6.0);
/// ```
pub fn transferable_amount(
    deficit: f64,
    donor_surplus: f64,
    source_level: f64,
    headroom: f64,
) -> f64 {
    deficit.min(donor_surplus).min(source_level).min(headroom)
}

/// Run the greedy matching loop for one hour
///
/// Mutates region levels, source levels and canal flow state in place.
///
/// # Example
///
/// ```rust
/// use acequia_core_rs::allocation::{allocate, classify, AllocationConfig, CanalIndex};
/// use acequia_core_rs::{Canal, Region, RegionId, SourceId, WaterNetwork, WaterSource};
///
/// let mut network = WaterNetwork::new(
///     vec![
///         Region::new("A".to_string(), 10.0, 2.0, 20.0),
///         Region::new("B".to_string(), 0.0, 8.0, 10.0),
///     ],
///     vec![WaterSource::new("RIVER".to_string(), 100.0)],
///     vec![Canal::new("A_TO_B".to_string(), RegionId(0), RegionId(1), Some(SourceId(0)))],
/// )
/// .unwrap();
///
/// let config = AllocationConfig::default();
/// let index = CanalIndex::build(network.canals());
/// let classification = classify(network.regions(), &config);
///
/// let outcome = allocate(&mut network, &index, classification, &config);
/// assert_eq!(outcome.num_transfers(), 1);
/// assert!((network.regions()[1].water_level() - 6.0).abs() < 1e-9);
/// ```
pub fn allocate(
    network: &mut WaterNetwork,
    index: &CanalIndex,
    classification: Classification,
    config: &AllocationConfig,
) -> AllocationOutcome {
    let Classification { mut needs, donors } = classification;

    let mut transfers = Vec::new();
    let mut loops = 0;
    let mut loop_cap_reached = false;

    while !needs.is_empty() && !donors.is_empty() {
        if loops >= config.max_loops {
            loop_cap_reached = true;
            break;
        }
        loops += 1;

        let Some(mut need) = needs.pop() else {
            break;
        };

        serve_need(network, index, &donors, &mut need, config, &mut transfers);

        if need.amount > config.epsilon {
            needs.push(need);
        }
    }

    if loop_cap_reached {
        tracing::warn!(
            loops,
            outstanding_needs = needs.len(),
            "allocation.loop_cap_reached"
        );
    }

    let mut unserved = needs.into_sorted_vec();
    unserved.reverse();

    AllocationOutcome {
        transfers,
        loops,
        loop_cap_reached,
        unserved,
    }
}

/// Draw water for one need from every donor in turn
fn serve_need(
    network: &mut WaterNetwork,
    index: &CanalIndex,
    donors: &[RegionId],
    need: &mut Need,
    config: &AllocationConfig,
    transfers: &mut Vec<TransferRecord>,
) {
    for &donor in donors {
        let exhausted = network
            .region(donor)
            .map_or(true, |r| r.safe_surplus(config.safety_margin) <= config.epsilon);
        if exhausted {
            continue;
        }

        for &canal in index.canals_between(donor, need.region) {
            let Some(plan) = plan_transfer(network, canal, donor, need, config) else {
                continue;
            };

            if let Some(record) = execute_transfer(network, plan) {
                need.amount -= record.amount;
                transfers.push(record);
            }

            if need.amount <= config.epsilon {
                return;
            }
        }
    }
}

/// Size a transfer through `canal`, or None if it should be skipped
fn plan_transfer(
    network: &WaterNetwork,
    canal: CanalId,
    donor: RegionId,
    need: &Need,
    config: &AllocationConfig,
) -> Option<TransferRecord> {
    let source = network.canal(canal)?.water_source()?;

    let reservoir = network.source(source)?;
    if reservoir.is_depleted(config.epsilon) {
        return None;
    }
    let source_level = reservoir.water_level();

    // Re-read per canal: an earlier parallel canal may have drawn on the donor
    let donor_surplus = network.region(donor)?.safe_surplus(config.safety_margin);
    let headroom = network.region(need.region)?.headroom();

    let amount = transferable_amount(need.amount, donor_surplus, source_level, headroom);
    if amount <= config.epsilon {
        return None;
    }

    Some(TransferRecord {
        canal,
        donor,
        recipient: need.region,
        source,
        amount,
    })
}

/// Apply a planned transfer to the network
///
/// Nothing is mutated unless every id resolves.
fn execute_transfer(network: &mut WaterNetwork, plan: TransferRecord) -> Option<TransferRecord> {
    if !network.apply_transfer(plan.canal, plan.source, plan.donor, plan.recipient, plan.amount) {
        return None;
    }

    tracing::debug!(
        canal = %plan.canal,
        donor = %plan.donor,
        recipient = %plan.recipient,
        amount = plan.amount,
        "allocation.transfer"
    );

    Some(plan)
}
