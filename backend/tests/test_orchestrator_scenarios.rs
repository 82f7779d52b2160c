//! End-to-end hour-loop scenarios
//!
//! Each test builds a small irrigation network from configuration, drives
//! the orchestrator hour by hour (or to completion) and checks levels,
//! termination and the event log.

use acequia_core_rs::models::network::{CanalConfig, RegionConfig, SourceConfig};
use acequia_core_rs::{
    AllocationConfig, DonorOrdering, Event, NetworkConfig, Orchestrator, OrchestratorConfig,
    SimulationError, SimulationStatus, Termination,
};

const TOLERANCE: f64 = 1e-9;

// ============================================================================
// Test Helpers
// ============================================================================

fn region(name: &str, level: f64, need: f64, capacity: f64) -> RegionConfig {
    RegionConfig {
        name: name.to_string(),
        water_level: level,
        water_need: need,
        water_capacity: capacity,
    }
}

fn source(name: &str, level: f64) -> SourceConfig {
    SourceConfig {
        name: name.to_string(),
        water_level: level,
    }
}

fn canal(name: &str, from: &str, to: &str, source: &str) -> CanalConfig {
    CanalConfig {
        name: name.to_string(),
        from: from.to_string(),
        to: to.to_string(),
        source: Some(source.to_string()),
    }
}

fn config(max_hours: usize, network: NetworkConfig) -> OrchestratorConfig {
    OrchestratorConfig {
        max_hours,
        network,
        allocation: AllocationConfig::default(),
    }
}

/// A (surplus 6) feeds B (deficit 8) from a large river
fn single_canal_network() -> NetworkConfig {
    NetworkConfig {
        regions: vec![region("A", 10.0, 2.0, 20.0), region("B", 0.0, 8.0, 10.0)],
        sources: vec![source("RIVER", 100.0)],
        canals: vec![canal("A_TO_B", "A", "B", "RIVER")],
    }
}

/// One large donor and three needy fields, one canal each
fn fan_out_network() -> NetworkConfig {
    NetworkConfig {
        regions: vec![
            region("D", 100.0, 0.0, 100.0),
            region("N1", 0.0, 5.0, 10.0),
            region("N2", 0.0, 4.0, 10.0),
            region("N3", 0.0, 3.0, 10.0),
        ],
        sources: vec![source("RIVER", 100.0)],
        canals: vec![
            canal("D_N1", "D", "N1", "RIVER"),
            canal("D_N2", "D", "N2", "RIVER"),
            canal("D_N3", "D", "N3", "RIVER"),
        ],
    }
}

fn level(orchestrator: &Orchestrator, name: &str) -> f64 {
    orchestrator
        .network()
        .region_by_name(name)
        .unwrap()
        .water_level()
}

fn assert_close(actual: f64, expected: f64) {
    assert!(
        (actual - expected).abs() < TOLERANCE,
        "expected {}, got {}",
        expected,
        actual
    );
}

// ============================================================================
// Single Canal
// ============================================================================

#[test]
fn test_single_canal_first_hour() {
    let mut orchestrator = Orchestrator::new(config(24, single_canal_network())).unwrap();

    let result = orchestrator.tick().unwrap();

    assert_eq!(result.hour, 0);
    assert_eq!(result.needy_regions, 1);
    assert_eq!(result.donor_regions, 1);
    assert_eq!(result.num_transfers, 1);
    assert_close(result.volume_transferred, 6.0);
    assert!(result.loop_cap_reached, "remaining deficit keeps requeueing");
    assert_eq!(result.loops, 1000);
    assert!(!result.stagnated);
    assert_close(result.unmet_deficit, 2.0);
    assert_eq!(result.status, SimulationStatus::Running);

    assert_close(level(&orchestrator, "A"), 4.0);
    assert_close(level(&orchestrator, "B"), 6.0);
    assert_close(orchestrator.network().sources()[0].water_level(), 94.0);

    let canal = &orchestrator.network().canals()[0];
    assert!(canal.is_open());
    assert_close(canal.flow_rate(), 6.0 / 3600.0);
    assert_eq!(orchestrator.current_hour(), 1);
}

#[test]
fn test_single_canal_stagnates_with_deficit() {
    let mut orchestrator = Orchestrator::new(config(24, single_canal_network())).unwrap();

    let summary = orchestrator.run().unwrap();

    assert_eq!(summary.termination, Termination::Stagnated);
    assert_eq!(summary.final_hour, 1);
    assert_eq!(summary.total_transfers, 1);
    assert_close(summary.total_volume, 6.0);
    assert_close(summary.unmet_deficit, 2.0);

    // Stagnating hour still resets the canals
    assert_eq!(orchestrator.network().open_canals().count(), 0);
}

#[test]
fn test_single_canal_hits_max_hours() {
    let mut orchestrator = Orchestrator::new(config(1, single_canal_network())).unwrap();

    let summary = orchestrator.run().unwrap();

    assert_eq!(summary.termination, Termination::MaxHoursReached);
    assert_eq!(summary.final_hour, 1);
    assert_close(summary.unmet_deficit, 2.0);
}

// ============================================================================
// No Canal
// ============================================================================

#[test]
fn test_no_canal_stagnates_immediately() {
    let network = NetworkConfig {
        regions: vec![region("A", 10.0, 2.0, 20.0), region("B", 0.0, 8.0, 10.0)],
        sources: vec![source("RIVER", 100.0)],
        canals: vec![],
    };
    let mut orchestrator = Orchestrator::new(config(24, network)).unwrap();

    let result = orchestrator.tick().unwrap();

    assert!(result.stagnated);
    assert_eq!(result.num_transfers, 0);
    assert_eq!(result.status, SimulationStatus::Done(Termination::Stagnated));
    assert_eq!(orchestrator.current_hour(), 0);
    assert_close(level(&orchestrator, "A"), 10.0);
    assert_close(level(&orchestrator, "B"), 0.0);
    assert_close(orchestrator.network().sources()[0].water_level(), 100.0);
}

#[test]
fn test_tick_after_termination_fails() {
    let network = NetworkConfig {
        regions: vec![region("A", 10.0, 2.0, 20.0), region("B", 0.0, 8.0, 10.0)],
        sources: vec![],
        canals: vec![],
    };
    let mut orchestrator = Orchestrator::new(config(24, network)).unwrap();
    orchestrator.run().unwrap();

    assert_eq!(
        orchestrator.tick().unwrap_err(),
        SimulationError::AlreadyTerminated(Termination::Stagnated)
    );
}

// ============================================================================
// Multi-Hour Progress
// ============================================================================

#[test]
fn test_loop_cap_spreads_work_over_hours() {
    let mut cfg = config(10, fan_out_network());
    cfg.allocation.max_loops = 1;
    let mut orchestrator = Orchestrator::new(cfg).unwrap();

    let first = orchestrator.tick().unwrap();
    assert!(first.loop_cap_reached);
    assert_close(level(&orchestrator, "N1"), 5.0);
    assert_close(level(&orchestrator, "N2"), 0.0);

    let summary = orchestrator.run().unwrap();

    assert_eq!(summary.termination, Termination::Solved);
    assert_eq!(summary.final_hour, 3);
    assert_eq!(summary.total_transfers, 3);
    assert_close(summary.total_volume, 12.0);
    assert_close(level(&orchestrator, "D"), 88.0);

    let log = orchestrator.event_log();
    assert_eq!(log.events_of_type("HourCompleted").len(), 3);
    assert_eq!(log.events_of_type("LoopCapReached").len(), 2);
}

#[test]
fn test_solved_in_one_hour() {
    let mut orchestrator = Orchestrator::new(config(24, fan_out_network())).unwrap();

    let summary = orchestrator.run().unwrap();

    assert_eq!(summary.termination, Termination::Solved);
    assert_eq!(summary.final_hour, 1);
    assert!(orchestrator.solved());
    assert_close(summary.unmet_deficit, 0.0);
}

#[test]
fn test_already_solved_network_starts_done() {
    let network = NetworkConfig {
        regions: vec![region("A", 5.0, 5.0, 10.0)],
        sources: vec![],
        canals: vec![],
    };
    let mut orchestrator = Orchestrator::new(config(24, network)).unwrap();

    assert_eq!(orchestrator.status(), SimulationStatus::Done(Termination::Solved));

    let summary = orchestrator.run().unwrap();
    assert_eq!(summary.final_hour, 0);
    assert_eq!(summary.total_transfers, 0);
}

// ============================================================================
// Donor Ordering
// ============================================================================

fn two_donor_network() -> NetworkConfig {
    NetworkConfig {
        regions: vec![
            region("SMALL", 10.0, 0.0, 10.0),
            region("LARGE", 20.0, 0.0, 20.0),
            region("FIELD", 0.0, 5.0, 10.0),
        ],
        sources: vec![source("RIVER", 100.0)],
        canals: vec![
            canal("SMALL_FIELD", "SMALL", "FIELD", "RIVER"),
            canal("LARGE_FIELD", "LARGE", "FIELD", "RIVER"),
        ],
    }
}

#[test]
fn test_donor_ordering_changes_which_donor_drains() {
    let mut region_order = Orchestrator::new(config(24, two_donor_network())).unwrap();
    region_order.run().unwrap();

    let mut cfg = config(24, two_donor_network());
    cfg.allocation.donor_ordering = DonorOrdering::LargestSurplusFirst;
    let mut largest_first = Orchestrator::new(cfg).unwrap();
    largest_first.run().unwrap();

    assert_close(level(&region_order, "SMALL"), 5.0);
    assert_close(level(&region_order, "LARGE"), 20.0);
    assert_close(level(&largest_first, "SMALL"), 10.0);
    assert_close(level(&largest_first, "LARGE"), 15.0);
}

// ============================================================================
// Event Log
// ============================================================================

#[test]
fn test_transfer_events_name_entities() {
    let mut orchestrator = Orchestrator::new(config(24, single_canal_network())).unwrap();
    orchestrator.run().unwrap();

    let log = orchestrator.event_log();
    let transfers = log.events_for_canal("A_TO_B");
    assert_eq!(transfers.len(), 1);

    match transfers[0] {
        Event::Transfer {
            hour,
            donor,
            recipient,
            source,
            amount,
            ..
        } => {
            assert_eq!(*hour, 0);
            assert_eq!(donor, "A");
            assert_eq!(recipient, "B");
            assert_eq!(source, "RIVER");
            assert_close(*amount, 6.0);
        }
        other => panic!("unexpected event {:?}", other),
    }

    assert_eq!(log.events_for_region("B").len(), 1);
}

#[test]
fn test_stagnation_and_termination_are_logged() {
    let mut orchestrator = Orchestrator::new(config(24, single_canal_network())).unwrap();
    orchestrator.run().unwrap();

    let hour_one: Vec<&str> = orchestrator
        .event_log()
        .events_at_hour(1)
        .iter()
        .map(|e| e.event_type())
        .collect();

    assert_eq!(
        hour_one,
        vec!["CanalsReset", "Classified", "Stagnation", "SimulationTerminated"]
    );
}

// ============================================================================
// JSON Configuration
// ============================================================================

#[test]
fn test_run_from_json_config() {
    let json = r#"{
        "max_hours": 12,
        "network": {
            "regions": [
                {"name": "UPPER", "water_level": 40.0, "water_need": 10.0, "water_capacity": 50.0},
                {"name": "LOWER", "water_level": 2.0, "water_need": 12.0, "water_capacity": 20.0}
            ],
            "sources": [{"name": "SPRING", "water_level": 30.0}],
            "canals": [{"name": "ACEQUIA_MADRE", "from": "UPPER", "to": "LOWER", "source": "SPRING"}]
        },
        "allocation": {"safety_margin": 0.2, "donor_ordering": "largest_surplus_first"}
    }"#;

    let cfg = OrchestratorConfig::from_json(json).unwrap();
    assert_eq!(cfg.allocation.donor_ordering, DonorOrdering::LargestSurplusFirst);
    assert_eq!(cfg.allocation.max_loops, 1000);

    let mut orchestrator = Orchestrator::new(cfg).unwrap();
    let summary = orchestrator.run().unwrap();

    // Surplus 40 - 10 - 0.2 × 50 = 20 covers the deficit of 10
    assert_eq!(summary.termination, Termination::Solved);
    assert_close(level(&orchestrator, "LOWER"), 12.0);
    assert_close(level(&orchestrator, "UPPER"), 30.0);
    assert_close(orchestrator.network().sources()[0].water_level(), 20.0);
}

#[test]
fn test_unknown_canal_endpoint_is_rejected() {
    let mut network = single_canal_network();
    network.canals[0].to = "NOWHERE".to_string();

    assert!(matches!(
        Orchestrator::new(config(24, network)),
        Err(SimulationError::Network(_))
    ));
}
