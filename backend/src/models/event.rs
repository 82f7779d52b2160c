//! Event logging for simulation replay and auditing.
//!
//! Every significant state change during an hour is captured as an [`Event`]:
//! - **Bookkeeping**: canal reset, demand/supply classification
//! - **Transfer**: water moved through a canal
//! - **Cutoffs**: loop-cap exhaustion, stagnation
//! - **Lifecycle**: hour completion, simulation termination
//!
//! Cutoffs are silent in the allocation algorithm itself; the log is where
//! they become observable.
//!
//! # Example
//!
//! ```rust
//! use acequia_core_rs::models::Event;
//!
//! let event = Event::Transfer {
//!     hour: 3,
//!     canal: "A_TO_B".to_string(),
//!     donor: "A".to_string(),
//!     recipient: "B".to_string(),
//!     source: "RIVER".to_string(),
//!     amount: 6.0,
//!     flow_rate: 6.0 / 3600.0,
//! };
//!
//! assert_eq!(event.hour(), 3);
//! assert_eq!(event.event_type(), "Transfer");
//! ```

use crate::orchestrator::Termination;

/// Simulation event capturing a state change.
///
/// All events carry the hour in which they occurred.
/// Events are logged in the order they occur within an hour.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// All canals closed and zeroed at the start of the hour
    CanalsReset { hour: usize, canal_count: usize },

    /// Regions partitioned into needy and donor sets
    Classified {
        hour: usize,
        needy_regions: usize,
        donor_regions: usize,
        total_deficit: f64,
    },

    /// Water moved from donor to recipient through a canal
    Transfer {
        hour: usize,
        canal: String,
        donor: String,
        recipient: String,
        source: String,
        amount: f64,
        flow_rate: f64,
    },

    /// Matching stopped because the per-hour dequeue bound was hit
    LoopCapReached {
        hour: usize,
        loops: usize,
        outstanding_needs: usize,
    },

    /// Hour finished with at least one transfer
    HourCompleted {
        hour: usize,
        transfers: usize,
        volume: f64,
    },

    /// No transfer was possible this hour; the simulation halts
    Stagnation {
        hour: usize,
        needy_regions: usize,
        unmet_deficit: f64,
    },

    /// Simulation reached a terminal state
    SimulationTerminated {
        hour: usize,
        termination: Termination,
        unmet_deficit: f64,
    },
}

impl Event {
    /// Hour in which the event occurred
    pub fn hour(&self) -> usize {
        match self {
            Event::CanalsReset { hour, .. } => *hour,
            Event::Classified { hour, .. } => *hour,
            Event::Transfer { hour, .. } => *hour,
            Event::LoopCapReached { hour, .. } => *hour,
            Event::HourCompleted { hour, .. } => *hour,
            Event::Stagnation { hour, .. } => *hour,
            Event::SimulationTerminated { hour, .. } => *hour,
        }
    }

    /// Short name of the event type
    pub fn event_type(&self) -> &'static str {
        match self {
            Event::CanalsReset { .. } => "CanalsReset",
            Event::Classified { .. } => "Classified",
            Event::Transfer { .. } => "Transfer",
            Event::LoopCapReached { .. } => "LoopCapReached",
            Event::HourCompleted { .. } => "HourCompleted",
            Event::Stagnation { .. } => "Stagnation",
            Event::SimulationTerminated { .. } => "SimulationTerminated",
        }
    }

    /// True if the event involves the named region (as donor or recipient)
    pub fn involves_region(&self, region: &str) -> bool {
        match self {
            Event::Transfer {
                donor, recipient, ..
            } => donor == region || recipient == region,
            _ => false,
        }
    }

    /// Canal name if the event relates to a specific canal
    pub fn canal(&self) -> Option<&str> {
        match self {
            Event::Transfer { canal, .. } => Some(canal),
            _ => None,
        }
    }
}

/// Event log for storing and querying simulation events.
///
/// This is a simple wrapper around Vec<Event> with convenience methods.
#[derive(Debug, Clone, Default)]
pub struct EventLog {
    events: Vec<Event>,
}

impl EventLog {
    pub fn new() -> Self {
        Self { events: Vec::new() }
    }

    /// Add an event to the log
    pub fn log(&mut self, event: Event) {
        self.events.push(event);
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }

    /// Get events for a specific hour
    pub fn events_at_hour(&self, hour: usize) -> Vec<&Event> {
        self.events.iter().filter(|e| e.hour() == hour).collect()
    }

    /// Get events of a specific type
    pub fn events_of_type(&self, event_type: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.event_type() == event_type)
            .collect()
    }

    /// Get events in which a region gave or received water
    pub fn events_for_region(&self, region: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.involves_region(region))
            .collect()
    }

    /// Get events for a specific canal
    pub fn events_for_canal(&self, canal: &str) -> Vec<&Event> {
        self.events
            .iter()
            .filter(|e| e.canal() == Some(canal))
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}
