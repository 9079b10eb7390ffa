//! The event log: every state change a step makes.
//!
//! RULE: Subsystems report what they changed ONLY through events.
//! The metrics aggregator builds every statistic from these events,
//! never by inspecting subsystem internals.

use crate::{
    aircraft::{AircraftLog, Direction, EmergencyStatus, Operation},
    config::RunwayStatus,
    types::{Minute, RunId},
};
use serde::{Deserialize, Serialize};

/// Every event emitted during simulation.
/// Variants may be appended, never removed or reordered.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SimEvent {
    // ── Engine events ──────────────────────────────
    StepStarted {
        minute: Minute,
    },
    StepCompleted {
        minute:  Minute,
        holding: usize,
        takeoff: usize,
    },
    RunInitialized {
        run_id: RunId,
        seed:   u64,
    },

    // ── Traffic events ─────────────────────────────
    AircraftEntered {
        minute:    Minute,
        callsign:  String,
        direction: Direction,
        emergency: EmergencyStatus,
        fuel:      Option<f64>,
    },

    // ── Runway events ──────────────────────────────
    RunwayClosed {
        minute: Minute,
        runway: String,
        reason: RunwayStatus,
    },
    RunwayReopened {
        minute: Minute,
        runway: String,
    },
    RunwayAssigned {
        minute:     Minute,
        callsign:   String,
        runway:     String,
        operation:  Operation,
        release_at: Minute,
    },

    // ── Lifecycle events ───────────────────────────
    EmergencyDeclared {
        minute:    Minute,
        callsign:  String,
        emergency: EmergencyStatus,
    },
    AircraftResolved {
        minute: Minute,
        log:    AircraftLog,
    },
}

impl SimEvent {
    /// Stable name for the event_type column in event_log.
    pub fn type_name(&self) -> &'static str {
        match self {
            SimEvent::StepStarted { .. }       => "step_started",
            SimEvent::StepCompleted { .. }     => "step_completed",
            SimEvent::RunInitialized { .. }    => "run_initialized",
            SimEvent::AircraftEntered { .. }   => "aircraft_entered",
            SimEvent::RunwayClosed { .. }      => "runway_closed",
            SimEvent::RunwayReopened { .. }    => "runway_reopened",
            SimEvent::RunwayAssigned { .. }    => "runway_assigned",
            SimEvent::EmergencyDeclared { .. } => "emergency_declared",
            SimEvent::AircraftResolved { .. }  => "aircraft_resolved",
        }
    }
}

/// The event log entry as persisted to SQLite.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventLogEntry {
    pub id:         Option<i64>,
    pub run_id:     RunId,
    pub tick:       Minute,
    pub subsystem:  String,
    pub event_type: String,
    pub payload:    String, // JSON-serialized SimEvent
}
