//! Snapshots: the per-step view a caller sees, and the periodic
//! state record persisted to the store.
//!
//! Every step produces a `StreamMessage` of kind `tick`; the run ends
//! with exactly one of kind `done` carrying the frozen report.
//! A `SimSnapshot` is persisted every SNAPSHOT_INTERVAL minutes.

use crate::{
    clock::SimClock,
    metrics::SimReport,
    types::{Minute, RunId},
};
use serde::{Deserialize, Serialize};

pub const SNAPSHOT_INTERVAL: Minute = 15; // quarter hour

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageKind {
    Tick,
    Done,
}

/// Wire shape: `{"type": "tick", "sim_time": .., "sim_duration": .., ...report}`.
/// `sim_time` is minutes elapsed, so the last tick equals `sim_duration`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StreamMessage {
    #[serde(rename = "type")]
    pub kind:         MessageKind,
    pub sim_time:     f64,
    pub sim_duration: f64,
    #[serde(flatten)]
    pub report:       SimReport,
}

impl StreamMessage {
    pub fn tick(sim_time: Minute, sim_duration: Minute, report: SimReport) -> Self {
        Self {
            kind: MessageKind::Tick,
            sim_time: sim_time as f64,
            sim_duration: sim_duration as f64,
            report,
        }
    }

    pub fn done(sim_duration: Minute, report: SimReport) -> Self {
        Self {
            kind: MessageKind::Done,
            sim_time: sim_duration as f64,
            sim_duration: sim_duration as f64,
            report,
        }
    }

    pub fn is_final(&self) -> bool {
        self.kind == MessageKind::Done
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SimSnapshot {
    pub run_id: RunId,
    pub minute: Minute,
    pub clock:  SimClock,
    pub report: SimReport,
}
