//! Simulation clock: owns the current minute and the run horizon.

use crate::types::{Minute, RunId};
use serde::{Deserialize, Serialize};

/// Width of one clock step in simulated minutes.
pub const STEP: Minute = 1;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SimClock {
    pub run_id:         RunId,
    pub current_minute: Minute,
    pub duration:       Minute,
}

impl SimClock {
    pub fn new(run_id: RunId, duration: Minute) -> Self {
        Self {
            run_id,
            current_minute: 0,
            duration,
        }
    }

    /// Advance one step. Returns the minute that step covers.
    /// Panics if called on a terminal clock; callers must check.
    pub fn advance(&mut self) -> Minute {
        assert!(!self.is_terminal(), "advance() called on terminal clock");
        let minute = self.current_minute;
        self.current_minute += STEP;
        minute
    }

    pub fn is_terminal(&self) -> bool {
        self.current_minute >= self.duration
    }

    pub fn remaining(&self) -> Minute {
        self.duration.saturating_sub(self.current_minute)
    }
}
