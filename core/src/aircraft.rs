//! Aircraft lifecycle: the state machine one aircraft moves through.
//!
//!   Scheduled → Waiting → Assigned → Terminal{landed | departed}
//!                       ↘ Terminal{diverted | cancelled}
//!
//! RULE: Terminal states are absorbing. Any transition attempted from
//! a state that does not allow it is an invariant violation, never a
//! silent correction.

use crate::{
    config::EngineTuning,
    error::{SimError, SimResult},
    types::{AircraftId, Minute, RunwayId},
};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Direction {
    Inbound,
    Outbound,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Operation {
    Landing,
    Takeoff,
}

impl Direction {
    pub fn operation(self) -> Operation {
        match self {
            Self::Inbound => Operation::Landing,
            Self::Outbound => Operation::Takeoff,
        }
    }

    /// The outcome of leaving the queue without a runway.
    pub fn abandoned_outcome(self) -> Outcome {
        match self {
            Self::Inbound => Outcome::Diverted,
            Self::Outbound => Outcome::Cancelled,
        }
    }

    pub fn serviced_outcome(self) -> Outcome {
        match self {
            Self::Inbound => Outcome::Landed,
            Self::Outbound => Outcome::Departed,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EmergencyStatus {
    #[default]
    None,
    Fuel,
    Mechanical,
    PassengerHealth,
}

impl EmergencyStatus {
    /// Higher is served first.
    pub fn severity(self) -> u8 {
        match self {
            Self::Fuel => 3,
            Self::Mechanical => 2,
            Self::PassengerHealth => 1,
            Self::None => 0,
        }
    }

    pub fn is_active(self) -> bool {
        self != Self::None
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Outcome {
    Landed,
    Departed,
    Diverted,
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExitReason {
    RunwayOperation,
    WaitExpired,
    FuelExhausted,
    EmergencyLimit,
    NoCapableRunway,
    RunEnded,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LifecycleState {
    Scheduled,
    Waiting,
    Assigned {
        runway:     RunwayId,
        started:    Minute,
        release_at: Minute,
    },
    Terminal {
        outcome: Outcome,
        reason:  ExitReason,
        exit:    Minute,
    },
}

#[derive(Debug, Clone)]
pub struct Aircraft {
    pub id:                AircraftId,
    pub callsign:          String,
    pub operator:          String,
    pub origin:            String,
    pub destination:       String,
    pub direction:         Direction,
    pub scheduled:         Minute,
    pub entry:             Option<Minute>,
    /// Minutes of flight time left. Inbound only.
    pub fuel_remaining:    Option<f64>,
    pub fuel_at_entry:     Option<f64>,
    pub emergency:         EmergencyStatus,
    pub fuel_exhausted_at: Option<Minute>,
    pub runway:            Option<RunwayId>,
    pub wait_time:         f64,
    pub delay:             f64,
    pub state:             LifecycleState,
}

impl Aircraft {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        id: AircraftId,
        callsign: String,
        operator: String,
        origin: String,
        destination: String,
        direction: Direction,
        scheduled: Minute,
        fuel: Option<f64>,
        emergency: EmergencyStatus,
    ) -> Self {
        Self {
            id,
            callsign,
            operator,
            origin,
            destination,
            direction,
            scheduled,
            entry: None,
            fuel_remaining: fuel,
            fuel_at_entry: None,
            emergency,
            fuel_exhausted_at: None,
            runway: None,
            wait_time: 0.0,
            delay: 0.0,
            state: LifecycleState::Scheduled,
        }
    }

    pub fn is_waiting(&self) -> bool {
        self.state == LifecycleState::Waiting
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self.state, LifecycleState::Terminal { .. })
    }

    pub fn outcome(&self) -> Option<Outcome> {
        match self.state {
            LifecycleState::Terminal { outcome, .. } => Some(outcome),
            _ => None,
        }
    }

    pub fn exit_reason(&self) -> Option<ExitReason> {
        match self.state {
            LifecycleState::Terminal { reason, .. } => Some(reason),
            _ => None,
        }
    }

    pub fn exit_minute(&self) -> Option<Minute> {
        match self.state {
            LifecycleState::Terminal { exit, .. } => Some(exit),
            _ => None,
        }
    }

    /// Minutes spent in the queue as of `minute`.
    pub fn waited(&self, minute: Minute) -> Minute {
        self.entry.map_or(0, |entry| minute.saturating_sub(entry))
    }

    // ── Transitions ─────────────────────────────────────────────

    /// Scheduled → Waiting.
    pub fn enter_queue(&mut self, minute: Minute) -> SimResult<()> {
        self.expect_state(minute, "enter queue", |s| *s == LifecycleState::Scheduled)?;
        self.entry = Some(minute);
        self.fuel_at_entry = self.fuel_remaining;
        self.state = LifecycleState::Waiting;
        Ok(())
    }

    /// Burn one step of fuel while holding. Returns true when this burn
    /// exhausted the aircraft's usable fuel and declared a fuel emergency.
    pub fn burn_fuel(&mut self, minute: Minute, tuning: &EngineTuning) -> SimResult<bool> {
        self.expect_state(minute, "burn fuel", |s| *s == LifecycleState::Waiting)?;
        let Some(fuel) = self.fuel_remaining.as_mut() else {
            return Ok(false);
        };
        *fuel = (*fuel - tuning.fuel_burn_per_minute).max(0.0);
        if self.fuel_exhausted_at.is_none() && *fuel <= tuning.fuel_reserve {
            self.fuel_exhausted_at = Some(minute);
            self.emergency = EmergencyStatus::Fuel;
            return Ok(true);
        }
        Ok(false)
    }

    /// Waiting → Assigned.
    pub fn assign(&mut self, runway: RunwayId, minute: Minute, service: Minute) -> SimResult<()> {
        self.expect_state(minute, "take a runway", |s| *s == LifecycleState::Waiting)?;
        let release_at = minute.checked_add(service).ok_or_else(|| {
            SimError::invariant(minute, format!("{} service time {service} overflows the clock", self.callsign))
        })?;
        let entry = self.entry.unwrap_or(minute);
        self.wait_time = minute.saturating_sub(entry) as f64;
        self.delay = minute.saturating_sub(self.scheduled) as f64;
        self.runway = Some(runway);
        self.state = LifecycleState::Assigned {
            runway,
            started: minute,
            release_at,
        };
        Ok(())
    }

    /// Assigned → Terminal{landed | departed}.
    pub fn complete(&mut self, minute: Minute) -> SimResult<Outcome> {
        self.expect_state(minute, "complete an operation", |s| {
            matches!(s, LifecycleState::Assigned { .. })
        })?;
        let outcome = self.direction.serviced_outcome();
        self.state = LifecycleState::Terminal {
            outcome,
            reason: ExitReason::RunwayOperation,
            exit: minute,
        };
        Ok(outcome)
    }

    /// Waiting → Terminal{diverted | cancelled}. The direction decides
    /// which, never the reason.
    pub fn abandon(&mut self, minute: Minute, reason: ExitReason) -> SimResult<Outcome> {
        self.expect_state(minute, "leave the queue", |s| *s == LifecycleState::Waiting)?;
        let outcome = self.direction.abandoned_outcome();
        self.wait_time = self.waited(minute) as f64;
        self.delay = 0.0;
        self.state = LifecycleState::Terminal { outcome, reason, exit: minute };
        Ok(outcome)
    }

    fn expect_state(
        &self,
        minute: Minute,
        action: &str,
        allowed: impl Fn(&LifecycleState) -> bool,
    ) -> SimResult<()> {
        if allowed(&self.state) {
            Ok(())
        } else {
            Err(SimError::invariant(
                minute,
                format!("{} cannot {action} from state {:?}", self.callsign, self.state),
            ))
        }
    }

    /// Log entry for a resolved aircraft. None while it is still active.
    pub fn to_log(&self, runway_number: Option<&str>) -> Option<AircraftLog> {
        let LifecycleState::Terminal { outcome, reason, exit } = self.state else {
            return None;
        };
        Some(AircraftLog {
            callsign:       self.callsign.clone(),
            operator:       self.operator.clone(),
            origin:         self.origin.clone(),
            destination:    self.destination.clone(),
            direction:      self.direction,
            scheduled_time: self.scheduled as f64,
            entry_time:     self.entry.unwrap_or(self.scheduled) as f64,
            exit_time:      Some(exit as f64),
            wait_time:      self.wait_time.max(0.0),
            delay:          self.delay,
            emergency:      self.emergency,
            fuel_at_entry:  self.fuel_at_entry.unwrap_or(0.0),
            outcome,
            exit_reason:    reason,
            runway:         runway_number.map(String::from),
        })
    }
}

/// One resolved aircraft as it appears in the report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AircraftLog {
    pub callsign:       String,
    pub operator:       String,
    pub origin:         String,
    pub destination:    String,
    pub direction:      Direction,
    pub scheduled_time: f64,
    pub entry_time:     f64,
    pub exit_time:      Option<f64>,
    pub wait_time:      f64,
    pub delay:          f64,
    pub emergency:      EmergencyStatus,
    pub fuel_at_entry:  f64,
    pub outcome:        Outcome,
    pub exit_reason:    ExitReason,
    pub runway:         Option<String>,
}
