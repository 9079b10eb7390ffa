use crate::{
    error::{SimError, SimResult},
    types::Minute,
};
use serde::{Deserialize, Serialize};

// ── Engine constants ───────────────────────────────────────────────

/// Runway occupancy of one landing, in minutes.
pub const LANDING_DURATION: Minute = 2;
/// Runway occupancy of one takeoff, in minutes.
pub const TAKEOFF_DURATION: Minute = 2;

/// Inbound fuel endowment bounds (minutes of flight time).
pub const FUEL_MIN: f64 = 20.0;
pub const FUEL_MAX: f64 = 60.0;
/// Fuel counts as exhausted once remaining fuel reaches the reserve.
pub const FUEL_RESERVE: f64 = 10.0;
pub const FUEL_BURN_PER_MINUTE: f64 = 1.0;
/// Steps an exhausted aircraft may still be cleared to land before diverting.
pub const FUEL_GRACE_STEPS: Minute = 1;

pub const EMERGENCY_MECHANICAL_PROB: f64 = 0.01;
pub const EMERGENCY_PASSENGER_PROB: f64 = 0.01;
pub const EMERGENCY_FUEL_PROB: f64 = 0.005;
/// Mechanical and passenger-health emergencies divert after this long in holding.
pub const EMERGENCY_HARD_LIMIT: f64 = 20.0;

pub const MAX_RUNWAYS: usize = 10;
/// Longest runway occupancy a single operation may have (one day).
pub const MAX_SERVICE_MINUTES: Minute = 24 * 60;

// ── Runways ────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunwayMode {
    Landing,
    Takeoff,
    Mixed,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunwayStatus {
    #[default]
    Available,
    Inspection,
    Snow,
    EquipmentFailure,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RunwayConfig {
    /// Runway designator, e.g. "09" or "27L".
    pub number:  String,
    /// Metres.
    pub length:  f64,
    /// Degrees.
    pub bearing: f64,
    pub mode:    RunwayMode,
    /// Anything other than `available` takes the runway out of service for the run.
    pub status:  RunwayStatus,
}

impl Default for RunwayConfig {
    fn default() -> Self {
        Self {
            number:  "01".into(),
            length:  3000.0,
            bearing: 90.0,
            mode:    RunwayMode::Landing,
            status:  RunwayStatus::Available,
        }
    }
}

impl RunwayConfig {
    pub fn new(number: &str, mode: RunwayMode) -> Self {
        Self {
            number: number.into(),
            mode,
            ..Self::default()
        }
    }
}

/// A scheduled closure over the half-open interval `[start_time, end_time)`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunwayClosure {
    pub runway_index: usize,
    pub start_time:   f64,
    pub end_time:     f64,
    #[serde(default = "default_closure_reason")]
    pub reason:       RunwayStatus,
}

fn default_closure_reason() -> RunwayStatus {
    RunwayStatus::Inspection
}

impl RunwayClosure {
    pub fn covers(&self, minute: Minute) -> bool {
        let t = minute as f64;
        self.start_time <= t && t < self.end_time
    }
}

// ── Tuning ─────────────────────────────────────────────────────────

/// Model constants not fixed by the wire schema.
/// Every field defaults to the documented constant above.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineTuning {
    pub landing_duration:                 Minute,
    pub takeoff_duration:                 Minute,
    pub fuel_min:                         f64,
    pub fuel_max:                         f64,
    pub fuel_reserve:                     f64,
    pub fuel_burn_per_minute:             f64,
    pub fuel_grace_steps:                 Minute,
    pub mechanical_emergency_probability: f64,
    pub passenger_emergency_probability:  f64,
    pub fuel_emergency_probability:       f64,
    pub emergency_hard_limit:             f64,
}

impl Default for EngineTuning {
    fn default() -> Self {
        Self {
            landing_duration:                 LANDING_DURATION,
            takeoff_duration:                 TAKEOFF_DURATION,
            fuel_min:                         FUEL_MIN,
            fuel_max:                         FUEL_MAX,
            fuel_reserve:                     FUEL_RESERVE,
            fuel_burn_per_minute:             FUEL_BURN_PER_MINUTE,
            fuel_grace_steps:                 FUEL_GRACE_STEPS,
            mechanical_emergency_probability: EMERGENCY_MECHANICAL_PROB,
            passenger_emergency_probability:  EMERGENCY_PASSENGER_PROB,
            fuel_emergency_probability:       EMERGENCY_FUEL_PROB,
            emergency_hard_limit:             EMERGENCY_HARD_LIMIT,
        }
    }
}

impl EngineTuning {
    /// No injected emergencies. Fuel still burns.
    pub fn without_emergencies() -> Self {
        Self {
            mechanical_emergency_probability: 0.0,
            passenger_emergency_probability:  0.0,
            fuel_emergency_probability:       0.0,
            ..Self::default()
        }
    }

    fn collect_violations(&self, violations: &mut Vec<String>) {
        for (name, service) in [
            ("landing_duration", self.landing_duration),
            ("takeoff_duration", self.takeoff_duration),
        ] {
            if !(1..=MAX_SERVICE_MINUTES).contains(&service) {
                violations.push(format!(
                    "tuning.{name} must be between 1 and {MAX_SERVICE_MINUTES} minutes (got {service})"
                ));
            }
        }
        if !(self.fuel_min.is_finite() && self.fuel_max.is_finite()) || self.fuel_min > self.fuel_max {
            violations.push(format!(
                "tuning fuel bounds must be finite with fuel_min <= fuel_max (got {} / {})",
                self.fuel_min, self.fuel_max
            ));
        }
        if !self.fuel_reserve.is_finite() || self.fuel_reserve < 0.0 {
            violations.push(format!("tuning.fuel_reserve must be >= 0 (got {})", self.fuel_reserve));
        }
        if !self.fuel_burn_per_minute.is_finite() || self.fuel_burn_per_minute < 0.0 {
            violations.push(format!(
                "tuning.fuel_burn_per_minute must be >= 0 (got {})",
                self.fuel_burn_per_minute
            ));
        }
        let probabilities = [
            ("mechanical_emergency_probability", self.mechanical_emergency_probability),
            ("passenger_emergency_probability", self.passenger_emergency_probability),
            ("fuel_emergency_probability", self.fuel_emergency_probability),
        ];
        for (name, p) in probabilities {
            if !(0.0..=1.0).contains(&p) {
                violations.push(format!("tuning.{name} must be in [0, 1] (got {p})"));
            }
        }
        let total: f64 = probabilities.iter().map(|(_, p)| p).sum();
        if total > 1.0 {
            violations.push(format!("tuning emergency probabilities sum to {total}, above 1"));
        }
        if !self.emergency_hard_limit.is_finite() || self.emergency_hard_limit <= 0.0 {
            violations.push(format!(
                "tuning.emergency_hard_limit must be > 0 (got {})",
                self.emergency_hard_limit
            ));
        }
    }
}

// ── Run configuration ──────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SimConfig {
    pub runways:       Vec<RunwayConfig>,
    /// Aircraft per hour.
    pub inbound_flow:  f64,
    /// Aircraft per hour.
    pub outbound_flow: f64,
    /// Minutes an aircraft may wait before it is diverted or cancelled.
    pub max_wait_time: f64,
    /// Minutes.
    pub sim_duration:  f64,
    pub closures:      Vec<RunwayClosure>,
    pub seed:          Option<u64>,
    pub tuning:        EngineTuning,
}

impl Default for SimConfig {
    fn default() -> Self {
        Self {
            runways:       vec![RunwayConfig::default()],
            inbound_flow:  15.0,
            outbound_flow: 15.0,
            max_wait_time: 30.0,
            sim_duration:  120.0,
            closures:      Vec::new(),
            seed:          None,
            tuning:        EngineTuning::default(),
        }
    }
}

impl SimConfig {
    /// Parse a configuration document. Malformed JSON or wrongly typed
    /// fields surface as configuration errors, like schema violations.
    pub fn from_json(json: &str) -> SimResult<Self> {
        serde_json::from_str(json).map_err(|e| SimError::Configuration {
            violations: vec![format!("malformed configuration: {e}")],
        })
    }

    /// Load a scenario file.
    /// In tests, use SimConfig::default_test().
    pub fn load(path: &str) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("Cannot read {path}: {e}"))?;
        let config: SimConfig = serde_json::from_str(&content)
            .map_err(|e| anyhow::anyhow!("Cannot parse {path}: {e}"))?;
        Ok(config)
    }

    /// Config with fixed values for use in tests: one landing and one
    /// takeoff runway, moderate flow, one hour, seeded.
    pub fn default_test() -> Self {
        Self {
            runways: vec![
                RunwayConfig::new("09", RunwayMode::Landing),
                RunwayConfig::new("27", RunwayMode::Takeoff),
            ],
            inbound_flow:  10.0,
            outbound_flow: 10.0,
            max_wait_time: 30.0,
            sim_duration:  60.0,
            closures:      Vec::new(),
            seed:          Some(42),
            tuning:        EngineTuning::default(),
        }
    }

    /// Number of one-minute steps in the run.
    pub fn duration_minutes(&self) -> Minute {
        self.sim_duration.ceil() as Minute
    }

    /// Check every schema rule and report all violations at once.
    pub fn validate(&self) -> SimResult<()> {
        let mut violations = Vec::new();

        if self.runways.is_empty() || self.runways.len() > MAX_RUNWAYS {
            violations.push(format!(
                "runways must contain 1 to {MAX_RUNWAYS} entries (got {})",
                self.runways.len()
            ));
        }
        for (i, runway) in self.runways.iter().enumerate() {
            let chars = runway.number.chars().count();
            if !(2..=3).contains(&chars) {
                violations.push(format!(
                    "runways[{i}].number must be 2-3 characters (got {:?})",
                    runway.number
                ));
            }
            if !runway.length.is_finite() || runway.length <= 0.0 {
                violations.push(format!("runways[{i}].length must be > 0 (got {})", runway.length));
            }
            if !(0.0..360.0).contains(&runway.bearing) {
                violations.push(format!(
                    "runways[{i}].bearing must be in [0, 360) (got {})",
                    runway.bearing
                ));
            }
        }

        for (name, rate) in [("inbound_flow", self.inbound_flow), ("outbound_flow", self.outbound_flow)] {
            if !rate.is_finite() || rate < 0.0 {
                violations.push(format!("{name} must be >= 0 (got {rate})"));
            }
        }
        if !self.max_wait_time.is_finite() || self.max_wait_time <= 0.0 {
            violations.push(format!("max_wait_time must be > 0 (got {})", self.max_wait_time));
        }
        if !self.sim_duration.is_finite() || self.sim_duration <= 0.0 {
            violations.push(format!("sim_duration must be > 0 (got {})", self.sim_duration));
        }

        for (i, closure) in self.closures.iter().enumerate() {
            if closure.runway_index >= self.runways.len() {
                violations.push(format!(
                    "closures[{i}].runway_index {} does not reference a runway (have {})",
                    closure.runway_index,
                    self.runways.len()
                ));
            }
            if !closure.start_time.is_finite() || closure.start_time < 0.0 {
                violations.push(format!(
                    "closures[{i}].start_time must be >= 0 (got {})",
                    closure.start_time
                ));
            }
            if !closure.end_time.is_finite() || closure.start_time > closure.end_time {
                violations.push(format!(
                    "closures[{i}] must satisfy start_time <= end_time (got {} > {})",
                    closure.start_time, closure.end_time
                ));
            }
        }

        self.tuning.collect_violations(&mut violations);

        if violations.is_empty() {
            Ok(())
        } else {
            Err(SimError::Configuration { violations })
        }
    }
}
