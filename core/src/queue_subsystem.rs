//! Queue subsystem: per-minute checks on every waiting aircraft.
//!
//! For each aircraft still in a queue, in service order:
//!   1. Burn one minute of fuel (inbound, not on its entry minute).
//!      Reaching reserve declares a fuel emergency.
//!   2. Fuel exhausted for longer than the grace period → diverted.
//!   3. Waited longer than max_wait_time → diverted (inbound) or
//!      cancelled (outbound).
//!   4. Mechanical / passenger-health emergency waited past the hard
//!      limit → diverted.
//!
//! Execution: every minute, after traffic, before assignment.

use crate::{
    aircraft::{Direction, EmergencyStatus, ExitReason},
    context::RunContext,
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::{AircraftId, Minute},
};

#[derive(Default)]
pub struct QueueSubsystem;

impl QueueSubsystem {
    pub fn new() -> Self {
        Self
    }

    /// Why this aircraft must leave its queue now, if it must.
    fn exit_reason(ctx: &RunContext, id: AircraftId, minute: Minute) -> Option<ExitReason> {
        let aircraft = &ctx.aircraft[id];
        let tuning = &ctx.config.tuning;
        let waited = aircraft.waited(minute) as f64;

        if let Some(exhausted_at) = aircraft.fuel_exhausted_at {
            if minute.saturating_sub(exhausted_at) > tuning.fuel_grace_steps {
                return Some(ExitReason::FuelExhausted);
            }
        }
        if waited > ctx.config.max_wait_time {
            return Some(ExitReason::WaitExpired);
        }
        let limited = matches!(
            aircraft.emergency,
            EmergencyStatus::Mechanical | EmergencyStatus::PassengerHealth
        );
        if limited && waited > tuning.emergency_hard_limit {
            return Some(ExitReason::EmergencyLimit);
        }
        None
    }
}

impl SimSubsystem for QueueSubsystem {
    fn name(&self) -> &'static str { "queue" }

    fn update(
        &mut self,
        minute: Minute,
        ctx: &mut RunContext,
        _events_in: &[SimEvent],
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();

        for direction in [Direction::Inbound, Direction::Outbound] {
            let RunContext { aircraft, holding, takeoff, .. } = &mut *ctx;
            let queue = match direction {
                Direction::Inbound => holding,
                Direction::Outbound => takeoff,
            };
            queue.reorder(aircraft);
            let waiting: Vec<AircraftId> = queue.members().to_vec();

            for id in waiting {
                let entered_earlier = ctx.aircraft[id].entry.is_some_and(|entry| entry < minute);
                if entered_earlier && ctx.aircraft[id].burn_fuel(minute, &ctx.config.tuning)? {
                    let aircraft = &ctx.aircraft[id];
                    log::debug!(
                        "minute={minute} queue: {} fuel exhausted ({:.1} min left)",
                        aircraft.callsign,
                        aircraft.fuel_remaining.unwrap_or(0.0)
                    );
                    events.push(SimEvent::EmergencyDeclared {
                        minute,
                        callsign:  aircraft.callsign.clone(),
                        emergency: EmergencyStatus::Fuel,
                    });
                }

                if let Some(reason) = Self::exit_reason(ctx, id, minute) {
                    log::debug!(
                        "minute={minute} queue: {} leaves {:?} queue ({reason:?})",
                        ctx.aircraft[id].callsign,
                        direction
                    );
                    events.push(ctx.resolve_waiting(id, minute, reason)?);
                }
            }
        }

        Ok(events)
    }
}
