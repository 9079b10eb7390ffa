//! Traffic generator: one instance per direction.
//!
//! Each minute draws a Poisson count with mean `flow / 60` and admits
//! that many new aircraft to the direction's queue, scheduled for the
//! current minute. Inbound aircraft get a fuel endowment and may carry
//! an emergency from the start.
//!
//! Execution: every minute, after the runway subsystem.

use crate::{
    aircraft::{Aircraft, Direction, EmergencyStatus, ExitReason},
    callsign_generator::{CallsignGenerator, HOME_AIRPORT},
    config::EngineTuning,
    context::RunContext,
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::Minute,
};

const MINUTES_PER_HOUR: f64 = 60.0;

pub struct TrafficSubsystem {
    direction:     Direction,
    rate_per_hour: f64,
    tuning:        EngineTuning,
    generated:     u64,
}

impl TrafficSubsystem {
    pub fn new(direction: Direction, rate_per_hour: f64, tuning: EngineTuning) -> Self {
        Self {
            direction,
            rate_per_hour,
            tuning,
            generated: 0,
        }
    }

    pub fn inbound(ctx: &RunContext) -> Self {
        Self::new(Direction::Inbound, ctx.config.inbound_flow, ctx.config.tuning.clone())
    }

    pub fn outbound(ctx: &RunContext) -> Self {
        Self::new(Direction::Outbound, ctx.config.outbound_flow, ctx.config.tuning.clone())
    }

    pub fn generated(&self) -> u64 {
        self.generated
    }

    fn make_aircraft(&self, ctx: &RunContext, minute: Minute, rng: &mut SubsystemRng) -> Aircraft {
        let id = ctx.next_id();
        let operator = CallsignGenerator::generate_operator(rng);
        let remote = CallsignGenerator::generate_remote_airport(rng);
        let (origin, destination) = match self.direction {
            Direction::Inbound => (remote, HOME_AIRPORT),
            Direction::Outbound => (HOME_AIRPORT, remote),
        };

        let (fuel, emergency) = match self.direction {
            Direction::Inbound => self.roll_fuel_and_emergency(rng),
            Direction::Outbound => (None, EmergencyStatus::None),
        };

        Aircraft::new(
            id,
            CallsignGenerator::callsign(operator, id + 1),
            operator.to_string(),
            origin.to_string(),
            destination.to_string(),
            self.direction,
            minute,
            fuel,
            emergency,
        )
    }

    fn roll_fuel_and_emergency(&self, rng: &mut SubsystemRng) -> (Option<f64>, EmergencyStatus) {
        let t = &self.tuning;
        let fuel = rng.uniform(t.fuel_min, t.fuel_max);
        let roll = rng.next_f64();
        let mechanical = t.mechanical_emergency_probability;
        let passenger = mechanical + t.passenger_emergency_probability;
        let low_fuel = passenger + t.fuel_emergency_probability;

        if roll < mechanical {
            (Some(fuel), EmergencyStatus::Mechanical)
        } else if roll < passenger {
            (Some(fuel), EmergencyStatus::PassengerHealth)
        } else if roll < low_fuel {
            // Fuel emergencies arrive just above reserve.
            let fuel = rng.uniform(t.fuel_reserve + 1.0, t.fuel_reserve + 10.0);
            (Some(fuel), EmergencyStatus::Fuel)
        } else {
            (Some(fuel), EmergencyStatus::None)
        }
    }
}

impl SimSubsystem for TrafficSubsystem {
    fn name(&self) -> &'static str {
        match self.direction {
            Direction::Inbound => "inbound_traffic",
            Direction::Outbound => "outbound_traffic",
        }
    }

    fn update(
        &mut self,
        minute: Minute,
        ctx: &mut RunContext,
        _events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let count = rng.poisson(self.rate_per_hour / MINUTES_PER_HOUR);
        if count == 0 {
            return Ok(vec![]);
        }

        let serviceable = ctx.runways.has_capable(self.direction.operation());
        let mut events = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let aircraft = self.make_aircraft(ctx, minute, rng);
            events.push(SimEvent::AircraftEntered {
                minute,
                callsign:  aircraft.callsign.clone(),
                direction: aircraft.direction,
                emergency: aircraft.emergency,
                fuel:      aircraft.fuel_remaining,
            });
            let id = ctx.admit(aircraft, minute)?;
            self.generated += 1;

            // Nothing here can ever land/launch it: resolve on entry.
            if !serviceable {
                events.push(ctx.resolve_waiting(id, minute, ExitReason::NoCapableRunway)?);
            }
        }

        log::debug!(
            "minute={minute} {}: {count} new aircraft (total {})",
            self.name(),
            self.generated
        );
        Ok(events)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aircraft::Outcome,
        config::{RunwayConfig, RunwayMode, SimConfig},
        rng::{RngBank, SubsystemSlot},
    };

    fn run_minutes(ctx: &mut RunContext, traffic: &mut TrafficSubsystem, minutes: Minute) -> Vec<SimEvent> {
        let bank = RngBank::new(99);
        let mut events = Vec::new();
        for minute in 0..minutes {
            let mut rng = bank.for_subsystem_at_tick(SubsystemSlot::InboundTraffic, minute);
            events.extend(traffic.update(minute, ctx, &[], &mut rng).unwrap());
        }
        events
    }

    #[test]
    fn generated_aircraft_enter_holding_with_fuel() {
        let mut ctx = RunContext::new(SimConfig {
            inbound_flow: 60.0,
            ..SimConfig::default_test()
        });
        let mut traffic = TrafficSubsystem::inbound(&ctx);
        run_minutes(&mut ctx, &mut traffic, 30);

        assert!(traffic.generated() > 0);
        assert_eq!(ctx.holding.len() as u64, traffic.generated());
        let tuning = EngineTuning::default();
        for a in &ctx.aircraft {
            assert!(a.is_waiting());
            assert_eq!(a.entry, Some(a.scheduled));
            assert_eq!(a.destination, HOME_AIRPORT);
            let fuel = a.fuel_remaining.unwrap();
            assert!(fuel >= tuning.fuel_reserve + 1.0 && fuel < tuning.fuel_max);
        }
    }

    #[test]
    fn callsigns_are_unique() {
        let mut ctx = RunContext::new(SimConfig {
            inbound_flow: 600.0,
            ..SimConfig::default_test()
        });
        let mut traffic = TrafficSubsystem::inbound(&ctx);
        run_minutes(&mut ctx, &mut traffic, 20);

        let mut callsigns: Vec<&str> = ctx.aircraft.iter().map(|a| a.callsign.as_str()).collect();
        let total = callsigns.len();
        callsigns.sort_unstable();
        callsigns.dedup();
        assert_eq!(callsigns.len(), total);
    }

    #[test]
    fn no_landing_runway_diverts_on_entry() {
        let mut ctx = RunContext::new(SimConfig {
            runways: vec![RunwayConfig::new("27", RunwayMode::Takeoff)],
            inbound_flow: 60.0,
            ..SimConfig::default_test()
        });
        let mut traffic = TrafficSubsystem::inbound(&ctx);
        run_minutes(&mut ctx, &mut traffic, 20);

        assert!(ctx.holding.is_empty());
        assert!(!ctx.aircraft.is_empty());
        for a in &ctx.aircraft {
            assert_eq!(a.outcome(), Some(Outcome::Diverted));
            assert_eq!(a.exit_reason(), Some(ExitReason::NoCapableRunway));
        }
    }

    #[test]
    fn zero_rate_generates_nothing() {
        let mut ctx = RunContext::new(SimConfig {
            inbound_flow: 0.0,
            ..SimConfig::default_test()
        });
        let mut traffic = TrafficSubsystem::inbound(&ctx);
        let events = run_minutes(&mut ctx, &mut traffic, 60);
        assert!(events.is_empty());
        assert!(ctx.aircraft.is_empty());
    }
}
