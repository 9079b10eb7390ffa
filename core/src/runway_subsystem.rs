//! Runway subsystem: closure activation and operation completion.
//!
//! Runs first each minute so that a runway freed or reopened at
//! minute t can be assigned again at minute t.
//!
//! Execution: every minute.
//! Depends on: none.

use crate::{
    config::RunwayStatus,
    context::RunContext,
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::Minute,
};

#[derive(Default)]
pub struct RunwaySubsystem;

impl RunwaySubsystem {
    pub fn new() -> Self {
        Self
    }
}

impl SimSubsystem for RunwaySubsystem {
    fn name(&self) -> &'static str { "runway" }

    fn update(
        &mut self,
        minute: Minute,
        ctx: &mut RunContext,
        _events_in: &[SimEvent],
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        let mut events = Vec::new();

        for change in ctx.runways.refresh(minute) {
            let runway = ctx.runway_number(change.runway);
            if change.to == RunwayStatus::Available {
                log::info!("minute={minute} runway {runway}: reopened");
                events.push(SimEvent::RunwayReopened { minute, runway });
            } else {
                log::info!("minute={minute} runway {runway}: closed ({:?})", change.to);
                events.push(SimEvent::RunwayClosed { minute, runway, reason: change.to });
            }
        }

        for (_, aircraft) in ctx.runways.release_due(minute) {
            events.push(ctx.complete(aircraft, minute)?);
        }

        Ok(events)
    }
}
