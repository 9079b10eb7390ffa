//! Assignment subsystem: hands free runways to queue heads.
//!
//! Each pass looks at the head of both queues, takes the one that
//! ranks first under `priority_cmp` among those with a runway free
//! for their operation, and assigns it. Passes repeat until no head
//! can be served this minute.
//!
//! Execution: every minute, last.
//! Depends on: runway (releases), queue (expiries already removed).

use crate::{
    context::RunContext,
    error::SimResult,
    event::SimEvent,
    queue::priority_cmp,
    rng::SubsystemRng,
    subsystem::SimSubsystem,
    types::{AircraftId, Minute, RunwayId},
};

#[derive(Default)]
pub struct AssignmentSubsystem;

impl AssignmentSubsystem {
    pub fn new() -> Self {
        Self
    }

    /// Best servable queue head and the runway it should take.
    fn next_assignment(ctx: &RunContext, minute: Minute) -> Option<(AircraftId, RunwayId)> {
        [&ctx.holding, &ctx.takeoff]
            .into_iter()
            .filter_map(|queue| {
                let head = queue.head()?;
                let operation = queue.direction().operation();
                let runway = ctx.runways.preferred_for(operation, minute)?;
                Some((head, runway))
            })
            .min_by(|(a, _), (b, _)| priority_cmp(&ctx.aircraft[*a], &ctx.aircraft[*b]))
    }
}

impl SimSubsystem for AssignmentSubsystem {
    fn name(&self) -> &'static str { "assignment" }

    fn update(
        &mut self,
        minute: Minute,
        ctx: &mut RunContext,
        _events_in: &[SimEvent],
        _rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>> {
        {
            let RunContext { aircraft, holding, takeoff, .. } = &mut *ctx;
            holding.reorder(aircraft);
            takeoff.reorder(aircraft);
        }

        let mut events = Vec::new();
        while let Some((id, runway)) = Self::next_assignment(ctx, minute) {
            let event = ctx.assign(id, runway, minute)?;
            log::debug!(
                "minute={minute} assignment: {} → runway {}",
                ctx.aircraft[id].callsign,
                ctx.runway_number(runway)
            );
            events.push(event);
        }
        Ok(events)
    }
}
