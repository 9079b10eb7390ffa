//! Per-run state shared by the step pipeline.
//!
//! RULE: All mutable run state lives here and is passed explicitly to
//! each subsystem. Nothing is process-wide, so independent runs can
//! execute side by side on separate threads.

use crate::{
    aircraft::{Aircraft, Direction, ExitReason},
    config::SimConfig,
    error::{SimError, SimResult},
    event::SimEvent,
    queue::WaitingQueue,
    runway::RunwayPool,
    types::{AircraftId, Minute, RunwayId},
};

pub struct RunContext {
    pub config:   SimConfig,
    /// Every aircraft generated this run, indexed by AircraftId.
    pub aircraft: Vec<Aircraft>,
    pub runways:  RunwayPool,
    pub holding:  WaitingQueue,
    pub takeoff:  WaitingQueue,
}

impl RunContext {
    pub fn new(config: SimConfig) -> Self {
        let runways = RunwayPool::new(&config);
        Self {
            config,
            aircraft: Vec::new(),
            runways,
            holding: WaitingQueue::holding(),
            takeoff: WaitingQueue::takeoff(),
        }
    }

    pub fn queue(&self, direction: Direction) -> &WaitingQueue {
        match direction {
            Direction::Inbound => &self.holding,
            Direction::Outbound => &self.takeoff,
        }
    }

    pub fn queue_mut(&mut self, direction: Direction) -> &mut WaitingQueue {
        match direction {
            Direction::Inbound => &mut self.holding,
            Direction::Outbound => &mut self.takeoff,
        }
    }

    /// Id the next generated aircraft will receive.
    pub fn next_id(&self) -> AircraftId {
        self.aircraft.len()
    }

    pub fn waiting_count(&self, direction: Direction) -> usize {
        self.aircraft
            .iter()
            .filter(|a| a.direction == direction && a.is_waiting())
            .count()
    }

    /// Put a freshly generated aircraft into the queue for its direction.
    pub fn admit(&mut self, mut aircraft: Aircraft, minute: Minute) -> SimResult<AircraftId> {
        let id = self.next_id();
        if aircraft.id != id {
            return Err(SimError::invariant(
                minute,
                format!("{} generated with id {} but next id is {id}", aircraft.callsign, aircraft.id),
            ));
        }
        aircraft.enter_queue(minute)?;
        let direction = aircraft.direction;
        self.aircraft.push(aircraft);
        if self.queue(opposite(direction)).contains(id) || !self.queue_mut(direction).admit(id) {
            return Err(SimError::invariant(minute, format!("aircraft #{id} admitted twice")));
        }
        Ok(id)
    }

    /// Remove a waiting aircraft without service: diverted or cancelled.
    pub fn resolve_waiting(
        &mut self,
        id: AircraftId,
        minute: Minute,
        reason: ExitReason,
    ) -> SimResult<SimEvent> {
        let direction = self.aircraft_ref(id, minute)?.direction;
        if !self.queue_mut(direction).remove(id) {
            return Err(SimError::invariant(
                minute,
                format!("aircraft #{id} resolved but not found in its {direction:?} queue"),
            ));
        }
        self.aircraft[id].abandon(minute, reason)?;
        self.resolved_event(id, minute)
    }

    /// Move the head of a queue onto a runway.
    pub fn assign(&mut self, id: AircraftId, runway: RunwayId, minute: Minute) -> SimResult<SimEvent> {
        let direction = self.aircraft_ref(id, minute)?.direction;
        let operation = direction.operation();
        let service = match direction {
            Direction::Inbound => self.config.tuning.landing_duration,
            Direction::Outbound => self.config.tuning.takeoff_duration,
        };
        if !self.queue_mut(direction).remove(id) {
            return Err(SimError::invariant(
                minute,
                format!("aircraft #{id} assigned but not found in its {direction:?} queue"),
            ));
        }
        let release_at = self.runways.assign(runway, id, operation, minute, service)?;
        self.aircraft[id].assign(runway, minute, service)?;
        Ok(SimEvent::RunwayAssigned {
            minute,
            callsign: self.aircraft[id].callsign.clone(),
            runway: self.runway_number(runway),
            operation,
            release_at,
        })
    }

    /// Finish a runway operation: landed or departed.
    pub fn complete(&mut self, id: AircraftId, minute: Minute) -> SimResult<SimEvent> {
        self.aircraft_ref(id, minute)?;
        self.aircraft[id].complete(minute)?;
        self.resolved_event(id, minute)
    }

    pub fn runway_number(&self, runway: RunwayId) -> String {
        self.runways.number(runway).unwrap_or("??").to_string()
    }

    fn aircraft_ref(&self, id: AircraftId, minute: Minute) -> SimResult<&Aircraft> {
        self.aircraft
            .get(id)
            .ok_or_else(|| SimError::invariant(minute, format!("unknown aircraft #{id}")))
    }

    fn resolved_event(&self, id: AircraftId, minute: Minute) -> SimResult<SimEvent> {
        let aircraft = &self.aircraft[id];
        let runway = aircraft.runway.and_then(|r| self.runways.number(r));
        let log = aircraft.to_log(runway).ok_or_else(|| {
            SimError::invariant(minute, format!("{} resolved without an outcome", aircraft.callsign))
        })?;
        Ok(SimEvent::AircraftResolved { minute, log })
    }

    /// Every waiting aircraft is in exactly the queue for its direction,
    /// every queue member is waiting, and every assigned aircraft holds
    /// the runway it claims.
    pub fn verify_invariants(&self, minute: Minute) -> SimResult<()> {
        let mut memberships = vec![0usize; self.aircraft.len()];
        for queue in [&self.holding, &self.takeoff] {
            for &id in queue.members() {
                let aircraft = self.aircraft_ref(id, minute)?;
                if aircraft.direction != queue.direction() {
                    return Err(SimError::invariant(
                        minute,
                        format!("{} ({:?}) found in the {:?} queue", aircraft.callsign, aircraft.direction, queue.direction()),
                    ));
                }
                if !aircraft.is_waiting() {
                    return Err(SimError::invariant(
                        minute,
                        format!("{} queued in state {:?}", aircraft.callsign, aircraft.state),
                    ));
                }
                memberships[id] += 1;
            }
        }
        for aircraft in &self.aircraft {
            let expected = usize::from(aircraft.is_waiting());
            if memberships[aircraft.id] != expected {
                return Err(SimError::invariant(
                    minute,
                    format!(
                        "{} found in {} queues while {:?}",
                        aircraft.callsign, memberships[aircraft.id], aircraft.state
                    ),
                ));
            }
            if let crate::aircraft::LifecycleState::Assigned { runway, .. } = aircraft.state {
                let holds = self
                    .runways
                    .runway(runway)
                    .and_then(|r| r.occupant())
                    .is_some_and(|occ| occ.aircraft == aircraft.id);
                if !holds {
                    return Err(SimError::invariant(
                        minute,
                        format!("{} assigned to runway #{runway} it does not occupy", aircraft.callsign),
                    ));
                }
            }
        }
        Ok(())
    }
}

fn opposite(direction: Direction) -> Direction {
    match direction {
        Direction::Inbound => Direction::Outbound,
        Direction::Outbound => Direction::Inbound,
    }
}
