//! Runway pool: capability, closure-driven availability and exclusive
//! occupancy for every runway of one run.
//!
//! RULE: A runway services at most one aircraft at a time, and never
//! starts an operation inside an active closure. Requests that would
//! break either rule are invariant violations.

use crate::{
    aircraft::Operation,
    config::{RunwayClosure, RunwayConfig, RunwayMode, RunwayStatus, SimConfig},
    error::{SimError, SimResult},
    types::{AircraftId, Minute, RunwayId},
};

impl RunwayMode {
    pub fn supports(self, operation: Operation) -> bool {
        matches!(
            (self, operation),
            (RunwayMode::Mixed, _)
                | (RunwayMode::Landing, Operation::Landing)
                | (RunwayMode::Takeoff, Operation::Takeoff)
        )
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Occupancy {
    pub aircraft:   AircraftId,
    pub operation:  Operation,
    pub started:    Minute,
    pub release_at: Minute,
}

#[derive(Debug, Clone)]
pub struct Runway {
    pub id:       RunwayId,
    pub number:   String,
    pub length:   f64,
    pub bearing:  f64,
    pub mode:     RunwayMode,
    /// Status as of the last refresh.
    pub status:   RunwayStatus,
    /// Configured status; anything but available removes the runway for the run.
    base_status:  RunwayStatus,
    occupant:     Option<Occupancy>,
}

impl Runway {
    fn from_config(id: RunwayId, config: &RunwayConfig) -> Self {
        Self {
            id,
            number:      config.number.clone(),
            length:      config.length,
            bearing:     config.bearing,
            mode:        config.mode,
            status:      config.status,
            base_status: config.status,
            occupant:    None,
        }
    }

    pub fn in_service(&self) -> bool {
        self.base_status == RunwayStatus::Available
    }

    pub fn is_idle(&self) -> bool {
        self.occupant.is_none()
    }

    pub fn occupant(&self) -> Option<&Occupancy> {
        self.occupant.as_ref()
    }
}

/// Status transition observed by `refresh`.
#[derive(Debug, Clone, PartialEq)]
pub struct StatusChange {
    pub runway: RunwayId,
    pub from:   RunwayStatus,
    pub to:     RunwayStatus,
}

/// Every operation ever started, in start order.
#[derive(Debug, Clone, PartialEq)]
pub struct AssignmentRecord {
    pub runway:     RunwayId,
    pub aircraft:   AircraftId,
    pub operation:  Operation,
    pub started:    Minute,
    pub release_at: Minute,
}

pub struct RunwayPool {
    runways:     Vec<Runway>,
    closures:    Vec<RunwayClosure>,
    assignments: Vec<AssignmentRecord>,
}

impl RunwayPool {
    pub fn new(config: &SimConfig) -> Self {
        Self {
            runways: config
                .runways
                .iter()
                .enumerate()
                .map(|(id, rc)| Runway::from_config(id, rc))
                .collect(),
            closures: config.closures.clone(),
            assignments: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.runways.len()
    }

    pub fn is_empty(&self) -> bool {
        self.runways.is_empty()
    }

    pub fn runways(&self) -> &[Runway] {
        &self.runways
    }

    pub fn runway(&self, id: RunwayId) -> Option<&Runway> {
        self.runways.get(id)
    }

    pub fn number(&self, id: RunwayId) -> Option<&str> {
        self.runways.get(id).map(|r| r.number.as_str())
    }

    pub fn assignments(&self) -> &[AssignmentRecord] {
        &self.assignments
    }

    /// Reason of the first closure covering `minute`, if any. Overlapping
    /// closures close the runway once; the earliest listed one names it.
    pub fn closure_at(&self, id: RunwayId, minute: Minute) -> Option<RunwayStatus> {
        self.closures
            .iter()
            .find(|c| c.runway_index == id && c.covers(minute))
            .map(|c| c.reason)
    }

    pub fn is_closed(&self, id: RunwayId, minute: Minute) -> bool {
        match self.runways.get(id) {
            Some(runway) => !runway.in_service() || self.closure_at(id, minute).is_some(),
            None => true,
        }
    }

    /// True when some in-service runway could ever handle `operation`,
    /// closures aside.
    pub fn has_capable(&self, operation: Operation) -> bool {
        self.runways
            .iter()
            .any(|r| r.in_service() && r.mode.supports(operation))
    }

    /// Re-derive every runway's status for `minute`. Returns the
    /// activations and deactivations since the previous refresh.
    pub fn refresh(&mut self, minute: Minute) -> Vec<StatusChange> {
        let mut changes = Vec::new();
        for id in 0..self.runways.len() {
            let runway = &self.runways[id];
            let next = if runway.in_service() {
                self.closure_at(id, minute).unwrap_or(RunwayStatus::Available)
            } else {
                runway.base_status
            };
            if next != runway.status {
                changes.push(StatusChange { runway: id, from: runway.status, to: next });
                self.runways[id].status = next;
            }
        }
        changes
    }

    /// Free every runway whose operation ends at or before `minute`.
    /// Returns (runway, aircraft) pairs ordered by runway index.
    pub fn release_due(&mut self, minute: Minute) -> Vec<(RunwayId, AircraftId)> {
        let mut released = Vec::new();
        for runway in &mut self.runways {
            if let Some(occ) = runway.occupant {
                if occ.release_at <= minute {
                    runway.occupant = None;
                    released.push((runway.id, occ.aircraft));
                }
            }
        }
        released
    }

    /// Free every runway regardless of release time. Returns the
    /// occupants ordered by (release time, runway index).
    pub fn drain_occupants(&mut self) -> Vec<(RunwayId, Occupancy)> {
        let mut drained: Vec<(RunwayId, Occupancy)> = self
            .runways
            .iter_mut()
            .filter_map(|r| r.occupant.take().map(|occ| (r.id, occ)))
            .collect();
        drained.sort_by_key(|(id, occ)| (occ.release_at, *id));
        drained
    }

    /// Runways that could start `operation` at `minute`: capable, open,
    /// idle. Ascending index.
    pub fn available_for(&self, operation: Operation, minute: Minute) -> Vec<RunwayId> {
        self.runways
            .iter()
            .filter(|r| r.mode.supports(operation) && r.is_idle() && !self.is_closed(r.id, minute))
            .map(|r| r.id)
            .collect()
    }

    /// The runway an assignment should take: the first dedicated runway,
    /// falling back to the first mixed one so mixed capacity stays free
    /// for the other direction.
    pub fn preferred_for(&self, operation: Operation, minute: Minute) -> Option<RunwayId> {
        let available = self.available_for(operation, minute);
        available
            .iter()
            .copied()
            .find(|&id| self.runways[id].mode != RunwayMode::Mixed)
            .or_else(|| available.first().copied())
    }

    /// Occupy `id` for one operation. Returns the release minute.
    pub fn assign(
        &mut self,
        id: RunwayId,
        aircraft: AircraftId,
        operation: Operation,
        minute: Minute,
        service: Minute,
    ) -> SimResult<Minute> {
        let closed = self.is_closed(id, minute);
        let Some(runway) = self.runways.get_mut(id) else {
            return Err(SimError::invariant(minute, format!("runway index {id} does not exist")));
        };
        if !runway.mode.supports(operation) {
            return Err(SimError::invariant(
                minute,
                format!("runway {} ({:?}) cannot handle {operation:?}", runway.number, runway.mode),
            ));
        }
        if closed {
            return Err(SimError::invariant(
                minute,
                format!("runway {} assigned while closed ({:?})", runway.number, runway.status),
            ));
        }
        if let Some(occ) = runway.occupant {
            return Err(SimError::invariant(
                minute,
                format!(
                    "runway {} assigned while busy with aircraft #{} until minute {}",
                    runway.number, occ.aircraft, occ.release_at
                ),
            ));
        }
        let Some(release_at) = minute.checked_add(service) else {
            return Err(SimError::invariant(
                minute,
                format!("runway {} service time {service} overflows the clock", runway.number),
            ));
        };
        runway.occupant = Some(Occupancy { aircraft, operation, started: minute, release_at });
        self.assignments.push(AssignmentRecord {
            runway: id,
            aircraft,
            operation,
            started: minute,
            release_at,
        });
        Ok(release_at)
    }

    pub fn busy_count(&self) -> usize {
        self.runways.iter().filter(|r| !r.is_idle()).count()
    }
}
