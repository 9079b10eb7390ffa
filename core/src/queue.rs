//! Holding and takeoff queues.
//!
//! A queue is a plain Vec of aircraft ids re-sorted every step with
//! `priority_cmp`. Emergency state changes minute to minute, so the
//! order is recomputed rather than maintained in a keyed heap.

use crate::{
    aircraft::{Aircraft, Direction},
    types::AircraftId,
};
use std::cmp::Ordering;

/// Service order between two waiting aircraft.
///
/// 1. Active emergencies first, by severity (fuel, mechanical, passenger-health).
/// 2. Earlier queue entry.
/// 3. Earlier schedule.
/// 4. Inbound before outbound (only matters across queues).
/// 5. Generation order.
pub fn priority_cmp(a: &Aircraft, b: &Aircraft) -> Ordering {
    b.emergency
        .severity()
        .cmp(&a.emergency.severity())
        .then_with(|| a.entry.cmp(&b.entry))
        .then_with(|| a.scheduled.cmp(&b.scheduled))
        .then_with(|| direction_rank(a.direction).cmp(&direction_rank(b.direction)))
        .then_with(|| a.id.cmp(&b.id))
}

fn direction_rank(direction: Direction) -> u8 {
    match direction {
        Direction::Inbound => 0,
        Direction::Outbound => 1,
    }
}

#[derive(Debug, Clone)]
pub struct WaitingQueue {
    direction: Direction,
    members:   Vec<AircraftId>,
}

impl WaitingQueue {
    pub fn new(direction: Direction) -> Self {
        Self { direction, members: Vec::new() }
    }

    /// Inbound aircraft waiting to land.
    pub fn holding() -> Self {
        Self::new(Direction::Inbound)
    }

    /// Outbound aircraft waiting to take off.
    pub fn takeoff() -> Self {
        Self::new(Direction::Outbound)
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn len(&self) -> usize {
        self.members.len()
    }

    pub fn is_empty(&self) -> bool {
        self.members.is_empty()
    }

    pub fn members(&self) -> &[AircraftId] {
        &self.members
    }

    pub fn contains(&self, id: AircraftId) -> bool {
        self.members.contains(&id)
    }

    /// Add at the tail. False if already queued.
    pub fn admit(&mut self, id: AircraftId) -> bool {
        if self.contains(id) {
            return false;
        }
        self.members.push(id);
        true
    }

    /// False if the aircraft was not queued.
    pub fn remove(&mut self, id: AircraftId) -> bool {
        match self.members.iter().position(|&m| m == id) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Re-sort into service order using the aircraft table.
    pub fn reorder(&mut self, aircraft: &[Aircraft]) {
        self.members.sort_by(|&a, &b| priority_cmp(&aircraft[a], &aircraft[b]));
    }

    /// Next aircraft to be served, as of the last reorder.
    pub fn head(&self) -> Option<AircraftId> {
        self.members.first().copied()
    }
}
