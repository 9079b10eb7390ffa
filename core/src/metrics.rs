//! Metrics aggregator: builds the run report from the event stream.
//!
//! RULE: Statistics come only from events (`AircraftEntered`,
//! `AircraftResolved`) and from the per-step queue samples the engine
//! hands in. Nothing here reads the run context.
//!
//! Wait and delay statistics cover serviced aircraft only: landed for
//! arrivals, departed for takeoffs.

use crate::{
    aircraft::{AircraftLog, Direction, ExitReason, Outcome},
    error::{SimError, SimResult},
    event::SimEvent,
    types::Minute,
};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One `(time, size)` point of a queue-size series.
pub type QueueSample = (f64, usize);

/// Count, incremental mean and maximum of a stream of observations.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RunningStat {
    pub count: u64,
    pub mean:  f64,
    pub max:   f64,
}

impl RunningStat {
    pub fn push(&mut self, value: f64) {
        self.count += 1;
        self.mean += (value - self.mean) / self.count as f64;
        if self.count == 1 || value > self.max {
            self.max = value;
        }
    }
}

/// The run report: streamed as it grows, frozen at completion.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SimReport {
    // Departures
    pub total_departures:        u64,
    pub total_cancellations:     u64,
    pub max_takeoff_queue_size:  usize,
    pub avg_takeoff_wait:        f64,
    pub max_takeoff_wait:        f64,
    pub max_takeoff_delay:       f64,
    pub avg_takeoff_delay:       f64,
    // Arrivals
    pub total_arrivals:          u64,
    pub total_diversions:        u64,
    pub max_holding_size:        usize,
    pub avg_holding_time:        f64,
    pub max_holding_time:        f64,
    pub max_arrival_delay:       f64,
    pub avg_arrival_delay:       f64,
    // Generated traffic
    pub total_inbound:           u64,
    pub total_outbound:          u64,
    /// Diversions and cancellations caused by the run ending, already
    /// included in the totals above.
    pub total_unresolved_at_end: u64,
    // Time series
    pub takeoff_queue_over_time: Vec<QueueSample>,
    pub holding_size_over_time:  Vec<QueueSample>,
    // Per-aircraft logs
    pub landed_aircraft:         Vec<AircraftLog>,
    pub departed_aircraft:       Vec<AircraftLog>,
    pub diverted_aircraft:       Vec<AircraftLog>,
    pub cancelled_aircraft:      Vec<AircraftLog>,
}

impl SimReport {
    pub fn partition(&self, outcome: Outcome) -> &[AircraftLog] {
        match outcome {
            Outcome::Landed => &self.landed_aircraft,
            Outcome::Departed => &self.departed_aircraft,
            Outcome::Diverted => &self.diverted_aircraft,
            Outcome::Cancelled => &self.cancelled_aircraft,
        }
    }

    /// Every resolved aircraft, partition by partition.
    pub fn all_logs(&self) -> impl Iterator<Item = &AircraftLog> {
        self.landed_aircraft
            .iter()
            .chain(&self.departed_aircraft)
            .chain(&self.diverted_aircraft)
            .chain(&self.cancelled_aircraft)
    }

    pub fn resolved_count(&self, direction: Direction) -> u64 {
        self.all_logs().filter(|log| log.direction == direction).count() as u64
    }
}

#[derive(Debug, Default)]
pub struct MetricsAggregator {
    report:         SimReport,
    holding_wait:   RunningStat,
    takeoff_wait:   RunningStat,
    arrival_delay:  RunningStat,
    takeoff_delay:  RunningStat,
}

impl MetricsAggregator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Fold one step's events into the running totals.
    pub fn observe(&mut self, events: &[SimEvent]) {
        for event in events {
            match event {
                SimEvent::AircraftEntered { direction: Direction::Inbound, .. } => {
                    self.report.total_inbound += 1;
                }
                SimEvent::AircraftEntered { direction: Direction::Outbound, .. } => {
                    self.report.total_outbound += 1;
                }
                SimEvent::AircraftResolved { log, .. } => self.record(log.clone()),
                _ => {}
            }
        }
    }

    fn record(&mut self, log: AircraftLog) {
        let r = &mut self.report;
        if log.exit_reason == ExitReason::RunEnded {
            r.total_unresolved_at_end += 1;
        }
        match log.outcome {
            Outcome::Landed => {
                self.holding_wait.push(log.wait_time);
                self.arrival_delay.push(log.delay);
                r.total_arrivals += 1;
                r.landed_aircraft.push(log);
            }
            Outcome::Departed => {
                self.takeoff_wait.push(log.wait_time);
                self.takeoff_delay.push(log.delay);
                r.total_departures += 1;
                r.departed_aircraft.push(log);
            }
            Outcome::Diverted => {
                r.total_diversions += 1;
                r.diverted_aircraft.push(log);
            }
            Outcome::Cancelled => {
                r.total_cancellations += 1;
                r.cancelled_aircraft.push(log);
            }
        }

        r.avg_holding_time = self.holding_wait.mean;
        r.max_holding_time = self.holding_wait.max;
        r.avg_arrival_delay = self.arrival_delay.mean;
        r.max_arrival_delay = self.arrival_delay.max;
        r.avg_takeoff_wait = self.takeoff_wait.mean;
        r.max_takeoff_wait = self.takeoff_wait.max;
        r.avg_takeoff_delay = self.takeoff_delay.mean;
        r.max_takeoff_delay = self.takeoff_delay.max;
    }

    /// Queue sizes after the step covering `minute`.
    pub fn sample(&mut self, minute: Minute, holding: usize, takeoff: usize) {
        let r = &mut self.report;
        r.holding_size_over_time.push((minute as f64, holding));
        r.takeoff_queue_over_time.push((minute as f64, takeoff));
        r.max_holding_size = r.max_holding_size.max(holding);
        r.max_takeoff_queue_size = r.max_takeoff_queue_size.max(takeoff);
    }

    pub fn report(&self) -> &SimReport {
        &self.report
    }

    /// Freeze the report after verifying that every generated aircraft
    /// sits in exactly one partition.
    pub fn finalize(self, minute: Minute) -> SimResult<SimReport> {
        let report = self.report;

        for (direction, generated) in [
            (Direction::Inbound, report.total_inbound),
            (Direction::Outbound, report.total_outbound),
        ] {
            let resolved = report.resolved_count(direction);
            if resolved != generated {
                return Err(SimError::invariant(
                    minute,
                    format!("{generated} {direction:?} aircraft generated but {resolved} resolved"),
                ));
            }
        }

        let mut seen = HashSet::new();
        for log in report.all_logs() {
            if !seen.insert(log.callsign.as_str()) {
                return Err(SimError::invariant(
                    minute,
                    format!("{} appears in more than one log entry", log.callsign),
                ));
            }
        }

        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::aircraft::EmergencyStatus;

    fn entered(direction: Direction) -> SimEvent {
        SimEvent::AircraftEntered {
            minute: 0,
            callsign: "TST0000".into(),
            direction,
            emergency: EmergencyStatus::None,
            fuel: None,
        }
    }

    fn resolved(callsign: &str, direction: Direction, outcome: Outcome, wait: f64) -> SimEvent {
        let exit_reason = match outcome {
            Outcome::Landed | Outcome::Departed => ExitReason::RunwayOperation,
            Outcome::Diverted | Outcome::Cancelled => ExitReason::WaitExpired,
        };
        resolved_with(callsign, direction, outcome, wait, exit_reason)
    }

    fn resolved_with(
        callsign: &str,
        direction: Direction,
        outcome: Outcome,
        wait: f64,
        exit_reason: ExitReason,
    ) -> SimEvent {
        SimEvent::AircraftResolved {
            minute: 10,
            log: AircraftLog {
                callsign:       callsign.into(),
                operator:       "TST".into(),
                origin:         "EGLL".into(),
                destination:    "HERE".into(),
                direction,
                scheduled_time: 0.0,
                entry_time:     0.0,
                exit_time:      Some(10.0),
                wait_time:      wait,
                delay:          wait,
                emergency:      EmergencyStatus::None,
                fuel_at_entry:  0.0,
                outcome,
                exit_reason,
                runway:         None,
            },
        }
    }

    #[test]
    fn running_stat_tracks_mean_and_max() {
        let mut stat = RunningStat::default();
        for v in [4.0, 2.0, 6.0] {
            stat.push(v);
        }
        assert_eq!(stat.count, 3);
        assert!((stat.mean - 4.0).abs() < 1e-12);
        assert_eq!(stat.max, 6.0);
    }

    #[test]
    fn waits_count_serviced_aircraft_only() {
        let mut metrics = MetricsAggregator::new();
        metrics.observe(&[
            entered(Direction::Inbound),
            entered(Direction::Inbound),
            entered(Direction::Inbound),
            resolved("A1", Direction::Inbound, Outcome::Landed, 2.0),
            resolved("A2", Direction::Inbound, Outcome::Landed, 6.0),
            resolved("A3", Direction::Inbound, Outcome::Diverted, 40.0),
        ]);
        let report = metrics.report();
        assert_eq!(report.total_arrivals, 2);
        assert_eq!(report.total_diversions, 1);
        assert_eq!(report.avg_holding_time, 4.0);
        assert_eq!(report.max_holding_time, 6.0);
        assert_eq!(report.max_arrival_delay, 6.0);
    }

    #[test]
    fn run_end_leftovers_are_counted_apart() {
        let mut metrics = MetricsAggregator::new();
        metrics.observe(&[
            entered(Direction::Inbound),
            entered(Direction::Outbound),
            entered(Direction::Outbound),
            resolved("A1", Direction::Inbound, Outcome::Diverted, 30.0),
            resolved_with("D1", Direction::Outbound, Outcome::Cancelled, 4.0, ExitReason::RunEnded),
            resolved_with("D2", Direction::Outbound, Outcome::Cancelled, 2.0, ExitReason::RunEnded),
        ]);
        let report = metrics.finalize(60).unwrap();
        assert_eq!(report.total_diversions, 1);
        assert_eq!(report.total_cancellations, 2);
        assert_eq!(report.total_unresolved_at_end, 2);
    }

    #[test]
    fn samples_feed_series_and_maxima() {
        let mut metrics = MetricsAggregator::new();
        metrics.sample(0, 2, 0);
        metrics.sample(1, 5, 1);
        metrics.sample(2, 3, 4);
        let report = metrics.finalize(3).unwrap();
        assert_eq!(report.holding_size_over_time, vec![(0.0, 2), (1.0, 5), (2.0, 3)]);
        assert_eq!(report.max_holding_size, 5);
        assert_eq!(report.max_takeoff_queue_size, 4);
    }

    #[test]
    fn unresolved_aircraft_fail_conservation() {
        let mut metrics = MetricsAggregator::new();
        metrics.observe(&[
            entered(Direction::Outbound),
            entered(Direction::Outbound),
            resolved("D1", Direction::Outbound, Outcome::Departed, 1.0),
        ]);
        let err = metrics.finalize(60).unwrap_err();
        assert!(matches!(err, SimError::InvariantViolation { minute: 60, .. }));
    }

    #[test]
    fn duplicate_callsign_fails_finalize() {
        let mut metrics = MetricsAggregator::new();
        metrics.observe(&[
            entered(Direction::Outbound),
            entered(Direction::Outbound),
            resolved("D1", Direction::Outbound, Outcome::Departed, 1.0),
            resolved("D1", Direction::Outbound, Outcome::Cancelled, 30.0),
        ]);
        assert!(metrics.finalize(60).is_err());
    }

    #[test]
    fn report_serializes_series_as_pairs() {
        let mut metrics = MetricsAggregator::new();
        metrics.sample(0, 1, 2);
        let json = serde_json::to_value(metrics.report()).unwrap();
        assert_eq!(json["holding_size_over_time"], serde_json::json!([[0.0, 1]]));
        assert_eq!(json["total_arrivals"], 0);
    }
}
