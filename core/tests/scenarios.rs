//! End-to-end scenarios with known outcomes.
//!
//! Each test builds a full engine from a hand-written configuration,
//! runs it to completion and checks the report.

use runway_sim_core::{
    aircraft::{Direction, ExitReason, Outcome},
    config::{EngineTuning, RunwayClosure, RunwayConfig, RunwayMode, RunwayStatus, SimConfig},
    engine::SimEngine,
    SimReport,
};

fn run(config: SimConfig) -> SimReport {
    let mut engine = SimEngine::build(config).expect("build engine");
    engine.run().expect("run to completion")
}

/// One mixed runway and no traffic: nothing happens, but every minute
/// is still sampled.
#[test]
fn idle_airport_reports_zeroes() {
    let report = run(SimConfig {
        runways: vec![RunwayConfig::new("18", RunwayMode::Mixed)],
        inbound_flow: 0.0,
        outbound_flow: 0.0,
        sim_duration: 10.0,
        ..SimConfig::default_test()
    });

    assert_eq!(report.total_inbound, 0);
    assert_eq!(report.total_outbound, 0);
    assert_eq!(report.total_arrivals + report.total_departures, 0);
    assert_eq!(report.total_diversions + report.total_cancellations, 0);
    assert_eq!(report.all_logs().count(), 0);
    assert_eq!(report.avg_holding_time, 0.0);
    assert_eq!(report.max_takeoff_delay, 0.0);

    let expected: Vec<(f64, usize)> = (0..10).map(|t| (t as f64, 0)).collect();
    assert_eq!(report.holding_size_over_time, expected);
    assert_eq!(report.takeoff_queue_over_time, expected);
}

/// The only landing runway is closed for the whole run: nobody lands.
#[test]
fn closed_landing_runway_diverts_every_arrival() {
    let report = run(SimConfig {
        runways: vec![RunwayConfig::new("09", RunwayMode::Landing)],
        inbound_flow: 30.0,
        outbound_flow: 0.0,
        sim_duration: 60.0,
        closures: vec![RunwayClosure {
            runway_index: 0,
            start_time: 0.0,
            end_time: 60.0,
            reason: RunwayStatus::Snow,
        }],
        seed: Some(11),
        ..SimConfig::default_test()
    });

    assert!(report.total_inbound > 0, "expected some arrivals in an hour at 30/h");
    assert_eq!(report.total_arrivals, 0);
    assert!(report.landed_aircraft.is_empty());
    assert_eq!(report.total_diversions, report.total_inbound);
    assert!(report.diverted_aircraft.iter().all(|log| log.runway.is_none()));
}

/// Dedicated runways, light traffic and a generous wait limit: nobody
/// times out, and everyone not still busy at the end is serviced.
#[test]
fn light_traffic_on_dedicated_runways_never_expires() {
    let report = run(SimConfig {
        inbound_flow: 6.0,
        outbound_flow: 6.0,
        max_wait_time: 1000.0,
        sim_duration: 120.0,
        seed: Some(5),
        tuning: EngineTuning::without_emergencies(),
        ..SimConfig::default_test()
    });

    assert!(report.total_inbound + report.total_outbound > 0);
    assert!(report.total_arrivals > 0);
    assert!(report.total_departures > 0);
    assert_eq!(report.total_unresolved_at_end, report.total_diversions + report.total_cancellations);

    for log in report.all_logs() {
        assert_ne!(log.exit_reason, ExitReason::WaitExpired, "{} expired", log.callsign);
        match log.outcome {
            Outcome::Landed | Outcome::Departed => {
                assert_eq!(log.exit_reason, ExitReason::RunwayOperation);
                assert!(log.runway.is_some());
            }
            Outcome::Diverted | Outcome::Cancelled => {
                assert_eq!(log.exit_reason, ExitReason::RunEnded, "{} left early", log.callsign);
                assert_eq!(log.exit_time, Some(120.0));
            }
        }
    }
}

/// No runway can ever launch an aircraft: departures cancel on entry.
#[test]
fn departures_without_takeoff_runway_cancel_immediately() {
    let report = run(SimConfig {
        runways: vec![RunwayConfig::new("09", RunwayMode::Landing)],
        inbound_flow: 0.0,
        outbound_flow: 30.0,
        seed: Some(3),
        ..SimConfig::default_test()
    });

    assert!(report.total_outbound > 0);
    assert_eq!(report.total_departures, 0);
    assert_eq!(report.total_cancellations, report.total_outbound);
    for log in &report.cancelled_aircraft {
        assert_eq!(log.exit_reason, ExitReason::NoCapableRunway);
        assert_eq!(log.wait_time, 0.0);
        assert_eq!(log.exit_time, Some(log.entry_time));
    }
    assert_eq!(report.max_takeoff_queue_size, 0);
}

/// A runway configured out of service is never used.
#[test]
fn out_of_service_runway_is_ignored() {
    let mut broken = RunwayConfig::new("27", RunwayMode::Takeoff);
    broken.status = RunwayStatus::EquipmentFailure;
    let report = run(SimConfig {
        runways: vec![RunwayConfig::new("09", RunwayMode::Mixed), broken],
        inbound_flow: 10.0,
        outbound_flow: 10.0,
        seed: Some(8),
        ..SimConfig::default_test()
    });

    assert!(report.all_logs().all(|log| log.runway.as_deref() != Some("27")));
    assert!(report.total_departures > 0);
}

/// Saturated single runway: the queue grows and some aircraft time out.
#[test]
fn saturated_mixed_runway_diverts_and_cancels() {
    let report = run(SimConfig {
        runways: vec![RunwayConfig::new("18", RunwayMode::Mixed)],
        inbound_flow: 40.0,
        outbound_flow: 40.0,
        max_wait_time: 20.0,
        sim_duration: 180.0,
        seed: Some(21),
        ..SimConfig::default_test()
    });

    assert!(report.total_diversions + report.total_cancellations > 0);
    assert!(report.max_holding_size + report.max_takeoff_queue_size > 2);
    let expired = report
        .all_logs()
        .filter(|log| log.exit_reason == ExitReason::WaitExpired)
        .count();
    assert!(expired > 0);
    for log in report.all_logs().filter(|log| log.exit_reason == ExitReason::WaitExpired) {
        assert!(log.wait_time > 20.0);
        let expected = match log.direction {
            Direction::Inbound => Outcome::Diverted,
            Direction::Outbound => Outcome::Cancelled,
        };
        assert_eq!(log.outcome, expected);
    }
}
