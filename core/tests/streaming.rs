//! Streaming runs: snapshot shape, delivery and cancellation.

use runway_sim_core::{
    config::SimConfig,
    engine::SimEngine,
    snapshot::{MessageKind, StreamMessage},
    stream::{self, CancelToken, RunOutcome, SinkStatus, SnapshotSink, StreamOptions},
    SimError,
};
use std::time::Duration;

fn short_config() -> SimConfig {
    SimConfig {
        sim_duration: 20.0,
        inbound_flow: 20.0,
        outbound_flow: 20.0,
        ..SimConfig::default_test()
    }
}

/// Hangs up after accepting `limit` ticks.
struct HangUpAfter {
    limit:    usize,
    received: Vec<StreamMessage>,
}

impl SnapshotSink for HangUpAfter {
    fn offer(&mut self, message: StreamMessage) -> SinkStatus {
        if self.received.len() >= self.limit {
            return SinkStatus::Closed;
        }
        self.received.push(message);
        SinkStatus::Delivered
    }

    fn deliver(&mut self, message: StreamMessage) -> SinkStatus {
        self.received.push(message);
        SinkStatus::Delivered
    }
}

#[test]
fn one_tick_per_minute_then_exactly_one_done() {
    let mut engine = SimEngine::build(short_config()).expect("build");
    let mut sink: Vec<StreamMessage> = Vec::new();
    let outcome = engine.run_streaming(&mut sink, &CancelToken::new()).expect("run");

    assert_eq!(sink.len(), 21);
    for (t, message) in sink[..20].iter().enumerate() {
        assert_eq!(message.kind, MessageKind::Tick);
        assert_eq!(message.sim_time, (t + 1) as f64);
        assert_eq!(message.sim_duration, 20.0);
    }
    let done = sink.last().unwrap();
    assert!(done.is_final());
    assert_eq!(sink.iter().filter(|m| m.is_final()).count(), 1);

    let RunOutcome::Completed(report) = outcome else {
        panic!("expected completion, got {outcome:?}");
    };
    assert_eq!(done.report.total_inbound, report.total_inbound);
    assert_eq!(done.report.landed_aircraft.len(), report.landed_aircraft.len());
}

#[test]
fn wire_messages_carry_type_and_flat_report_fields() {
    let mut engine = SimEngine::build(short_config()).expect("build");
    let mut sink: Vec<StreamMessage> = Vec::new();
    engine.run_streaming(&mut sink, &CancelToken::new()).expect("run");

    let tick = serde_json::to_value(&sink[0]).unwrap();
    assert_eq!(tick["type"], "tick");
    assert_eq!(tick["sim_time"], 1.0);
    assert_eq!(sink[19].sim_time, sink[19].sim_duration);
    for field in [
        "total_departures", "total_cancellations", "max_takeoff_queue_size",
        "avg_takeoff_wait", "total_arrivals", "total_diversions",
        "max_holding_size", "avg_holding_time", "takeoff_queue_over_time",
        "holding_size_over_time", "landed_aircraft", "departed_aircraft",
        "diverted_aircraft", "cancelled_aircraft",
    ] {
        assert!(tick.get(field).is_some(), "tick message missing {field}");
    }

    let done = serde_json::to_value(sink.last().unwrap()).unwrap();
    assert_eq!(done["type"], "done");
    assert_eq!(done["sim_time"], 20.0);
}

#[test]
fn cancellation_before_start_emits_nothing() {
    let mut engine = SimEngine::build(short_config()).expect("build");
    let cancel = CancelToken::new();
    cancel.cancel();

    let mut sink: Vec<StreamMessage> = Vec::new();
    let outcome = engine.run_streaming(&mut sink, &cancel).expect("run");
    assert_eq!(outcome, RunOutcome::Cancelled { minute: 0 });
    assert!(sink.is_empty());
    assert!(!engine.is_complete());
}

#[test]
fn consumer_hang_up_cancels_at_the_next_step() {
    let mut engine = SimEngine::build(short_config()).expect("build");
    let mut sink = HangUpAfter { limit: 5, received: Vec::new() };
    let cancel = CancelToken::new();

    let outcome = engine.run_streaming(&mut sink, &cancel).expect("run");
    // Six steps ran: the sixth snapshot found the consumer gone.
    assert_eq!(outcome, RunOutcome::Cancelled { minute: 6 });
    assert!(cancel.is_cancelled());
    assert_eq!(sink.received.len(), 5);
    assert!(sink.received.iter().all(|m| !m.is_final()));
}

#[test]
fn threaded_run_streams_to_completion() {
    let options = StreamOptions { buffer: 64, tick_delay: Duration::ZERO };
    let handle = stream::spawn_run(short_config(), options).expect("spawn");

    let messages: Vec<StreamMessage> = handle.messages.iter().collect();
    assert_eq!(messages.len(), 21);
    assert!(messages.last().unwrap().is_final());

    match handle.join().expect("join") {
        RunOutcome::Completed(report) => {
            assert_eq!(report.holding_size_over_time.len(), 20);
        }
        other => panic!("expected completion, got {other:?}"),
    }
}

#[test]
fn lagging_consumer_still_gets_the_final_snapshot() {
    let options = StreamOptions { buffer: 1, tick_delay: Duration::ZERO };
    let handle = stream::spawn_run(short_config(), options).expect("spawn");

    std::thread::sleep(Duration::from_millis(200));
    let messages: Vec<StreamMessage> = handle.messages.iter().collect();
    assert!(messages.len() <= 21);
    assert_eq!(messages.iter().filter(|m| m.is_final()).count(), 1);
    assert!(messages.last().unwrap().is_final());
    assert!(matches!(handle.join().expect("join"), RunOutcome::Completed(_)));
}

#[test]
fn closing_a_long_run_cancels_it() {
    let config = SimConfig { sim_duration: 100_000.0, ..short_config() };
    let options = StreamOptions { buffer: 4, tick_delay: Duration::from_millis(2) };
    let handle = stream::spawn_run(config, options).expect("spawn");

    let first = handle.messages.recv().expect("first snapshot");
    assert_eq!(first.sim_time, 1.0);

    match handle.close().expect("close") {
        RunOutcome::Cancelled { minute } => assert!(minute < 100_000),
        other => panic!("expected cancellation, got {other:?}"),
    }
}

#[test]
fn invalid_configuration_is_rejected_before_spawning() {
    let config = SimConfig { runways: vec![], sim_duration: -1.0, ..SimConfig::default_test() };
    let err = stream::spawn_run(config, StreamOptions::default()).err().expect("rejected");
    assert!(err.is_configuration());
    let SimError::Configuration { violations } = err else { unreachable!() };
    assert_eq!(violations.len(), 2, "{violations:?}");
}

#[test]
fn close_codes_match_the_websocket_convention() {
    assert_eq!(stream::ABNORMAL_CLOSURE_CODE, 1011);
    assert_eq!(stream::INVALID_CONFIG_CODE, 1007);
}
