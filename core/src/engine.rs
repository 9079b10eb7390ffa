//! The simulation engine: one run of the airport, minute by minute.
//!
//! EXECUTION ORDER (fixed, documented, never reordered):
//!   1. Runway subsystem      closures on/off, finished operations released
//!   2. Inbound traffic       new arrivals into holding
//!   3. Outbound traffic      new departures into the takeoff queue
//!   4. Queue subsystem       fuel burn, expiry, diversion
//!   5. Assignment subsystem  queue heads onto free runways
//!
//! RULES:
//!   - Subsystems execute in registration order, every minute.
//!   - All run state lives in the RunContext the engine owns.
//!   - All randomness flows through the RngBank.
//!   - All state changes are recorded in the event log.
//!   - Invariants are verified after every step; a violation ends the run.

use crate::{
    aircraft::{Direction, ExitReason},
    assignment_subsystem::AssignmentSubsystem,
    clock::SimClock,
    config::SimConfig,
    context::RunContext,
    error::{SimError, SimResult},
    event::{EventLogEntry, SimEvent},
    metrics::{MetricsAggregator, SimReport},
    queue_subsystem::QueueSubsystem,
    rng::{RngBank, SubsystemSlot},
    runway_subsystem::RunwaySubsystem,
    snapshot::{SimSnapshot, StreamMessage, SNAPSHOT_INTERVAL},
    store::SimStore,
    stream::{CancelToken, RunOutcome, SinkStatus, SnapshotSink},
    subsystem::SimSubsystem,
    traffic_subsystem::TrafficSubsystem,
    types::{Minute, RunId},
};

const ENGINE: &str = "engine";

pub struct SimEngine {
    pub run_id:   RunId,
    pub clock:    SimClock,
    pub rng_bank: RngBank,
    seed:         u64,
    ctx:          RunContext,
    subsystems:   Vec<(SubsystemSlot, Box<dyn SimSubsystem>)>,
    metrics:      MetricsAggregator,
    store:        SimStore,
    initialized:  bool,
    final_report: Option<SimReport>,
}

impl SimEngine {
    /// Validate `config` and create an engine with no subsystems.
    /// Nothing is created when the configuration is rejected.
    pub fn new(run_id: RunId, config: SimConfig, store: SimStore) -> SimResult<Self> {
        config.validate()?;
        let seed = match config.seed {
            Some(seed) => seed,
            None => {
                let seed = rand::random::<u64>();
                log::info!("run {run_id}: no seed configured, drew {seed}");
                seed
            }
        };

        store.migrate()?;
        store.insert_run(&run_id, seed, &serde_json::to_string(&config)?)?;

        let duration = config.duration_minutes();
        Ok(Self {
            clock:        SimClock::new(run_id.clone(), duration),
            rng_bank:     RngBank::new(seed),
            seed,
            ctx:          RunContext::new(config),
            subsystems:   Vec::new(),
            metrics:      MetricsAggregator::new(),
            store,
            initialized:  false,
            final_report: None,
            run_id,
        })
    }

    /// Fully wired engine on a fresh in-memory store.
    pub fn build(config: SimConfig) -> SimResult<Self> {
        Self::build_with_store(new_run_id(), config, SimStore::in_memory()?)
    }

    /// Fully wired engine with all subsystems registered.
    /// Call this instead of new() + manual register() calls.
    pub fn build_with_store(run_id: RunId, config: SimConfig, store: SimStore) -> SimResult<Self> {
        let mut engine = SimEngine::new(run_id, config, store)?;

        // EXECUTION ORDER: fixed, documented, never reordered.
        engine.register(SubsystemSlot::Runway, Box::new(RunwaySubsystem::new()));
        let inbound = TrafficSubsystem::inbound(&engine.ctx);
        engine.register(SubsystemSlot::InboundTraffic, Box::new(inbound));
        let outbound = TrafficSubsystem::outbound(&engine.ctx);
        engine.register(SubsystemSlot::OutboundTraffic, Box::new(outbound));
        engine.register(SubsystemSlot::Queue, Box::new(QueueSubsystem::new()));
        engine.register(SubsystemSlot::Assignment, Box::new(AssignmentSubsystem::new()));

        log::info!(
            "run {}: {} runways, {} minutes, seed {}",
            engine.run_id,
            engine.ctx.runways.len(),
            engine.clock.duration,
            engine.seed
        );
        Ok(engine)
    }

    /// Register a subsystem. Call in the documented execution order.
    pub fn register(&mut self, slot: SubsystemSlot, subsystem: Box<dyn SimSubsystem>) {
        self.subsystems.push((slot, subsystem));
    }

    /// Advance one minute. Returns the snapshot observers see for it.
    pub fn step(&mut self) -> SimResult<StreamMessage> {
        if self.clock.is_terminal() {
            return Err(SimError::RunComplete { minute: self.clock.current_minute });
        }
        self.initialize()?;

        let minute = self.clock.advance();
        let mut step_events = vec![SimEvent::StepStarted { minute }];

        // Each subsystem sees all events emitted so far this minute.
        for (slot, subsystem) in &mut self.subsystems {
            let mut rng = self.rng_bank.for_subsystem_at_tick(*slot, minute);
            let new_events = subsystem.update(minute, &mut self.ctx, &step_events, &mut rng)?;
            for event in &new_events {
                persist(&self.store, &self.run_id, minute, subsystem.name(), event)?;
            }
            step_events.extend(new_events);
        }

        self.ctx.verify_invariants(minute)?;

        let holding = self.ctx.holding.len();
        let takeoff = self.ctx.takeoff.len();
        let completed = SimEvent::StepCompleted { minute, holding, takeoff };
        persist(&self.store, &self.run_id, minute, ENGINE, &completed)?;
        step_events.push(completed);

        self.metrics.observe(&step_events);
        self.metrics.sample(minute, holding, takeoff);

        if minute % SNAPSHOT_INTERVAL == 0 {
            self.take_snapshot(minute)?;
        }

        log::debug!("minute={minute} engine: holding={holding} takeoff={takeoff}");
        // Observers see elapsed time; the series keep the step's own minute.
        let elapsed = self.clock.current_minute;
        Ok(StreamMessage::tick(elapsed, self.clock.duration, self.metrics.report().clone()))
    }

    /// Resolve everything still active and freeze the report.
    /// Operations in progress complete at their release minute; aircraft
    /// still queued leave with `run_ended` at the final minute.
    /// Idempotent once the report is frozen.
    pub fn finish(&mut self) -> SimResult<SimReport> {
        if let Some(report) = &self.final_report {
            return Ok(report.clone());
        }
        if !self.clock.is_terminal() {
            return Err(SimError::invariant(
                self.clock.current_minute,
                format!("finish() called with {} minutes left", self.clock.remaining()),
            ));
        }
        self.initialize()?;

        let end = self.clock.duration;
        let mut events = Vec::new();
        for (_, occupancy) in self.ctx.runways.drain_occupants() {
            events.push(self.ctx.complete(occupancy.aircraft, occupancy.release_at)?);
        }
        for direction in [Direction::Inbound, Direction::Outbound] {
            let waiting = self.ctx.queue(direction).members().to_vec();
            for id in waiting {
                events.push(self.ctx.resolve_waiting(id, end, ExitReason::RunEnded)?);
            }
        }
        for event in &events {
            persist(&self.store, &self.run_id, end, ENGINE, event)?;
        }
        self.ctx.verify_invariants(end)?;
        self.metrics.observe(&events);

        let report = std::mem::take(&mut self.metrics).finalize(end)?;
        self.store.save_report(&self.run_id, &report)?;
        log::info!(
            "run {}: complete: landed={} departed={} diverted={} cancelled={}",
            self.run_id,
            report.total_arrivals,
            report.total_departures,
            report.total_diversions,
            report.total_cancellations
        );
        self.final_report = Some(report.clone());
        Ok(report)
    }

    /// One-shot run: step to the end and return the final report.
    pub fn run(&mut self) -> SimResult<SimReport> {
        while !self.clock.is_terminal() {
            self.step()?;
        }
        self.finish()
    }

    /// Step to the end, offering every snapshot to `sink` and delivering
    /// the final one. Cancellation is honoured before each step; once it
    /// is seen nothing further is emitted.
    pub fn run_streaming(
        &mut self,
        sink: &mut dyn SnapshotSink,
        cancel: &CancelToken,
    ) -> SimResult<RunOutcome> {
        loop {
            if cancel.is_cancelled() {
                let minute = self.clock.current_minute;
                log::info!("minute={minute} engine: run {} cancelled", self.run_id);
                return Ok(RunOutcome::Cancelled { minute });
            }
            if self.clock.is_terminal() {
                break;
            }
            let message = self.step()?;
            if sink.offer(message) == SinkStatus::Closed {
                // Nobody is listening any more.
                cancel.cancel();
            }
        }

        let report = self.finish()?;
        let done = StreamMessage::done(self.clock.duration, report.clone());
        if sink.deliver(done) == SinkStatus::Closed {
            log::warn!("run {}: consumer gone before the final snapshot", self.run_id);
        }
        Ok(RunOutcome::Completed(report))
    }

    /// Query events for a specific minute from the store.
    /// Used by the determinism test and replay tooling.
    pub fn store_events_for_tick(&self, run_id: &str, minute: Minute) -> SimResult<Vec<EventLogEntry>> {
        self.store.events_for_tick(run_id, minute)
    }

    pub fn store(&self) -> &SimStore {
        &self.store
    }

    /// The final report once frozen, the running one before.
    pub fn report(&self) -> &SimReport {
        self.final_report.as_ref().unwrap_or_else(|| self.metrics.report())
    }

    pub fn context(&self) -> &RunContext {
        &self.ctx
    }

    pub fn config(&self) -> &SimConfig {
        &self.ctx.config
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    pub fn is_complete(&self) -> bool {
        self.final_report.is_some()
    }

    /// Emit RunInitialized once so seed differences are observable.
    fn initialize(&mut self) -> SimResult<()> {
        if self.initialized {
            return Ok(());
        }
        let event = SimEvent::RunInitialized { run_id: self.run_id.clone(), seed: self.seed };
        persist(&self.store, &self.run_id, 0, ENGINE, &event)?;
        self.initialized = true;
        Ok(())
    }

    fn take_snapshot(&self, minute: Minute) -> SimResult<()> {
        let snapshot = SimSnapshot {
            run_id: self.run_id.clone(),
            minute,
            clock:  self.clock.clone(),
            report: self.metrics.report().clone(),
        };
        let json = serde_json::to_string(&snapshot)?;
        self.store.save_snapshot(&self.run_id, minute, &json)?;
        log::debug!("minute={minute} engine: snapshot saved");
        Ok(())
    }
}

/// Fresh run id: a v4 UUID.
pub fn new_run_id() -> RunId {
    uuid::Uuid::new_v4().to_string()
}

fn persist(
    store: &SimStore,
    run_id: &RunId,
    minute: Minute,
    subsystem: &str,
    event: &SimEvent,
) -> SimResult<()> {
    store.append_event(&EventLogEntry {
        id:         None,
        run_id:     run_id.clone(),
        tick:       minute,
        subsystem:  subsystem.to_string(),
        event_type: event.type_name().to_string(),
        payload:    serde_json::to_string(event)?,
    })
}
