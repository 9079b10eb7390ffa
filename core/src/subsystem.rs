//! Subsystem trait.
//!
//! RULE: Every pipeline stage implements SimSubsystem.
//! The engine calls update() on each registered subsystem
//! in registration order, every minute.
//! Execution order is fixed and documented in engine.rs.

use crate::{
    context::RunContext,
    error::SimResult,
    event::SimEvent,
    rng::SubsystemRng,
    types::Minute,
};

/// The contract every subsystem must fulfill.
pub trait SimSubsystem: Send {
    /// Unique stable name for this subsystem.
    fn name(&self) -> &'static str;

    /// Called once per minute by the engine.
    ///
    /// - `minute`:    the minute being simulated
    /// - `ctx`:       the run's aircraft, runways and queues
    /// - `events_in`: events emitted by earlier subsystems this minute
    /// - `rng`:       this subsystem's deterministic RNG for this minute
    ///
    /// Returns the events describing every change made to `ctx`.
    fn update(
        &mut self,
        minute: Minute,
        ctx: &mut RunContext,
        events_in: &[SimEvent],
        rng: &mut SubsystemRng,
    ) -> SimResult<Vec<SimEvent>>;
}
