//! Shared primitive types used across the entire simulation.

/// A simulation minute. One clock step = one simulated minute.
pub type Minute = u64;

/// Index of an aircraft in the run's aircraft table.
pub type AircraftId = usize;

/// Index of a runway in the configured runway list.
pub type RunwayId = usize;

/// The canonical run identifier.
pub type RunId = String;
