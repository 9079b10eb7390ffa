//! Discrete-event simulation of airport runway operations.
//!
//! A run steps a one-minute clock. Each step generates traffic,
//! ages the holding and takeoff queues, and hands free runways to
//! the highest-priority waiting aircraft. `SimEngine` drives one run;
//! `stream::spawn_run` drives one on its own thread and streams
//! snapshots back.

pub mod aircraft;
pub mod assignment_subsystem;
pub mod callsign_generator;
pub mod clock;
pub mod config;
pub mod context;
pub mod engine;
pub mod error;
pub mod event;
pub mod metrics;
pub mod queue;
pub mod queue_subsystem;
pub mod rng;
pub mod runway;
pub mod runway_subsystem;
pub mod snapshot;
pub mod store;
pub mod stream;
pub mod subsystem;
pub mod traffic_subsystem;
pub mod types;

pub use config::SimConfig;
pub use engine::SimEngine;
pub use error::{SimError, SimResult};
pub use metrics::SimReport;
pub use snapshot::StreamMessage;
