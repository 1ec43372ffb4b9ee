//! # heatflow-telemetry
//!
//! Simulation telemetry. The driver records structured events (run
//! boundaries, per-iteration dispatch and timing) and flushes them to
//! pluggable sinks once per iteration.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, SimulationEvent};
pub use sinks::{EventSink, TracingSink, VecSink};
