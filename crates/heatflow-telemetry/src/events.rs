//! Simulation event types.
//!
//! Structured events emitted by the driver at fixed points of each
//! iteration. Events are lightweight value types that carry just
//! enough data to be useful for monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A simulation event emitted by the driver.
///
/// Events are tagged with an iteration index and carry run data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SimulationEvent {
    /// Iteration number (0-indexed). Run-level events use 0 for
    /// `RunBegin` and the iteration count for `RunEnd`.
    pub iteration: u32,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum EventKind {
    /// Run started, after device buffers were allocated.
    RunBegin {
        width: u32,
        height: u32,
        /// Iterations the run will execute.
        iterations: u32,
        /// Name of the compute backend.
        backend: String,
    },

    /// Iteration started.
    IterationBegin,

    /// Kernel dispatched.
    Dispatch {
        /// Global work-item count.
        work_items: u32,
        /// Effective (clamped) work-group size.
        group_size: u32,
    },

    /// Iteration completed, after decay.
    IterationEnd {
        /// Wall-clock time for the entire iteration (seconds).
        wall_time: f64,
    },

    /// Run completed.
    RunEnd {
        /// Total wall-clock time (seconds).
        wall_time: f64,
        /// Minimum of `current` at the end of the run.
        min_temperature: f64,
        /// Maximum of `current` at the end of the run.
        max_temperature: f64,
    },
}

impl SimulationEvent {
    /// Creates a new event for the given iteration.
    pub fn new(iteration: u32, kind: EventKind) -> Self {
        Self { iteration, kind }
    }

    /// Short stable name of the event kind, for log fields.
    pub fn label(&self) -> &'static str {
        match &self.kind {
            EventKind::RunBegin { .. } => "run_begin",
            EventKind::IterationBegin => "iteration_begin",
            EventKind::Dispatch { .. } => "dispatch",
            EventKind::IterationEnd { .. } => "iteration_end",
            EventKind::RunEnd { .. } => "run_end",
        }
    }
}
