//! Pluggable event sinks.
//!
//! Sinks consume events from the bus and process them
//! (log through `tracing`, capture in memory for inspection).

use std::sync::{Arc, Mutex, MutexGuard};

use crate::events::{EventKind, SimulationEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink: Send {
    /// Process a single event.
    fn handle(&mut self, event: &SimulationEvent);

    /// Process one flushed batch. Defaults to `handle` per event.
    fn handle_batch(&mut self, events: &[SimulationEvent]) {
        for event in events {
            self.handle(event);
        }
    }

    /// Called when the run ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// A sink that collects events into a shared `Vec`.
///
/// Clones share storage, so a test can keep one clone and register
/// the other with a bus, then inspect what was delivered.
#[derive(Clone, Default)]
pub struct VecSink {
    events: Arc<Mutex<Vec<SimulationEvent>>>,
}

impl VecSink {
    /// Creates an empty vec sink.
    pub fn new() -> Self {
        Self::default()
    }

    /// Locks and returns the collected events.
    pub fn events(&self) -> MutexGuard<'_, Vec<SimulationEvent>> {
        // A poisoned lock still holds valid events.
        self.events.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Number of collected events.
    pub fn len(&self) -> usize {
        self.events().len()
    }

    pub fn is_empty(&self) -> bool {
        self.events().is_empty()
    }
}

impl EventSink for VecSink {
    fn handle(&mut self, event: &SimulationEvent) {
        self.events().push(event.clone());
    }

    fn handle_batch(&mut self, events: &[SimulationEvent]) {
        self.events().extend_from_slice(events);
    }

    fn name(&self) -> &str {
        "vec_sink"
    }
}

/// A sink that logs events using the `tracing` crate.
///
/// Per-iteration events go out at `DEBUG`, run boundaries at `INFO`.
#[derive(Debug, Default)]
pub struct TracingSink;

impl TracingSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for TracingSink {
    fn handle(&mut self, event: &SimulationEvent) {
        match &event.kind {
            EventKind::RunBegin { .. } | EventKind::RunEnd { .. } => tracing::info!(
                iteration = event.iteration,
                event = ?event.kind,
                "simulation_event"
            ),
            _ => tracing::debug!(
                iteration = event.iteration,
                event = ?event.kind,
                "simulation_event"
            ),
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
