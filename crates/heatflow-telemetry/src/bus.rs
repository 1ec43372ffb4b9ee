//! Per-iteration event batching.
//!
//! The driver records events while an iteration runs and hands the batch
//! to the sinks once the iteration is over, so sink work never falls
//! inside the timed region.

use crate::events::SimulationEvent;
use crate::sinks::EventSink;

/// Collects events between flushes and fans each batch out to the sinks.
pub struct EventBus {
    pending: Vec<SimulationEvent>,
    sinks: Vec<Box<dyn EventSink>>,
    delivered: usize,
}

impl EventBus {
    pub fn new() -> Self {
        Self {
            pending: Vec::new(),
            sinks: Vec::new(),
            delivered: 0,
        }
    }

    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        tracing::debug!(sink = sink.name(), "registered telemetry sink");
        self.sinks.push(sink);
    }

    /// Records an event for the next batch.
    pub fn emit(&mut self, event: SimulationEvent) {
        self.pending.push(event);
    }

    /// Events recorded since the last flush.
    pub fn pending(&self) -> usize {
        self.pending.len()
    }

    /// Events handed to the sinks so far.
    pub fn delivered(&self) -> usize {
        self.delivered
    }

    /// Hands the pending batch to every sink in emission order.
    ///
    /// Returns the batch size. An empty batch reaches no sink.
    pub fn flush(&mut self) -> usize {
        if self.pending.is_empty() {
            return 0;
        }
        let batch = std::mem::take(&mut self.pending);
        for sink in &mut self.sinks {
            sink.handle_batch(&batch);
        }
        self.delivered += batch.len();
        batch.len()
    }

    /// Flushes the last batch and finalizes every sink.
    ///
    /// Returns the total number of events delivered over the run.
    pub fn finalize(&mut self) -> usize {
        self.flush();
        for sink in &mut self.sinks {
            sink.finalize();
        }
        self.delivered
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
