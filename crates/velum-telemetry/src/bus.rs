//! Event dispatch with pluggable sinks.
//!
//! The kernel is single-threaded and synchronous: every pipeline
//! method runs to completion on the calling thread, and nothing emits
//! from anywhere else. So there is no queue between producer and
//! consumer — `emit` hands the event to every registered sink before
//! it returns, and sinks see events in exactly the order the pipeline
//! produced them. There is no flush step to forget.

use crate::events::TrackerEvent;
use crate::sinks::EventSink;

/// Synchronous event dispatcher for kernel telemetry.
///
/// Sinks are registered once by the enclosing tracker; a disabled bus
/// drops events without touching them.
pub struct EventBus {
    /// Registered sinks, invoked in registration order.
    sinks: Vec<Box<dyn EventSink>>,
    /// Whether the bus is active. Disabled bus is a no-op.
    enabled: bool,
}

impl EventBus {
    /// Creates a new event bus with no sinks.
    pub fn new() -> Self {
        Self {
            sinks: Vec::new(),
            enabled: true,
        }
    }

    /// Registers a sink to receive events.
    pub fn add_sink(&mut self, sink: Box<dyn EventSink>) {
        self.sinks.push(sink);
    }

    /// Enables or disables the bus. Disabled bus drops events silently.
    pub fn set_enabled(&mut self, enabled: bool) {
        self.enabled = enabled;
    }

    /// Returns true if the bus is active.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Deliver an event to every registered sink, in order, before
    /// returning. If the bus is disabled, this is a no-op.
    pub fn emit(&mut self, event: TrackerEvent) {
        if !self.enabled {
            return;
        }
        for sink in &mut self.sinks {
            sink.handle(&event);
        }
    }

    /// Tell every sink the run is over (flush files, print summaries).
    pub fn finish(&mut self) {
        for sink in &mut self.sinks {
            sink.finalize();
        }
    }

    /// Returns the number of registered sinks.
    pub fn sink_count(&self) -> usize {
        self.sinks.len()
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}
