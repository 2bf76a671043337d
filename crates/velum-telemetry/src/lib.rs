//! # velum-telemetry
//!
//! Telemetry for the collision kernel. The pipeline emits structured
//! events (pass summaries, overflow reports, pinch outcomes,
//! certification results) into an [`EventBus`] that dispatches them
//! synchronously to pluggable sinks — the kernel is single-threaded,
//! so there is no queue and no flush step.
//!
//! Built-in sinks: [`TallySink`] aggregates the counters into a
//! [`StepTally`] the enclosing tracker can read at any time, and
//! [`TracingSink`] logs each event at a severity matching its meaning.

pub mod bus;
pub mod events;
pub mod sinks;

pub use bus::EventBus;
pub use events::{EventKind, TrackerEvent};
pub use sinks::{EventSink, StepTally, TallySink, TracingSink};
