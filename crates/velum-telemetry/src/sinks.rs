//! Pluggable event sinks.
//!
//! The kernel runs on one thread (the bus dispatches synchronously),
//! so sinks carry no `Send` bound and can share state with the code
//! that registered them through `Rc` — that is how [`TallySink`] hands
//! its counters back to the enclosing tracker while the bus owns the
//! sink itself.

use std::cell::RefCell;
use std::rc::Rc;

use serde::{Deserialize, Serialize};

use crate::events::{EventKind, TrackerEvent};

/// Trait for event consumers.
///
/// Implement this to create custom telemetry outputs.
pub trait EventSink {
    /// Process a single event.
    fn handle(&mut self, event: &TrackerEvent);

    /// Called when the run ends. Flush buffers, close files, etc.
    fn finalize(&mut self) {}

    /// Returns a human-readable name for this sink.
    fn name(&self) -> &str;
}

/// Counters accumulated by a [`TallySink`] over a run.
///
/// One field per thing the collision pipeline reports: proximity-pass
/// volume, collision sweeps and the impulses they spent, overflow and
/// pinch outcomes, and certification results.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct StepTally {
    /// Broad-phase candidates examined by proximity passes.
    pub proximity_candidates: u64,
    /// Repulsion impulses applied.
    pub proximity_impulses: u64,
    /// Collision sweeps completed.
    pub collision_passes: u64,
    /// Collisions resolved by impulse across all sweeps.
    pub collisions_resolved: u64,
    /// Times the update-candidate queue overflowed its cap.
    pub candidate_overflows: u64,
    /// Vertex pinches attempted.
    pub pinches_attempted: u64,
    /// Vertex pinches that survived the collision-safety check.
    pub pinches_committed: u64,
    /// Intersection certification sweeps run.
    pub intersection_checks: u64,
    /// Edge-triangle intersections those sweeps found (should be 0).
    pub intersections_found: u64,
}

/// Aggregates pipeline counters across steps.
///
/// The tally lives behind an `Rc`, so the caller keeps a handle onto
/// the running totals after boxing the sink into the bus.
pub struct TallySink {
    tally: Rc<RefCell<StepTally>>,
}

impl TallySink {
    /// Creates a sink with a zeroed tally.
    pub fn new() -> Self {
        Self {
            tally: Rc::new(RefCell::new(StepTally::default())),
        }
    }

    /// Shared handle onto the accumulated counters.
    pub fn tally(&self) -> Rc<RefCell<StepTally>> {
        Rc::clone(&self.tally)
    }
}

impl Default for TallySink {
    fn default() -> Self {
        Self::new()
    }
}

impl EventSink for TallySink {
    fn handle(&mut self, event: &TrackerEvent) {
        let mut tally = self.tally.borrow_mut();
        match &event.kind {
            EventKind::ProximityPass {
                candidates,
                impulses,
            } => {
                tally.proximity_candidates += *candidates;
                tally.proximity_impulses += *impulses;
            }
            EventKind::CollisionPass { resolved, .. } => {
                tally.collision_passes += 1;
                tally.collisions_resolved += *resolved;
            }
            EventKind::CandidateOverflow { .. } => {
                tally.candidate_overflows += 1;
            }
            EventKind::PinchAttempt { committed, .. } => {
                tally.pinches_attempted += 1;
                if *committed {
                    tally.pinches_committed += 1;
                }
            }
            EventKind::IntersectionCheck { intersections, .. } => {
                tally.intersection_checks += 1;
                tally.intersections_found += *intersections;
            }
        }
    }

    fn name(&self) -> &str {
        "tally_sink"
    }
}

/// Logs events through `tracing`, at severities matching what each
/// event means for the run: routine passes are debug, overflow is a
/// warning, and a failed certification is an error.
pub struct TracingSink;

impl EventSink for TracingSink {
    fn handle(&mut self, event: &TrackerEvent) {
        let step = event.step;
        match &event.kind {
            EventKind::ProximityPass {
                candidates,
                impulses,
            } => {
                tracing::debug!(
                    step,
                    candidates = *candidates,
                    impulses = *impulses,
                    "proximity pass"
                );
            }
            EventKind::CollisionPass {
                pass,
                resolved,
                overflow,
            } => {
                tracing::debug!(
                    step,
                    pass = *pass,
                    resolved = *resolved,
                    overflow = *overflow,
                    "collision pass"
                );
            }
            EventKind::CandidateOverflow { queue_len } => {
                tracing::warn!(step, queue_len = *queue_len, "candidate queue overflow");
            }
            EventKind::PinchAttempt {
                vertex,
                components,
                committed,
            } => {
                tracing::debug!(
                    step,
                    vertex = *vertex,
                    components = *components,
                    committed = *committed,
                    "pinch attempt"
                );
            }
            EventKind::IntersectionCheck {
                intersections,
                predicted,
            } => {
                if *intersections > 0 {
                    tracing::error!(
                        step,
                        intersections = *intersections,
                        predicted = *predicted,
                        "intersection check failed"
                    );
                } else {
                    tracing::trace!(step, predicted = *predicted, "intersection check clean");
                }
            }
        }
    }

    fn name(&self) -> &str {
        "tracing_sink"
    }
}
