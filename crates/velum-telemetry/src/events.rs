//! Tracker event types.
//!
//! Structured events emitted by the collision pipeline at various
//! points in each step. Events are lightweight value types that carry
//! just enough data to be useful for monitoring and debugging.

use serde::{Deserialize, Serialize};

/// A telemetry event emitted by the kernel.
///
/// Events are tagged with a step index and carry domain-specific data.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrackerEvent {
    /// Step number (0-indexed).
    pub step: u64,
    /// Event payload.
    pub kind: EventKind,
}

/// Event payload variants.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum EventKind {
    /// Proximity repulsion pass completed.
    ProximityPass {
        /// Broad-phase candidates examined.
        candidates: u64,
        /// Repulsion impulses applied.
        impulses: u64,
    },

    /// One collision-resolution sweep completed.
    CollisionPass {
        /// Sweep number within the step.
        pass: u32,
        /// Collisions resolved by impulse this sweep.
        resolved: u64,
        /// Whether the candidate queue overflowed.
        overflow: bool,
    },

    /// The update-candidate queue exceeded its hard cap.
    CandidateOverflow {
        /// Queue length at the time of the overflow.
        queue_len: usize,
    },

    /// A vertex pinch was attempted.
    PinchAttempt {
        /// The vertex whose fan was partitioned.
        vertex: usize,
        /// Number of connected components found.
        components: usize,
        /// Whether the pinch survived the collision-safety check.
        committed: bool,
    },

    /// An intersection certification sweep completed.
    IntersectionCheck {
        /// Edge-triangle intersections found (should be zero).
        intersections: u64,
        /// Whether predicted positions were used.
        predicted: bool,
    },
}

impl TrackerEvent {
    /// Creates a new event for the given step.
    pub fn new(step: u64, kind: EventKind) -> Self {
        Self { step, kind }
    }
}
