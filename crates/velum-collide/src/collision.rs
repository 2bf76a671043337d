//! Collision records, candidates, and pipeline statistics.
//!
//! A [`Collision`] is transient: created during a detection sweep,
//! consumed by an impulse application or handed to the impact-zone
//! solver, then discarded. There is no persistent collision database.

use serde::{Deserialize, Serialize};
use velum_math::Vec3;

/// The two continuous collision varieties the kernel resolves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum CollisionKind {
    /// A vertex sweeping against a moving triangle.
    PointTriangle,
    /// Two moving edges crossing.
    EdgeEdge,
}

/// A broad-phase candidate awaiting a narrow-phase test.
///
/// For `PointTriangle`, `a` is the triangle index and `b` the vertex
/// index; for `EdgeEdge`, `a` and `b` are the two edge indices. The
/// derived ordering is lexicographic on `(a, b, kind)`, which is the
/// order the pipeline sorts by before deduplicating the update queue.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct CollisionCandidate {
    /// Triangle index (point-triangle) or first edge index (edge-edge).
    pub a: usize,
    /// Vertex index (point-triangle) or second edge index (edge-edge).
    pub b: usize,
    /// Which narrow-phase test to run.
    pub kind: CollisionKind,
}

/// A detected continuous collision.
///
/// For `PointTriangle` the vertices are `[point, t0, t1, t2]` with
/// barycentric weights `[1, u, v, w]`, `u + v + w = 1`; the impulse
/// signs are `+, -, -, -`. For `EdgeEdge` the vertices are
/// `[a0, a1, b0, b1]` with weights `[s, 1-s, t, 1-t]` and impulse signs
/// `+, +, -, -`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Collision {
    /// Collision variety.
    pub kind: CollisionKind,
    /// The four vertex indices involved.
    pub vertices: [usize; 4],
    /// Unit collision normal. Points toward the first primitive: for
    /// point-triangle the point is on the positive side at t = 0; for
    /// edge-edge the normal runs from edge B toward edge A.
    pub normal: Vec3,
    /// Barycentric weights, unsigned (signs are applied per kind at
    /// impulse time).
    pub barycentric: [f64; 4],
    /// Relative displacement along the normal over the step interval.
    pub relative_displacement: f64,
}

impl Collision {
    /// Signed barycentric weights as used by the impulse application.
    pub fn signed_alphas(&self) -> [f64; 4] {
        let [b0, b1, b2, b3] = self.barycentric;
        match self.kind {
            CollisionKind::PointTriangle => [b0, -b1, -b2, -b3],
            CollisionKind::EdgeEdge => [b0, b1, -b2, -b3],
        }
    }

    /// True if the two collisions touch at least one common vertex.
    pub fn shares_vertex(&self, other: &Collision) -> bool {
        self.vertices
            .iter()
            .any(|v| other.vertices.contains(v))
    }
}

/// A set of collisions connected by shared vertices, handed to the
/// external impact-zone solver.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ImpactZone {
    /// The member collisions.
    pub collisions: Vec<Collision>,
}

impl ImpactZone {
    /// All distinct vertex indices touched by the zone.
    pub fn vertices(&self) -> Vec<usize> {
        let mut out = Vec::new();
        for collision in &self.collisions {
            for &v in &collision.vertices {
                if !out.contains(&v) {
                    out.push(v);
                }
            }
        }
        out
    }
}

/// A static edge-triangle intersection found by certification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Intersection {
    /// The offending edge.
    pub edge_index: usize,
    /// The triangle it pierces.
    pub triangle_index: usize,
}

/// Counters aggregated across one pipeline invocation.
///
/// Owned by the pipeline and reset at the top of each resolution call —
/// no process-wide statistics.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct CollisionStats {
    /// Narrow-phase continuous tests actually run.
    pub ccd_tests: u64,
    /// Candidates discarded before the narrow phase (shared vertices,
    /// solid-solid pairs, vacated slots).
    pub culled_candidates: u64,
    /// Configurations the predicates classified as degenerate.
    pub degenerate_cases: u64,
    /// Repulsion impulses applied by the proximity pass.
    pub proximity_impulses: u64,
    /// Collision-cancelling impulses applied by the CCD pass.
    pub collision_impulses: u64,
}

impl CollisionStats {
    /// Zero all counters.
    pub fn reset(&mut self) {
        *self = Self::default();
    }
}
