//! Tuning constants and simulation defaults.

/// Default proximity epsilon (world units). Pairs closer than this
/// receive a repulsion impulse before a true collision can form.
pub const PROXIMITY_EPSILON: f64 = 1.0e-4;

/// Default padding added to every bounding box registered with the
/// broad phase.
pub const AABB_PADDING: f64 = 1.0e-4;

/// Spring constant for the proximity repulsion impulse.
pub const REPULSION_STIFFNESS: f64 = 10.0;

/// Scaling applied to the collision-cancelling impulse magnitude.
pub const IMPULSE_MULTIPLIER: f64 = 1.0;

/// Tangential speeds below this threshold are treated as static for
/// friction purposes.
pub const FRICTION_STATIC_TOLERANCE: f64 = 1.0e-8;

/// Hard cap on the collision candidate queue.
pub const MAX_CANDIDATES: usize = 1_000_000;

/// Hard cap on the number of collisions reported by a detection sweep.
pub const MAX_COLLISIONS: usize = 5_000;

/// Pull-apart distance for the mesh pincher, as a multiple of the
/// proximity epsilon.
pub const PULL_APART_FACTOR: f64 = 10.0;

/// Scale-relative threshold below which a geometric determinant is
/// considered degenerate.
pub const DEGENERATE_EPSILON: f64 = 1.0e-10;
