//! # velum-collide
//!
//! The collision core of the Velum surface tracker: continuous
//! collision detection between moving mesh elements, proximity
//! handling, impulse-based velocity repair, intersection
//! certification, and the topology pinch operator.
//!
//! ## Pipeline
//!
//! Within one time step the enclosing tracker calls, in order:
//!
//! 1. [`CollisionPipeline::handle_proximities`] — soft repulsion for
//!    near-miss pairs, reducing how many true collisions form.
//! 2. [`CollisionPipeline::handle_collisions`] — iterative CCD
//!    resolution by impulse. A `false` return asks the caller to fall
//!    back to its impact-zone solver, fed by
//!    [`CollisionPipeline::detect_new_collisions`].
//! 3. Topology operations ([`MeshPincher`]), which validate themselves
//!    against the same broad phase and intersection predicates.
//!
//! The pipeline is a non-owning façade: every operation borrows the
//! [`DynamicSurface`], which owns positions, adjacency, and the broad
//! phase.

pub mod ccd;
pub mod collision;
pub mod intersect;
pub mod pincher;
pub mod pipeline;
pub mod proximity;
pub mod surface;

pub use collision::{
    Collision, CollisionCandidate, CollisionKind, CollisionStats, ImpactZone, Intersection,
};
pub use pincher::MeshPincher;
pub use pipeline::{CollisionPipeline, ProcessStatus};
pub use surface::DynamicSurface;
