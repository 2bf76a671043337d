//! # velum-mesh
//!
//! Triangle-surface connectivity for the Velum collision kernel.
//!
//! ## Key Types
//!
//! - [`SurfaceMesh`] — non-destructive triangle connectivity with live
//!   adjacency tables (vertex↔triangle, vertex↔edge, edge↔triangle,
//!   triangle↔edge), maintained incrementally across add/remove.
//! - Procedural generators for test fixtures (flat sheets, facing
//!   triangle pairs, double cones).
//!
//! Removing a primitive vacates its slot rather than compacting the
//! arrays, so indices held elsewhere (the broad phase, collision
//! records) stay stable. Vacated triangle slots read `[0, 0, 0]` and
//! vacated edge slots `[0, 0]`; all sweeps skip them.

pub mod generators;
pub mod mesh;

pub use mesh::SurfaceMesh;
