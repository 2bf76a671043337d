//! # velum-broad
//!
//! Broad-phase collision culling for the Velum surface tracker.
//!
//! The broad phase answers one question cheaply: which primitives
//! *might* interact with this bounding box? Everything else — exact
//! distances, continuous collision times — is the narrow phase's job.
//!
//! ## Key Types
//!
//! - [`AccelerationGrid`] — a uniform spatial grid mapping element
//!   AABBs to the cells they touch, with incremental add/update/remove
//!   and a deduplicated overlap query.
//! - [`BroadPhaseGrid`] — six acceleration grids, one per
//!   (vertex/edge/triangle) × (solid/dynamic) combination.
//! - [`BroadPhase`] — tagged dispatch over broad-phase backends.

pub mod acceleration_grid;
pub mod broad_phase;

pub use acceleration_grid::AccelerationGrid;
pub use broad_phase::{BroadPhase, BroadPhaseGrid};
