//! # velum-math
//!
//! Linear algebra primitives for the Velum collision kernel.
//!
//! Provides:
//! - Re-exports of `glam` double-precision types (`DVec3`, `DMat3`, …)
//! - The [`Aabb`] axis-aligned bounding box used throughout the broad phase
//!
//! The kernel is double-precision end to end: the intersection-free
//! certification has no slack for single-precision drift.

pub mod aabb;

// Re-export glam types as the canonical math types for Velum.
pub use glam::{DMat3, DVec2, DVec3};

pub use aabb::Aabb;

/// Canonical 3-D vector type.
pub type Vec3 = DVec3;
