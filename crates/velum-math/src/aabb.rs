//! Axis-aligned bounding boxes.
//!
//! An [`Aabb`] is the pair (low, high) with `low <= high` componentwise.
//! Static element boxes are the min/max of the element's vertices plus
//! padding; continuous boxes additionally span the predicted positions.

use serde::{Deserialize, Serialize};

use crate::Vec3;

/// Axis-aligned bounding box.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Aabb {
    /// Componentwise minimum corner.
    pub low: Vec3,
    /// Componentwise maximum corner.
    pub high: Vec3,
}

impl Aabb {
    /// Box spanning exactly one point.
    #[inline]
    pub fn point(p: Vec3) -> Self {
        Self { low: p, high: p }
    }

    /// Smallest box containing all the given points.
    ///
    /// Returns a degenerate box at the origin for an empty slice.
    pub fn from_points(points: &[Vec3]) -> Self {
        let mut low = Vec3::splat(f64::INFINITY);
        let mut high = Vec3::splat(f64::NEG_INFINITY);
        for p in points {
            low = low.min(*p);
            high = high.max(*p);
        }
        if points.is_empty() {
            low = Vec3::ZERO;
            high = Vec3::ZERO;
        }
        Self { low, high }
    }

    /// Smallest box containing both `self` and `other`.
    #[inline]
    pub fn union(&self, other: &Aabb) -> Self {
        Self {
            low: self.low.min(other.low),
            high: self.high.max(other.high),
        }
    }

    /// Grow the box by `p` in every direction.
    #[inline]
    pub fn padded(&self, p: f64) -> Self {
        Self {
            low: self.low - Vec3::splat(p),
            high: self.high + Vec3::splat(p),
        }
    }

    /// True if the two boxes overlap (touching counts).
    #[inline]
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.low.x <= other.high.x
            && self.high.x >= other.low.x
            && self.low.y <= other.high.y
            && self.high.y >= other.low.y
            && self.low.z <= other.high.z
            && self.high.z >= other.low.z
    }

    /// True if the point lies inside the box (boundary counts).
    #[inline]
    pub fn contains(&self, p: Vec3) -> bool {
        p.x >= self.low.x
            && p.x <= self.high.x
            && p.y >= self.low.y
            && p.y <= self.high.y
            && p.z >= self.low.z
            && p.z <= self.high.z
    }

    /// Edge lengths of the box.
    #[inline]
    pub fn extents(&self) -> Vec3 {
        self.high - self.low
    }
}
