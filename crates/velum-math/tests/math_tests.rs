//! Integration tests for velum-math.

use velum_math::{Aabb, Vec3};

// ─── Aabb Construction ────────────────────────────────────────

#[test]
fn aabb_from_points_spans_all() {
    let aabb = Aabb::from_points(&[
        Vec3::new(1.0, -2.0, 3.0),
        Vec3::new(-1.0, 4.0, 0.5),
        Vec3::new(0.0, 0.0, 0.0),
    ]);
    assert_eq!(aabb.low, Vec3::new(-1.0, -2.0, 0.0));
    assert_eq!(aabb.high, Vec3::new(1.0, 4.0, 3.0));
}

#[test]
fn aabb_point_is_degenerate() {
    let p = Vec3::new(2.0, 3.0, 4.0);
    let aabb = Aabb::point(p);
    assert_eq!(aabb.low, p);
    assert_eq!(aabb.high, p);
    assert_eq!(aabb.extents(), Vec3::ZERO);
}

// ─── Union and Padding ────────────────────────────────────────

#[test]
fn aabb_union_contains_both() {
    let a = Aabb::from_points(&[Vec3::ZERO, Vec3::ONE]);
    let b = Aabb::from_points(&[Vec3::new(2.0, 2.0, 2.0), Vec3::new(3.0, 3.0, 3.0)]);
    let u = a.union(&b);
    assert!(u.contains(Vec3::ZERO));
    assert!(u.contains(Vec3::new(3.0, 3.0, 3.0)));
}

#[test]
fn aabb_padded_grows_symmetrically() {
    let a = Aabb::from_points(&[Vec3::ZERO, Vec3::ONE]).padded(0.5);
    assert_eq!(a.low, Vec3::splat(-0.5));
    assert_eq!(a.high, Vec3::splat(1.5));
}

// ─── Intersection ─────────────────────────────────────────────

#[test]
fn aabb_intersects_overlapping() {
    let a = Aabb::from_points(&[Vec3::ZERO, Vec3::ONE]);
    let b = Aabb::from_points(&[Vec3::splat(0.5), Vec3::splat(1.5)]);
    assert!(a.intersects(&b));
    assert!(b.intersects(&a));
}

#[test]
fn aabb_touching_counts_as_intersecting() {
    let a = Aabb::from_points(&[Vec3::ZERO, Vec3::ONE]);
    let b = Aabb::from_points(&[Vec3::new(1.0, 0.0, 0.0), Vec3::new(2.0, 1.0, 1.0)]);
    assert!(a.intersects(&b));
}

#[test]
fn aabb_disjoint_does_not_intersect() {
    let a = Aabb::from_points(&[Vec3::ZERO, Vec3::ONE]);
    let b = Aabb::from_points(&[Vec3::splat(1.1), Vec3::splat(2.0)]);
    assert!(!a.intersects(&b));
}
