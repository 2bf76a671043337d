//! Static intersection predicates.
//!
//! Segment-triangle and triangle-triangle tests built on signed-volume
//! orientation queries. Inputs carry the stable mesh indices: triangles
//! and segments are canonicalized into ascending index order before any
//! determinant is evaluated, so the answer does not depend on the
//! caller's vertex ordering.
//!
//! Determinants within a scale-relative threshold of zero are
//! *degenerate*; whether a degenerate configuration counts as a hit is
//! the caller's choice via `degenerate_counts_as_hit`.

use velum_math::Vec3;
use velum_types::constants::DEGENERATE_EPSILON;

use crate::proximity;

/// Signed volume of the tetrahedron (a, b, c, d), up to a factor of 6.
#[inline]
fn orient3d(a: Vec3, b: Vec3, c: Vec3, d: Vec3) -> f64 {
    (b - a).dot((c - a).cross(d - a))
}

/// Scale-relative degeneracy threshold for a determinant over the given
/// points. Determinants scale with length cubed.
fn determinant_threshold(points: &[Vec3]) -> f64 {
    let mut scale: f64 = 1.0;
    for p in points {
        scale = scale.max(p.x.abs()).max(p.y.abs()).max(p.z.abs());
    }
    DEGENERATE_EPSILON * scale * scale * scale
}

/// Detailed result of a segment-triangle intersection query.
#[derive(Debug, Clone, Copy)]
pub struct SegmentTriangleHit {
    /// Fraction along the segment from its first point.
    pub s: f64,
    /// Barycentric weights of the hit point on the triangle, summing
    /// to 1, in the order the triangle was supplied.
    pub barycentric: [f64; 3],
    /// Unit triangle normal.
    pub normal: Vec3,
}

/// Sort a vertex-position pair list of length 3 into ascending index
/// order.
fn sort_triangle(mut tri: [(Vec3, usize); 3]) -> [(Vec3, usize); 3] {
    if tri[0].1 > tri[1].1 {
        tri.swap(0, 1);
    }
    if tri[1].1 > tri[2].1 {
        tri.swap(1, 2);
    }
    if tri[0].1 > tri[1].1 {
        tri.swap(0, 1);
    }
    tri
}

/// Does segment (s0, s1) intersect triangle (a, b, c)?
///
/// The index arguments make the test order-independent: both primitives
/// are canonicalized to ascending index order internally. Exactly
/// coplanar or on-boundary configurations report
/// `degenerate_counts_as_hit`, gated on the segment actually touching
/// the triangle, so a distant coplanar segment never reports a hit.
#[allow(clippy::too_many_arguments)]
pub fn segment_triangle_intersection(
    s0: Vec3,
    s0_index: usize,
    s1: Vec3,
    s1_index: usize,
    a: Vec3,
    a_index: usize,
    b: Vec3,
    b_index: usize,
    c: Vec3,
    c_index: usize,
    degenerate_counts_as_hit: bool,
) -> bool {
    match classify_segment_triangle(
        s0, s0_index, s1, s1_index, a, a_index, b, b_index, c, c_index,
    ) {
        None => degenerate_counts_as_hit_guarded(s0, s1, a, b, c, degenerate_counts_as_hit),
        Some(hit) => hit.is_some(),
    }
}

/// As [`segment_triangle_intersection`], but returning the segment
/// parameter, barycentric weights, and normal on a clean hit.
/// Degenerate configurations return `None` regardless of the flag —
/// there is no well-defined parameterization to report.
#[allow(clippy::too_many_arguments)]
pub fn segment_triangle_intersection_params(
    s0: Vec3,
    s0_index: usize,
    s1: Vec3,
    s1_index: usize,
    a: Vec3,
    a_index: usize,
    b: Vec3,
    b_index: usize,
    c: Vec3,
    c_index: usize,
) -> Option<SegmentTriangleHit> {
    classify_segment_triangle(
        s0, s0_index, s1, s1_index, a, a_index, b, b_index, c, c_index,
    )
    .flatten()
}

/// `None` = degenerate; `Some(None)` = clean miss; `Some(Some(hit))` =
/// clean hit.
#[allow(clippy::too_many_arguments)]
fn classify_segment_triangle(
    s0: Vec3,
    s0_index: usize,
    s1: Vec3,
    s1_index: usize,
    a: Vec3,
    a_index: usize,
    b: Vec3,
    b_index: usize,
    c: Vec3,
    c_index: usize,
) -> Option<Option<SegmentTriangleHit>> {
    // Canonical ordering: ascending indices for both primitives. Both
    // the plane test and the edge tests are invariant under this up to
    // overall sign, which the symmetric logic below absorbs.
    let (p, q) = if s0_index <= s1_index {
        (s0, s1)
    } else {
        (s1, s0)
    };
    let swapped_segment = s0_index > s1_index;
    let [(ta, ta_index), (tb, tb_index), (tc, tc_index)] =
        sort_triangle([(a, a_index), (b, b_index), (c, c_index)]);

    let eps = determinant_threshold(&[p, q, ta, tb, tc]);

    let d0 = orient3d(p, ta, tb, tc);
    let d1 = orient3d(q, ta, tb, tc);

    if d0.abs() <= eps || d1.abs() <= eps {
        return None;
    }
    if d0.signum() == d1.signum() {
        return Some(None);
    }

    // Endpoints straddle the plane; the hit is inside the triangle iff
    // the three segment-edge orientations agree.
    let v0 = orient3d(p, q, ta, tb);
    let v1 = orient3d(p, q, tb, tc);
    let v2 = orient3d(p, q, tc, ta);

    if v0.abs() <= eps || v1.abs() <= eps || v2.abs() <= eps {
        return None;
    }
    if v0.signum() != v1.signum() || v1.signum() != v2.signum() {
        return Some(None);
    }

    // Clean hit: recover parameters in the caller's original ordering.
    let s_sorted = d0 / (d0 - d1);
    let s = if swapped_segment {
        1.0 - s_sorted
    } else {
        s_sorted
    };

    // Barycentric weights are proportional to the sub-volumes opposite
    // each sorted vertex; map them back to (a, b, c) input order.
    let total = v0 + v1 + v2;
    let w_sorted = [v1 / total, v2 / total, v0 / total];
    let sorted_indices = [ta_index, tb_index, tc_index];
    let mut barycentric = [0.0f64; 3];
    for (k, &original) in [a_index, b_index, c_index].iter().enumerate() {
        let pos = sorted_indices
            .iter()
            .position(|&si| si == original)
            .expect("index present in its own sort");
        barycentric[k] = w_sorted[pos];
    }

    let n = (b - a).cross(c - a);
    let len = n.length();
    let normal = if len > f64::EPSILON { n / len } else { Vec3::Z };

    Some(Some(SegmentTriangleHit {
        s,
        barycentric,
        normal,
    }))
}

/// Degenerate-path answer: the flag, gated on the segment actually
/// touching the triangle, so a distant coplanar pair stays a miss.
///
/// In a degenerate (coplanar or on-boundary) configuration the volume
/// tests carry no information; contact reduces to a distance query:
/// the segment touches the triangle iff an endpoint lies on it or the
/// segment meets one of its edges.
fn degenerate_counts_as_hit_guarded(
    s0: Vec3,
    s1: Vec3,
    a: Vec3,
    b: Vec3,
    c: Vec3,
    flag: bool,
) -> bool {
    if !flag {
        return false;
    }

    let mut scale: f64 = 1.0;
    for p in [s0, s1, a, b, c] {
        scale = scale.max(p.length());
    }
    let touch = 1.0e-9 * scale;

    if proximity::point_triangle_proximity(s0, a, b, c).distance <= touch
        || proximity::point_triangle_proximity(s1, a, b, c).distance <= touch
    {
        return true;
    }
    for (e0, e1) in [(a, b), (b, c), (c, a)] {
        if proximity::segment_segment_proximity(s0, s1, e0, e1).distance <= touch {
            return true;
        }
    }
    false
}

/// Edge-vs-triangle intersection with shared-vertex filtering, all by
/// index. Degeneracy counts as a hit: a filtered predicate must never
/// silently pass a configuration it cannot classify.
pub fn check_edge_triangle_intersection(
    edge_a: usize,
    edge_b: usize,
    tri_a: usize,
    tri_b: usize,
    tri_c: usize,
    positions: &[Vec3],
) -> bool {
    if edge_a == tri_a
        || edge_a == tri_b
        || edge_a == tri_c
        || edge_b == tri_a
        || edge_b == tri_b
        || edge_b == tri_c
    {
        return false;
    }
    segment_triangle_intersection(
        positions[edge_a],
        edge_a,
        positions[edge_b],
        edge_b,
        positions[tri_a],
        tri_a,
        positions[tri_b],
        tri_b,
        positions[tri_c],
        tri_c,
        true,
    )
}

/// Do two triangles intersect? Tests every edge of each against the
/// other, skipping edges that share a vertex with the opposing
/// triangle.
pub fn triangle_triangle_intersection(
    t0: [usize; 3],
    t1: [usize; 3],
    positions: &[Vec3],
) -> bool {
    let edges0 = [(t0[0], t0[1]), (t0[1], t0[2]), (t0[2], t0[0])];
    let edges1 = [(t1[0], t1[1]), (t1[1], t1[2]), (t1[2], t1[0])];

    for (ea, eb) in edges0 {
        if check_edge_triangle_intersection(ea, eb, t1[0], t1[1], t1[2], positions) {
            return true;
        }
    }
    for (ea, eb) in edges1 {
        if check_edge_triangle_intersection(ea, eb, t0[0], t0[1], t0[2], positions) {
            return true;
        }
    }
    false
}
