//! Static proximity queries.
//!
//! Distance, barycentric parameters, and a separation normal for the
//! two pair varieties the repulsion pass handles. Normals are built
//! from the closest-point difference, so `normal · (difference of
//! weighted positions)` is non-negative by construction.

use velum_math::Vec3;

/// Result of a point-triangle distance query.
#[derive(Debug, Clone, Copy)]
pub struct PointTriangleProximity {
    /// Distance from the point to the closest point on the triangle.
    pub distance: f64,
    /// Barycentric weights of the closest point, summing to 1.
    pub barycentric: [f64; 3],
    /// Unit normal from the closest point toward the query point.
    pub normal: Vec3,
}

/// Result of a segment-segment distance query.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEdgeProximity {
    /// Distance between the closest points of the two segments.
    pub distance: f64,
    /// Weight of the *first* endpoint of edge A; the closest point on A
    /// is `sa * a0 + (1 - sa) * a1`.
    pub sa: f64,
    /// Weight of the first endpoint of edge B.
    pub sb: f64,
    /// Unit normal from the closest point on B toward the closest point
    /// on A.
    pub normal: Vec3,
}

/// Closest point on triangle (a, b, c) to point `x`.
///
/// Voronoi-region walk: test the vertex regions, then the edge regions,
/// then fall through to the face interior.
pub fn point_triangle_proximity(x: Vec3, a: Vec3, b: Vec3, c: Vec3) -> PointTriangleProximity {
    let ab = b - a;
    let ac = c - a;
    let ap = x - a;

    let d1 = ab.dot(ap);
    let d2 = ac.dot(ap);

    let (closest, barycentric) = if d1 <= 0.0 && d2 <= 0.0 {
        (a, [1.0, 0.0, 0.0])
    } else {
        let bp = x - b;
        let d3 = ab.dot(bp);
        let d4 = ac.dot(bp);
        if d3 >= 0.0 && d4 <= d3 {
            (b, [0.0, 1.0, 0.0])
        } else {
            let vc = d1 * d4 - d3 * d2;
            if vc <= 0.0 && d1 >= 0.0 && d3 <= 0.0 {
                let v = d1 / (d1 - d3);
                (a + ab * v, [1.0 - v, v, 0.0])
            } else {
                let cp = x - c;
                let d5 = ab.dot(cp);
                let d6 = ac.dot(cp);
                if d6 >= 0.0 && d5 <= d6 {
                    (c, [0.0, 0.0, 1.0])
                } else {
                    let vb = d5 * d2 - d1 * d6;
                    if vb <= 0.0 && d2 >= 0.0 && d6 <= 0.0 {
                        let w = d2 / (d2 - d6);
                        (a + ac * w, [1.0 - w, 0.0, w])
                    } else {
                        let va = d3 * d6 - d5 * d4;
                        if va <= 0.0 && (d4 - d3) >= 0.0 && (d5 - d6) >= 0.0 {
                            let w = (d4 - d3) / ((d4 - d3) + (d5 - d6));
                            (b + (c - b) * w, [0.0, 1.0 - w, w])
                        } else {
                            let denom = 1.0 / (va + vb + vc);
                            let v = vb * denom;
                            let w = vc * denom;
                            (a + ab * v + ac * w, [1.0 - v - w, v, w])
                        }
                    }
                }
            }
        }
    };

    let diff = x - closest;
    let distance = diff.length();
    let normal = if distance > f64::EPSILON {
        diff / distance
    } else {
        // Point on the surface: fall back to the face normal.
        let n = ab.cross(ac);
        let len = n.length();
        if len > f64::EPSILON {
            n / len
        } else {
            Vec3::Z
        }
    };

    PointTriangleProximity {
        distance,
        barycentric,
        normal,
    }
}

/// Closest points between segments (a0, a1) and (b0, b1).
pub fn segment_segment_proximity(a0: Vec3, a1: Vec3, b0: Vec3, b1: Vec3) -> EdgeEdgeProximity {
    let d1 = a1 - a0;
    let d2 = b1 - b0;
    let r = a0 - b0;

    let aa = d1.dot(d1);
    let ee = d2.dot(d2);
    let f = d2.dot(r);

    let (s, t) = if aa <= f64::EPSILON && ee <= f64::EPSILON {
        (0.0, 0.0)
    } else if aa <= f64::EPSILON {
        (0.0, (f / ee).clamp(0.0, 1.0))
    } else {
        let c = d1.dot(r);
        if ee <= f64::EPSILON {
            ((-c / aa).clamp(0.0, 1.0), 0.0)
        } else {
            let b = d1.dot(d2);
            let denom = aa * ee - b * b;
            let mut s = if denom.abs() > f64::EPSILON {
                ((b * f - c * ee) / denom).clamp(0.0, 1.0)
            } else {
                // Parallel segments: any point does; pick the start.
                0.0
            };
            let mut t = (b * s + f) / ee;
            if t < 0.0 {
                t = 0.0;
                s = (-c / aa).clamp(0.0, 1.0);
            } else if t > 1.0 {
                t = 1.0;
                s = ((b - c) / aa).clamp(0.0, 1.0);
            }
            (s, t)
        }
    };

    let on_a = a0 + d1 * s;
    let on_b = b0 + d2 * t;
    let diff = on_a - on_b;
    let distance = diff.length();
    let normal = if distance > f64::EPSILON {
        diff / distance
    } else {
        let n = d1.cross(d2);
        let len = n.length();
        if len > f64::EPSILON {
            n / len
        } else {
            Vec3::Z
        }
    };

    EdgeEdgeProximity {
        distance,
        sa: 1.0 - s,
        sb: 1.0 - t,
        normal,
    }
}
