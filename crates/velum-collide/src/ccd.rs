//! Continuous collision detection over a unit time interval.
//!
//! All trajectories are linear: an element at `x` moves to `x_new` as
//! t runs 0 → 1. A point can only pass through a moving triangle — and
//! an edge through a moving edge — at an instant where the four points
//! involved are coplanar, so both tests share one engine: expand the
//! coplanarity determinant into an exact cubic in t, isolate its roots
//! over [0, 1], and run a static overlap test at each root.
//!
//! Callers sort triangle triples and edge pairs into ascending index
//! order before invoking, which (with the shared canonical evaluation)
//! makes the predicates symmetric under vertex-order reversal.

use velum_math::Vec3;

/// Barycentric inside-test tolerance, relative to the triangle scale.
const INSIDE_TOLERANCE: f64 = 1.0e-8;

/// Two coplanarity roots closer than this are treated as one event.
const ROOT_MERGE_TOLERANCE: f64 = 1.0e-12;

/// A point-triangle impact.
#[derive(Debug, Clone, Copy)]
pub struct PointTriangleImpact {
    /// Impact time in [0, 1].
    pub time: f64,
    /// Barycentric weights of the impact point on the triangle.
    pub barycentric: [f64; 3],
    /// Unit normal with the point on the positive side at t = 0.
    pub normal: Vec3,
    /// Relative displacement along the normal over the interval.
    pub relative_displacement: f64,
}

/// An edge-edge impact.
#[derive(Debug, Clone, Copy)]
pub struct EdgeEdgeImpact {
    /// Impact time in [0, 1].
    pub time: f64,
    /// Weight of the first endpoint of edge A at impact.
    pub sa: f64,
    /// Weight of the first endpoint of edge B at impact.
    pub sb: f64,
    /// Unit normal oriented from edge B toward edge A at t = 0.
    pub normal: Vec3,
    /// Relative displacement along the normal over the interval.
    pub relative_displacement: f64,
}

/// Outcome classification, reported into the pipeline statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CcdClassification {
    /// The cubic was well-conditioned.
    Regular,
    /// The motion was (near-)planar throughout; sampled fallback used.
    Degenerate,
}

#[inline]
fn triple(a: Vec3, b: Vec3, c: Vec3) -> f64 {
    a.dot(b.cross(c))
}

/// Coefficients `[c0, c1, c2, c3]` of
/// `det(u1 + t·w1, u2 + t·w2, u3 + t·w3)` as a polynomial in t.
fn coplanarity_cubic(u1: Vec3, u2: Vec3, u3: Vec3, w1: Vec3, w2: Vec3, w3: Vec3) -> [f64; 4] {
    [
        triple(u1, u2, u3),
        triple(w1, u2, u3) + triple(u1, w2, u3) + triple(u1, u2, w3),
        triple(u1, w2, w3) + triple(w1, u2, w3) + triple(w1, w2, u3),
        triple(w1, w2, w3),
    ]
}

#[inline]
fn eval_cubic(c: &[f64; 4], t: f64) -> f64 {
    ((c[3] * t + c[2]) * t + c[1]) * t + c[0]
}

/// Roots of the cubic in [0, 1], ascending.
///
/// The interval is split at the derivative's roots so each piece is
/// monotonic, then each sign change is resolved by bisection. Returns
/// the classification alongside: a cubic whose coefficients all vanish
/// (relative to the geometry scale) means the four points stay coplanar
/// for the whole interval, and a fixed sample set is returned instead.
fn cubic_roots_in_unit_interval(c: &[f64; 4], scale: f64, roots: &mut Vec<f64>) -> CcdClassification {
    roots.clear();
    let magnitude = c[0].abs() + c[1].abs() + c[2].abs() + c[3].abs();
    let zero = 1.0e-14 * scale.max(f64::MIN_POSITIVE);

    if magnitude <= zero {
        // Persistently coplanar motion; let the caller's static overlap
        // test decide at a handful of sample times.
        roots.extend_from_slice(&[0.0, 0.25, 0.5, 0.75, 1.0]);
        return CcdClassification::Degenerate;
    }

    // Breakpoints: 0, the derivative roots inside (0, 1), 1.
    let mut breaks = [0.0f64, 1.0, 1.0, 1.0];
    let mut nbreaks = 1;
    let (da, db, dc) = (3.0 * c[3], 2.0 * c[2], c[1]);
    if da.abs() > 1.0e-14 * magnitude {
        let disc = db * db - 4.0 * da * dc;
        if disc > 0.0 {
            let sq = disc.sqrt();
            // Numerically stable quadratic roots.
            let q = -0.5 * (db + db.signum() * sq);
            let mut r1 = q / da;
            let mut r2 = if q.abs() > f64::MIN_POSITIVE { dc / q } else { r1 };
            if r1 > r2 {
                std::mem::swap(&mut r1, &mut r2);
            }
            for r in [r1, r2] {
                if r > 0.0 && r < 1.0 {
                    breaks[nbreaks] = r;
                    nbreaks += 1;
                }
            }
        }
    } else if db.abs() > 1.0e-14 * magnitude {
        let r = -dc / db;
        if r > 0.0 && r < 1.0 {
            breaks[nbreaks] = r;
            nbreaks += 1;
        }
    }
    breaks[nbreaks] = 1.0;
    nbreaks += 1;
    let breaks = &mut breaks[..nbreaks];
    breaks.sort_unstable_by(|a, b| a.partial_cmp(b).expect("breakpoints are finite"));

    let f_zero = 1.0e-13 * magnitude;
    let mut push = |t: f64, roots: &mut Vec<f64>| {
        if roots
            .last()
            .map_or(true, |&last| (t - last).abs() > ROOT_MERGE_TOLERANCE)
        {
            roots.push(t);
        }
    };

    for window in breaks.windows(2) {
        let (lo, hi) = (window[0], window[1]);
        let f_lo = eval_cubic(c, lo);
        let f_hi = eval_cubic(c, hi);

        if f_lo.abs() <= f_zero {
            push(lo, roots);
            continue;
        }
        if f_lo.signum() != f_hi.signum() && f_hi.abs() > f_zero {
            let (mut lo, mut hi, f_lo_sign) = (lo, hi, f_lo.signum());
            for _ in 0..100 {
                let mid = 0.5 * (lo + hi);
                if eval_cubic(c, mid).signum() == f_lo_sign {
                    lo = mid;
                } else {
                    hi = mid;
                }
            }
            push(0.5 * (lo + hi), roots);
        }
    }
    let f_one = eval_cubic(c, 1.0);
    if f_one.abs() <= f_zero {
        push(1.0, roots);
    }

    CcdClassification::Regular
}

fn geometry_scale(points: &[Vec3]) -> f64 {
    let mut scale: f64 = 1.0;
    for p in points {
        scale = scale.max(p.length());
    }
    scale * scale * scale
}

/// Continuous point-triangle collision.
///
/// The point moves `x → x_new` while the triangle moves
/// `(a, b, c) → (a_new, b_new, c_new)`, t ∈ [0, 1]. Returns the
/// earliest impact, if any, plus whether the configuration was
/// degenerate (for statistics).
#[allow(clippy::too_many_arguments)]
pub fn point_triangle_collision(
    x: Vec3,
    x_new: Vec3,
    a: Vec3,
    a_new: Vec3,
    b: Vec3,
    b_new: Vec3,
    c: Vec3,
    c_new: Vec3,
) -> (Option<PointTriangleImpact>, CcdClassification) {
    let u1 = a - x;
    let u2 = b - x;
    let u3 = c - x;
    let w1 = (a_new - a) - (x_new - x);
    let w2 = (b_new - b) - (x_new - x);
    let w3 = (c_new - c) - (x_new - x);

    let cubic = coplanarity_cubic(u1, u2, u3, w1, w2, w3);
    let scale = geometry_scale(&[u1, u2, u3, w1, w2, w3]);
    let mut roots = Vec::new();
    let class = cubic_roots_in_unit_interval(&cubic, scale, &mut roots);

    for &t in &roots {
        let xt = x.lerp(x_new, t);
        let at = a.lerp(a_new, t);
        let bt = b.lerp(b_new, t);
        let ct = c.lerp(c_new, t);

        let n = (bt - at).cross(ct - at);
        let n_len = n.length();
        if n_len <= f64::EPSILON {
            continue;
        }

        // Project onto the triangle plane and solve for barycentrics.
        let ab = bt - at;
        let ac = ct - at;
        let ap = xt - at;
        let d00 = ab.dot(ab);
        let d01 = ab.dot(ac);
        let d11 = ac.dot(ac);
        let d20 = ap.dot(ab);
        let d21 = ap.dot(ac);
        let denom = d00 * d11 - d01 * d01;
        if denom.abs() <= f64::EPSILON {
            continue;
        }
        let v = (d11 * d20 - d01 * d21) / denom;
        let w = (d00 * d21 - d01 * d20) / denom;
        let u = 1.0 - v - w;

        if u < -INSIDE_TOLERANCE || v < -INSIDE_TOLERANCE || w < -INSIDE_TOLERANCE {
            continue;
        }

        let mut normal = n / n_len;

        // Orient so the point sits on the positive side at t = 0; when
        // the point starts in-plane, orient against the approach.
        let side0 = normal.dot(x - (a * u + b * v + c * w));
        let mut relative_displacement =
            normal.dot((x_new - x) - ((a_new - a) * u + (b_new - b) * v + (c_new - c) * w));
        if side0 < 0.0 || (side0 == 0.0 && relative_displacement > 0.0) {
            normal = -normal;
            relative_displacement = -relative_displacement;
        }

        return (
            Some(PointTriangleImpact {
                time: t,
                barycentric: [u, v, w],
                normal,
                relative_displacement,
            }),
            class,
        );
    }

    (None, class)
}

/// Continuous edge-edge collision.
///
/// Edge A moves `(a0, a1) → (a0_new, a1_new)`, edge B moves
/// `(b0, b1) → (b0_new, b1_new)`, t ∈ [0, 1].
#[allow(clippy::too_many_arguments)]
pub fn segment_segment_collision(
    a0: Vec3,
    a0_new: Vec3,
    a1: Vec3,
    a1_new: Vec3,
    b0: Vec3,
    b0_new: Vec3,
    b1: Vec3,
    b1_new: Vec3,
) -> (Option<EdgeEdgeImpact>, CcdClassification) {
    let u1 = a1 - a0;
    let u2 = b0 - a0;
    let u3 = b1 - a0;
    let w1 = (a1_new - a1) - (a0_new - a0);
    let w2 = (b0_new - b0) - (a0_new - a0);
    let w3 = (b1_new - b1) - (a0_new - a0);

    let cubic = coplanarity_cubic(u1, u2, u3, w1, w2, w3);
    let scale = geometry_scale(&[u1, u2, u3, w1, w2, w3]);
    let mut roots = Vec::new();
    let class = cubic_roots_in_unit_interval(&cubic, scale, &mut roots);

    for &t in &roots {
        let a0t = a0.lerp(a0_new, t);
        let a1t = a1.lerp(a1_new, t);
        let b0t = b0.lerp(b0_new, t);
        let b1t = b1.lerp(b1_new, t);

        let da = a1t - a0t;
        let db = b1t - b0t;
        let r = b0t - a0t;

        // Closest parameters of the two (now coplanar) lines.
        let daa = da.dot(da);
        let dbb = db.dot(db);
        let dab = da.dot(db);
        let denom = daa * dbb - dab * dab;
        if daa <= f64::EPSILON || dbb <= f64::EPSILON {
            continue;
        }
        let (s, q) = if denom.abs() <= f64::EPSILON * daa * dbb {
            // Parallel at impact time: clamp a representative overlap point.
            let s = (da.dot(r) / daa).clamp(0.0, 1.0);
            let q = (db.dot(a0t + da * s - b0t) / dbb).clamp(0.0, 1.0);
            (s, q)
        } else {
            let s = (da.dot(r) * dbb - dab * db.dot(r)) / denom;
            let q = (dab * s - db.dot(r)) / dbb;
            (s, q)
        };

        let span = da.length().max(db.length());
        let param_tol = INSIDE_TOLERANCE;
        if s < -param_tol || s > 1.0 + param_tol || q < -param_tol || q > 1.0 + param_tol {
            continue;
        }
        let s = s.clamp(0.0, 1.0);
        let q = q.clamp(0.0, 1.0);

        let on_a = a0t + da * s;
        let on_b = b0t + db * q;
        if (on_a - on_b).length() > 1.0e-9 * span.max(1.0) {
            continue;
        }

        let n = da.cross(db);
        let n_len = n.length();
        let mut normal = if n_len > f64::EPSILON {
            n / n_len
        } else {
            // Parallel edges: separate within the common plane.
            let alt = da.cross(r);
            let fallback = alt.cross(da);
            let len = fallback.length();
            if len <= f64::EPSILON {
                continue;
            }
            fallback / len
        };

        let sa = 1.0 - s;
        let sb = 1.0 - q;

        // Orient from edge B toward edge A at t = 0; when the edges
        // start touching, orient against the approach.
        let pa0 = a0 * sa + a1 * (1.0 - sa);
        let pb0 = b0 * sb + b1 * (1.0 - sb);
        let side0 = normal.dot(pa0 - pb0);
        let mut relative_displacement = normal.dot(
            ((a0_new - a0) * sa + (a1_new - a1) * (1.0 - sa))
                - ((b0_new - b0) * sb + (b1_new - b1) * (1.0 - sb)),
        );
        if side0 < 0.0 || (side0 == 0.0 && relative_displacement > 0.0) {
            normal = -normal;
            relative_displacement = -relative_displacement;
        }

        return (
            Some(EdgeEdgeImpact {
                time: t,
                sa,
                sb,
                normal,
                relative_displacement,
            }),
            class,
        );
    }

    (None, class)
}
