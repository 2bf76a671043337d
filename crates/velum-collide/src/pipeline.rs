//! The collision pipeline.
//!
//! Orchestrates proximity repulsion, iterative CCD resolution by
//! impulse, failure-safe candidate draining, and intersection
//! certification. The pipeline owns only its tuning knobs and
//! statistics; all geometric state is borrowed from the
//! [`DynamicSurface`] per call.

use std::collections::VecDeque;

use velum_math::{Aabb, Vec3};
use velum_telemetry::{EventBus, EventKind, TrackerEvent};
use velum_types::constants::{
    FRICTION_STATIC_TOLERANCE, IMPULSE_MULTIPLIER, MAX_CANDIDATES, MAX_COLLISIONS,
    REPULSION_STIFFNESS,
};
use velum_types::{VelumError, VelumResult};

use crate::ccd::{self, CcdClassification};
use crate::collision::{
    Collision, CollisionCandidate, CollisionKind, CollisionStats, ImpactZone, Intersection,
};
use crate::intersect;
use crate::proximity;
use crate::surface::DynamicSurface;

/// Progress flags shared by the candidate-processing loops.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessStatus {
    /// At least one true collision was found.
    pub collision_found: bool,
    /// A queue or collision list exceeded its hard cap.
    pub overflow: bool,
    /// The processing loop ran its input to exhaustion.
    pub all_candidates_processed: bool,
}

/// Impulse-based collision resolution over a [`DynamicSurface`].
pub struct CollisionPipeline {
    /// Coulomb friction coefficient applied with every impulse.
    pub friction_coefficient: f64,
    /// Outer sweep count for [`handle_collisions`](Self::handle_collisions).
    pub max_pass: u32,
    /// Hard cap on the update-candidate queue.
    pub max_candidates: usize,
    /// Hard cap on collisions reported by a detection sweep.
    pub max_collisions: usize,
    /// Counters for the most recent resolution call.
    pub stats: CollisionStats,
    /// Telemetry bus; sinks are registered by the enclosing tracker.
    pub telemetry: EventBus,
    /// Step tag for telemetry, advanced by the enclosing tracker.
    pub step: u64,
}

impl CollisionPipeline {
    /// Pipeline with the given friction coefficient and default caps.
    pub fn new(friction_coefficient: f64) -> Self {
        Self {
            friction_coefficient,
            max_pass: 1,
            max_candidates: MAX_CANDIDATES,
            max_collisions: MAX_COLLISIONS,
            stats: CollisionStats::default(),
            telemetry: EventBus::new(),
            step: 0,
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Impulse application
    // ═══════════════════════════════════════════════════════════════

    /// Apply an impulse of the given magnitude along `normal` to the
    /// four vertices, weighted by the signed barycentric alphas, then
    /// Coulomb friction, then refresh the predicted positions.
    pub fn apply_impulse(
        &mut self,
        surface: &mut DynamicSurface,
        vertices: [usize; 4],
        alphas: [f64; 4],
        impulse_magnitude: f64,
        normal: Vec3,
        dt: f64,
    ) {
        let inv_m: Vec<f64> = vertices.iter().map(|&v| surface.inverse_mass(v)).collect();
        let w: f64 = alphas
            .iter()
            .zip(&inv_m)
            .map(|(a, im)| a * a * im)
            .sum();
        if w <= 0.0 {
            // Every touched vertex is solid; nothing to do.
            return;
        }

        let i = impulse_magnitude / w;
        if i > 100.0 / dt {
            tracing::warn!(impulse = i, "big impulse");
        }

        let rel = |surface: &DynamicSurface| -> Vec3 {
            vertices
                .iter()
                .zip(&alphas)
                .map(|(&v, &a)| surface.velocities[v] * a)
                .sum()
        };

        let pre_relative_velocity = rel(surface);
        let pre_normal = normal * normal.dot(pre_relative_velocity);
        let pre_tangential = pre_relative_velocity - pre_normal;

        for (k, &v) in vertices.iter().enumerate() {
            surface.velocities[v] += normal * (i * alphas[k] * inv_m[k]);
        }

        // Friction: bounded by mu times the normal velocity change,
        // directed against the pre-impulse tangential motion.
        let post_relative_velocity = rel(surface);
        let post_normal = normal * normal.dot(post_relative_velocity);
        let delta_normal = (post_normal - pre_normal).length();
        let friction_impulse =
            (self.friction_coefficient * delta_normal).min(pre_tangential.length());
        let friction_i = friction_impulse / w;

        let tangent_len = pre_tangential.length();
        let tangent = if tangent_len > FRICTION_STATIC_TOLERANCE {
            -pre_tangential / tangent_len
        } else {
            Vec3::ZERO
        };

        for (k, &v) in vertices.iter().enumerate() {
            surface.velocities[v] += tangent * (friction_i * alphas[k] * inv_m[k]);
        }

        for &v in &vertices {
            let updated = surface.position(v) + surface.velocities[v] * dt;
            surface.set_newposition(v, updated);
        }
    }

    /// Apply a collision impulse using the record's signed weights.
    pub fn apply_collision_impulse(
        &mut self,
        surface: &mut DynamicSurface,
        collision: &Collision,
        impulse_magnitude: f64,
        dt: f64,
    ) {
        self.apply_impulse(
            surface,
            collision.vertices,
            collision.signed_alphas(),
            impulse_magnitude,
            collision.normal,
            dt,
        );
    }

    // ═══════════════════════════════════════════════════════════════
    // Candidate generation
    // ═══════════════════════════════════════════════════════════════

    /// Point-vs-this-triangle candidates from the vertex grids.
    fn add_triangle_candidates(
        &self,
        surface: &DynamicSurface,
        t: usize,
        return_solid: bool,
        return_dynamic: bool,
        out: &mut VecDeque<CollisionCandidate>,
    ) {
        let bounds = surface.triangle_continuous_bounds(t);
        let mut hits = Vec::new();
        surface.broad_phase.grid().potential_vertex_collisions(
            &bounds,
            return_solid,
            return_dynamic,
            &mut hits,
        );
        for v in hits {
            out.push_back(CollisionCandidate {
                a: t,
                b: v,
                kind: CollisionKind::PointTriangle,
            });
        }
    }

    /// Edge-vs-this-edge candidates from the edge grids.
    fn add_edge_candidates(
        &self,
        surface: &DynamicSurface,
        e: usize,
        return_solid: bool,
        return_dynamic: bool,
        out: &mut VecDeque<CollisionCandidate>,
    ) {
        let bounds = surface.edge_continuous_bounds(e);
        let mut hits = Vec::new();
        surface.broad_phase.grid().potential_edge_collisions(
            &bounds,
            return_solid,
            return_dynamic,
            &mut hits,
        );
        for other in hits {
            out.push_back(CollisionCandidate {
                a: e,
                b: other,
                kind: CollisionKind::EdgeEdge,
            });
        }
    }

    /// This-point-vs-triangle candidates from the triangle grids.
    fn add_point_candidates(
        &self,
        surface: &DynamicSurface,
        v: usize,
        return_solid: bool,
        return_dynamic: bool,
        out: &mut VecDeque<CollisionCandidate>,
    ) {
        let bounds = surface.vertex_continuous_bounds(v);
        let mut hits = Vec::new();
        surface.broad_phase.grid().potential_triangle_collisions(
            &bounds,
            return_solid,
            return_dynamic,
            &mut hits,
        );
        for t in hits {
            out.push_back(CollisionCandidate {
                a: t,
                b: v,
                kind: CollisionKind::PointTriangle,
            });
        }
    }

    /// Candidates for a vertex and every element incident on it —
    /// queued after an impulse moves the vertex.
    fn add_point_update_candidates(
        &self,
        surface: &DynamicSurface,
        v: usize,
        out: &mut VecDeque<CollisionCandidate>,
    ) {
        // Solid vertices don't move under impulses, so their
        // neighbourhood needs no re-examination.
        if surface.vertex_is_solid(v) {
            return;
        }

        self.add_point_candidates(surface, v, true, true, out);

        for &t in &surface.mesh.vertex_to_triangle_map[v] {
            self.add_triangle_candidates(surface, t, true, true, out);
        }
        for &e in &surface.mesh.vertex_to_edge_map[v] {
            self.add_edge_candidates(surface, e, true, true, out);
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Proximities
    // ═══════════════════════════════════════════════════════════════

    /// Process queued proximity candidates in insertion order, applying
    /// a soft repulsion impulse to each pair closer than epsilon.
    fn process_proximity_candidates(
        &mut self,
        surface: &mut DynamicSurface,
        dt: f64,
        candidates: &mut VecDeque<CollisionCandidate>,
    ) {
        let k = REPULSION_STIFFNESS;

        while let Some(candidate) = candidates.pop_front() {
            match candidate.kind {
                CollisionKind::EdgeEdge => {
                    let e0 = surface.mesh.edges[candidate.a];
                    let e1 = surface.mesh.edges[candidate.b];
                    if e0[0] == e0[1] || e1[0] == e1[1] {
                        self.stats.culled_candidates += 1;
                        continue;
                    }
                    if e0[0] == e1[0] || e0[0] == e1[1] || e0[1] == e1[0] || e0[1] == e1[1] {
                        self.stats.culled_candidates += 1;
                        continue;
                    }

                    let result = proximity::segment_segment_proximity(
                        surface.position(e0[0]),
                        surface.position(e0[1]),
                        surface.position(e1[0]),
                        surface.position(e1[1]),
                    );
                    if result.distance >= surface.proximity_epsilon {
                        continue;
                    }

                    let (sa, sb) = (result.sa, result.sb);
                    let relative_velocity = result.normal.dot(
                        surface.velocities[e0[0]] * sa + surface.velocities[e0[1]] * (1.0 - sa)
                            - surface.velocities[e1[0]] * sb
                            - surface.velocities[e1[1]] * (1.0 - sb),
                    );
                    let diff = surface.position(e0[0]) * sa
                        + surface.position(e0[1]) * (1.0 - sa)
                        - surface.position(e1[0]) * sb
                        - surface.position(e1[1]) * (1.0 - sb);
                    if result.normal.dot(diff) < 0.0 {
                        continue;
                    }

                    let d = surface.proximity_epsilon - result.distance;
                    if relative_velocity > 0.1 * d / dt {
                        continue;
                    }
                    let impulse = (0.1 * d / dt - relative_velocity).max(0.0).min(dt * k * d);

                    let collision = Collision {
                        kind: CollisionKind::EdgeEdge,
                        vertices: [e0[0], e0[1], e1[0], e1[1]],
                        normal: result.normal,
                        barycentric: [sa, 1.0 - sa, sb, 1.0 - sb],
                        relative_displacement: dt * relative_velocity,
                    };
                    self.apply_collision_impulse(surface, &collision, impulse, dt);
                    self.stats.proximity_impulses += 1;
                }
                CollisionKind::PointTriangle => {
                    let tri = surface.mesh.triangle(candidate.a);
                    let v = candidate.b;
                    if surface.mesh.triangle_is_deleted(candidate.a) || tri.contains(&v) {
                        self.stats.culled_candidates += 1;
                        continue;
                    }

                    let result = proximity::point_triangle_proximity(
                        surface.position(v),
                        surface.position(tri[0]),
                        surface.position(tri[1]),
                        surface.position(tri[2]),
                    );
                    if result.distance >= surface.proximity_epsilon {
                        continue;
                    }

                    let [s1, s2, s3] = result.barycentric;
                    let relative_velocity = result.normal.dot(
                        surface.velocities[v]
                            - (surface.velocities[tri[0]] * s1
                                + surface.velocities[tri[1]] * s2
                                + surface.velocities[tri[2]] * s3),
                    );
                    let diff = surface.position(v)
                        - (surface.position(tri[0]) * s1
                            + surface.position(tri[1]) * s2
                            + surface.position(tri[2]) * s3);
                    if result.normal.dot(diff) < 0.0 {
                        continue;
                    }

                    let d = surface.proximity_epsilon - result.distance;
                    if relative_velocity > 0.1 * d / dt {
                        continue;
                    }
                    let impulse = (0.1 * d / dt - relative_velocity).max(0.0).min(dt * k * d);

                    let collision = Collision {
                        kind: CollisionKind::PointTriangle,
                        vertices: [v, tri[0], tri[1], tri[2]],
                        normal: result.normal,
                        barycentric: [1.0, s1, s2, s3],
                        relative_displacement: dt * relative_velocity,
                    };
                    self.apply_collision_impulse(surface, &collision, impulse, dt);
                    self.stats.proximity_impulses += 1;
                }
            }
        }
    }

    /// Soft repulsion for all pairs currently closer than epsilon.
    ///
    /// Three sweeps: dynamic vertices vs solid triangles, dynamic
    /// triangles vs all vertices, dynamic edges vs all edges. Best
    /// effort — this pass has no failure mode.
    pub fn handle_proximities(&mut self, surface: &mut DynamicSurface, dt: f64) {
        let mut candidate_total = 0u64;
        let impulses_before = self.stats.proximity_impulses;
        let mut candidates = VecDeque::new();

        // Dynamic vertices vs solid triangles.
        for v in 0..surface.num_vertices() {
            if surface.vertex_is_solid(v) {
                continue;
            }
            self.add_point_candidates(surface, v, true, false, &mut candidates);
        }
        candidate_total += candidates.len() as u64;
        self.process_proximity_candidates(surface, dt, &mut candidates);

        // Dynamic triangles vs all vertices.
        for t in 0..surface.mesh.num_triangle_slots() {
            if surface.mesh.triangle_is_deleted(t) || surface.triangle_is_solid(t) {
                continue;
            }
            self.add_triangle_candidates(surface, t, true, true, &mut candidates);
        }
        candidate_total += candidates.len() as u64;
        self.process_proximity_candidates(surface, dt, &mut candidates);

        // Dynamic edges vs all edges.
        for e in 0..surface.mesh.num_edge_slots() {
            if surface.mesh.edge_is_deleted(e) || surface.edge_is_solid(e) {
                continue;
            }
            self.add_edge_candidates(surface, e, true, true, &mut candidates);
        }
        candidate_total += candidates.len() as u64;
        self.process_proximity_candidates(surface, dt, &mut candidates);

        self.telemetry.emit(TrackerEvent::new(
            self.step,
            EventKind::ProximityPass {
                candidates: candidate_total,
                impulses: self.stats.proximity_impulses - impulses_before,
            },
        ));
    }

    // ═══════════════════════════════════════════════════════════════
    // Continuous collisions
    // ═══════════════════════════════════════════════════════════════

    /// Narrow-phase CCD for an edge-edge candidate.
    pub fn detect_segment_segment_collision(
        &mut self,
        surface: &DynamicSurface,
        candidate: &CollisionCandidate,
    ) -> Option<Collision> {
        debug_assert_eq!(candidate.kind, CollisionKind::EdgeEdge);

        let mut e0 = surface.mesh.edges[candidate.a];
        let mut e1 = surface.mesh.edges[candidate.b];
        if e0[0] == e0[1] || e1[0] == e1[1] {
            self.stats.culled_candidates += 1;
            return None;
        }
        if e0[0] == e1[0] || e0[0] == e1[1] || e0[1] == e1[0] || e0[1] == e1[1] {
            self.stats.culled_candidates += 1;
            return None;
        }
        if e0[1] < e0[0] {
            e0.swap(0, 1);
        }
        if e1[1] < e1[0] {
            e1.swap(0, 1);
        }
        if surface.edge_is_solid(candidate.a) && surface.edge_is_solid(candidate.b) {
            self.stats.culled_candidates += 1;
            return None;
        }

        let [a, b] = e0;
        let [c, d] = e1;
        self.stats.ccd_tests += 1;
        let (impact, class) = ccd::segment_segment_collision(
            surface.position(a),
            surface.newposition(a),
            surface.position(b),
            surface.newposition(b),
            surface.position(c),
            surface.newposition(c),
            surface.position(d),
            surface.newposition(d),
        );
        if class == CcdClassification::Degenerate {
            self.stats.degenerate_cases += 1;
        }

        impact.map(|impact| Collision {
            kind: CollisionKind::EdgeEdge,
            vertices: [a, b, c, d],
            normal: impact.normal,
            barycentric: [impact.sa, 1.0 - impact.sa, impact.sb, 1.0 - impact.sb],
            relative_displacement: impact.relative_displacement,
        })
    }

    /// Narrow-phase CCD for a point-triangle candidate.
    pub fn detect_point_triangle_collision(
        &mut self,
        surface: &DynamicSurface,
        candidate: &CollisionCandidate,
    ) -> Option<Collision> {
        debug_assert_eq!(candidate.kind, CollisionKind::PointTriangle);

        let t = candidate.a;
        let v = candidate.b;
        if surface.mesh.triangle_is_deleted(t) {
            self.stats.culled_candidates += 1;
            return None;
        }
        let tri = surface.mesh.triangle(t);
        if tri.contains(&v) {
            self.stats.culled_candidates += 1;
            return None;
        }
        if surface.triangle_is_solid(t) && surface.vertex_is_solid(v) {
            self.stats.culled_candidates += 1;
            return None;
        }

        let mut sorted = tri;
        sorted.sort_unstable();

        self.stats.ccd_tests += 1;
        let (impact, class) = ccd::point_triangle_collision(
            surface.position(v),
            surface.newposition(v),
            surface.position(sorted[0]),
            surface.newposition(sorted[0]),
            surface.position(sorted[1]),
            surface.newposition(sorted[1]),
            surface.position(sorted[2]),
            surface.newposition(sorted[2]),
        );
        if class == CcdClassification::Degenerate {
            self.stats.degenerate_cases += 1;
        }

        impact.map(|impact| {
            let [u, vv, w] = impact.barycentric;
            Collision {
                kind: CollisionKind::PointTriangle,
                vertices: [v, sorted[0], sorted[1], sorted[2]],
                normal: impact.normal,
                barycentric: [1.0, u, vv, w],
                relative_displacement: impact.relative_displacement,
            }
        })
    }

    /// Detect-and-resolve one candidate; returns the four touched
    /// vertices on a hit.
    fn resolve_candidate(
        &mut self,
        surface: &mut DynamicSurface,
        dt: f64,
        candidate: &CollisionCandidate,
    ) -> Option<[usize; 4]> {
        let collision = match candidate.kind {
            CollisionKind::EdgeEdge => self.detect_segment_segment_collision(surface, candidate),
            CollisionKind::PointTriangle => {
                self.detect_point_triangle_collision(surface, candidate)
            }
        }?;

        let relative_velocity = collision.relative_displacement / dt;
        let desired_relative_velocity = 0.0;
        let impulse = IMPULSE_MULTIPLIER * (desired_relative_velocity - relative_velocity);
        self.apply_collision_impulse(surface, &collision, impulse, dt);
        self.stats.collision_impulses += 1;
        Some(collision.vertices)
    }

    /// Resolve queued candidates; on the collecting pass, enqueue
    /// update candidates for every vertex an impulse touched.
    fn process_collision_candidates(
        &mut self,
        surface: &mut DynamicSurface,
        dt: f64,
        candidates: &mut VecDeque<CollisionCandidate>,
        collect: bool,
        update_candidates: &mut VecDeque<CollisionCandidate>,
        status: &mut ProcessStatus,
    ) {
        let max_iteration = 5 * candidates.len();
        let mut iteration = 0;

        while iteration < max_iteration {
            let Some(candidate) = candidates.pop_front() else {
                break;
            };
            iteration += 1;

            if let Some(vertices) = self.resolve_candidate(surface, dt, &candidate) {
                status.collision_found = true;

                if !status.overflow && update_candidates.len() > self.max_candidates {
                    status.overflow = true;
                    self.telemetry.emit(TrackerEvent::new(
                        self.step,
                        EventKind::CandidateOverflow {
                            queue_len: update_candidates.len(),
                        },
                    ));
                }
                if !status.overflow && collect {
                    for v in vertices {
                        self.add_point_update_candidates(surface, v, update_candidates);
                    }
                }
            }
        }

        if max_iteration > 0 && iteration >= max_iteration && !candidates.is_empty() {
            tracing::debug!("collision candidate iteration bound reached");
        }
        status.all_candidates_processed = candidates.is_empty();
    }

    /// Drain the update queue, reinjecting fresh candidates for every
    /// resolved collision, bounded at five times the queue length.
    fn drain_update_candidates(
        &mut self,
        surface: &mut DynamicSurface,
        dt: f64,
        queue: &mut VecDeque<CollisionCandidate>,
        status: &mut ProcessStatus,
    ) {
        let max_iteration = 5 * queue.len();
        let mut iteration = 0;

        while iteration < max_iteration {
            let Some(candidate) = queue.pop_front() else {
                break;
            };
            iteration += 1;

            if let Some(vertices) = self.resolve_candidate(surface, dt, &candidate) {
                status.collision_found = true;

                if !status.overflow && queue.len() > self.max_candidates {
                    status.overflow = true;
                    self.telemetry.emit(TrackerEvent::new(
                        self.step,
                        EventKind::CandidateOverflow {
                            queue_len: queue.len(),
                        },
                    ));
                }
                if !status.overflow {
                    for v in vertices {
                        self.add_point_update_candidates(surface, v, queue);
                    }
                }
            }
        }

        if max_iteration > 0 && iteration >= max_iteration && !queue.is_empty() {
            tracing::debug!("update-candidate iteration bound reached");
        }
        status.all_candidates_processed = queue.is_empty();
    }

    /// Iteratively resolve continuous collisions until none remain for
    /// the updated velocities, or declare failure.
    ///
    /// Returns `true` iff no collision was found in the initial sweeps,
    /// or the update queue drained completely without overflowing.
    /// `false` asks the caller to fall back to its impact-zone solver.
    pub fn handle_collisions(&mut self, surface: &mut DynamicSurface, dt: f64) -> bool {
        self.stats.reset();

        let mut update_candidates: VecDeque<CollisionCandidate> = VecDeque::new();

        for pass in 0..self.max_pass {
            // Only the final pass collects update candidates; the queue
            // is wound down after the loop exits.
            let collect = pass + 1 == self.max_pass;
            let resolved_before = self.stats.collision_impulses;

            let mut status = ProcessStatus::default();
            let mut collision_found = false;
            let mut sweep = VecDeque::new();

            // Dynamic vertices vs solid triangles.
            for v in 0..surface.num_vertices() {
                if surface.vertex_is_solid(v) {
                    continue;
                }
                self.add_point_candidates(surface, v, true, false, &mut sweep);
                self.process_collision_candidates(
                    surface,
                    dt,
                    &mut sweep,
                    collect,
                    &mut update_candidates,
                    &mut status,
                );
            }
            collision_found |= status.collision_found;

            // Dynamic triangles vs all vertices.
            for t in 0..surface.mesh.num_triangle_slots() {
                if surface.mesh.triangle_is_deleted(t) || surface.triangle_is_solid(t) {
                    continue;
                }
                self.add_triangle_candidates(surface, t, true, true, &mut sweep);
                self.process_collision_candidates(
                    surface,
                    dt,
                    &mut sweep,
                    collect,
                    &mut update_candidates,
                    &mut status,
                );
            }
            collision_found |= status.collision_found;

            // Dynamic edges vs all edges.
            for e in 0..surface.mesh.num_edge_slots() {
                if surface.mesh.edge_is_deleted(e) || surface.edge_is_solid(e) {
                    continue;
                }
                self.add_edge_candidates(surface, e, true, true, &mut sweep);
                self.process_collision_candidates(
                    surface,
                    dt,
                    &mut sweep,
                    collect,
                    &mut update_candidates,
                    &mut status,
                );
            }
            collision_found |= status.collision_found;

            self.telemetry.emit(TrackerEvent::new(
                self.step,
                EventKind::CollisionPass {
                    pass,
                    resolved: self.stats.collision_impulses - resolved_before,
                    overflow: status.overflow,
                },
            ));

            if status.overflow {
                tracing::warn!("candidate overflow, returning early");
                return false;
            }
            if !collision_found {
                return true;
            }
        }

        // Unique-ify the remaining candidates, then wind the queue down.
        let mut unique: Vec<CollisionCandidate> = update_candidates.drain(..).collect();
        unique.sort_unstable();
        unique.dedup();
        let mut queue: VecDeque<CollisionCandidate> = unique.into();

        let mut status = ProcessStatus::default();
        self.drain_update_candidates(surface, dt, &mut queue, &mut status);

        let mut ok = status.all_candidates_processed;
        if !ok {
            tracing::warn!("did not resolve all collisions");
        }
        if status.overflow {
            tracing::warn!("overflowed candidate list");
            ok = false;
        }
        ok
    }

    // ═══════════════════════════════════════════════════════════════
    // Pure detection
    // ═══════════════════════════════════════════════════════════════

    /// Narrow-phase test of every queued candidate, collecting (never
    /// resolving) collisions, capped at `max_collisions`.
    fn test_collision_candidates(
        &mut self,
        surface: &DynamicSurface,
        candidates: &mut VecDeque<CollisionCandidate>,
        collisions: &mut Vec<Collision>,
        status: &mut ProcessStatus,
    ) {
        while let Some(candidate) = candidates.pop_front() {
            let collision = match candidate.kind {
                CollisionKind::EdgeEdge => {
                    self.detect_segment_segment_collision(surface, &candidate)
                }
                CollisionKind::PointTriangle => {
                    self.detect_point_triangle_collision(surface, &candidate)
                }
            };
            if let Some(collision) = collision {
                status.collision_found = true;
                collisions.push(collision);
                if collisions.len() > self.max_collisions {
                    status.overflow = true;
                    status.all_candidates_processed = false;
                    return;
                }
            }
        }
        status.all_candidates_processed = true;
    }

    /// Sweep the whole mesh for continuous collisions without applying
    /// impulses. Returns `false` on overflow.
    pub fn detect_collisions(
        &mut self,
        surface: &DynamicSurface,
        collisions: &mut Vec<Collision>,
    ) -> bool {
        let mut candidates = VecDeque::new();

        for v in 0..surface.num_vertices() {
            if surface.vertex_is_solid(v) {
                continue;
            }
            self.add_point_candidates(surface, v, true, false, &mut candidates);
        }
        for t in 0..surface.mesh.num_triangle_slots() {
            if surface.mesh.triangle_is_deleted(t) || surface.triangle_is_solid(t) {
                continue;
            }
            self.add_triangle_candidates(surface, t, true, true, &mut candidates);
        }
        for e in 0..surface.mesh.num_edge_slots() {
            if surface.mesh.edge_is_deleted(e) || surface.edge_is_solid(e) {
                continue;
            }
            self.add_edge_candidates(surface, e, true, true, &mut candidates);
        }

        let mut status = ProcessStatus::default();
        self.test_collision_candidates(surface, &mut candidates, collisions, &mut status);

        if !status.all_candidates_processed {
            debug_assert!(status.overflow);
            return false;
        }
        true
    }

    /// Detect continuous collisions among elements in (and adjacent to)
    /// the given impact zones.
    pub fn detect_new_collisions(
        &mut self,
        surface: &DynamicSurface,
        impact_zones: &[ImpactZone],
        collisions: &mut Vec<Collision>,
    ) -> bool {
        let mut zone_vertices: Vec<usize> = Vec::new();
        for zone in impact_zones {
            for collision in &zone.collisions {
                for &v in &collision.vertices {
                    if !zone_vertices.contains(&v) {
                        zone_vertices.push(v);
                    }
                }
            }
        }

        let mut zone_triangles: Vec<usize> = Vec::new();
        let mut zone_edges: Vec<usize> = Vec::new();
        for &v in &zone_vertices {
            for &t in &surface.mesh.vertex_to_triangle_map[v] {
                if !zone_triangles.contains(&t) {
                    zone_triangles.push(t);
                }
            }
            for &e in &surface.mesh.vertex_to_edge_map[v] {
                if !zone_edges.contains(&e) {
                    zone_edges.push(e);
                }
            }
        }

        let mut candidates = VecDeque::new();
        for &v in &zone_vertices {
            self.add_point_candidates(surface, v, true, true, &mut candidates);
        }
        for &t in &zone_triangles {
            self.add_triangle_candidates(surface, t, true, true, &mut candidates);
        }
        for &e in &zone_edges {
            self.add_edge_candidates(surface, e, true, true, &mut candidates);
        }

        let mut status = ProcessStatus::default();
        self.test_collision_candidates(surface, &mut candidates, collisions, &mut status);

        status.all_candidates_processed && !status.overflow
    }

    /// Re-run the narrow phase on a previously detected collision.
    pub fn check_if_collision_persists(
        &mut self,
        surface: &DynamicSurface,
        collision: &Collision,
    ) -> bool {
        let vs = collision.vertices;
        match collision.kind {
            CollisionKind::EdgeEdge => {
                ccd::segment_segment_collision(
                    surface.position(vs[0]),
                    surface.newposition(vs[0]),
                    surface.position(vs[1]),
                    surface.newposition(vs[1]),
                    surface.position(vs[2]),
                    surface.newposition(vs[2]),
                    surface.position(vs[3]),
                    surface.newposition(vs[3]),
                )
                .0
                .is_some()
            }
            CollisionKind::PointTriangle => {
                ccd::point_triangle_collision(
                    surface.position(vs[0]),
                    surface.newposition(vs[0]),
                    surface.position(vs[1]),
                    surface.newposition(vs[1]),
                    surface.position(vs[2]),
                    surface.newposition(vs[2]),
                    surface.position(vs[3]),
                    surface.newposition(vs[3]),
                )
                .0
                .is_some()
            }
        }
    }

    // ═══════════════════════════════════════════════════════════════
    // Static intersection queries and certification
    // ═══════════════════════════════════════════════════════════════

    /// Intersections of the segment (a, b) with all mesh triangles, at
    /// current positions. Appends the segment parameter and triangle
    /// index per hit. Degenerate grazes are not reported.
    pub fn get_triangle_intersections(
        &self,
        surface: &DynamicSurface,
        point_a: Vec3,
        point_b: Vec3,
        hit_parameters: &mut Vec<f64>,
        hit_triangles: &mut Vec<usize>,
    ) {
        let query = Aabb::from_points(&[point_a, point_b]);
        let mut overlapping = Vec::new();
        surface
            .broad_phase
            .grid()
            .potential_triangle_collisions(&query, true, true, &mut overlapping);

        // Indices one past the vertex range stand in for the free
        // segment endpoints.
        let dummy = surface.num_vertices();

        for t in overlapping {
            let mut tri = surface.mesh.triangle(t);
            tri.sort_unstable();

            if let Some(hit) = intersect::segment_triangle_intersection_params(
                point_a,
                dummy,
                point_b,
                dummy + 1,
                surface.position(tri[0]),
                tri[0],
                surface.position(tri[1]),
                tri[1],
                surface.position(tri[2]),
                tri[2],
            ) {
                hit_parameters.push(hit.s);
                hit_triangles.push(t);
            }
        }
    }

    /// Number of mesh triangles the segment (a, b) pierces, counting
    /// degenerate grazes as hits.
    pub fn get_number_of_triangle_intersections(
        &self,
        surface: &DynamicSurface,
        point_a: Vec3,
        point_b: Vec3,
    ) -> usize {
        let query = Aabb::from_points(&[point_a, point_b]);
        let mut overlapping = Vec::new();
        surface
            .broad_phase
            .grid()
            .potential_triangle_collisions(&query, true, true, &mut overlapping);

        let dummy = surface.num_vertices();
        let mut hits = 0;

        for t in overlapping {
            let mut tri = surface.mesh.triangle(t);
            tri.sort_unstable();

            if intersect::segment_triangle_intersection(
                point_a,
                dummy,
                point_b,
                dummy + 1,
                surface.position(tri[0]),
                tri[0],
                surface.position(tri[1]),
                tri[1],
                surface.position(tri[2]),
                tri[2],
                true,
            ) {
                hits += 1;
            }
        }
        hits
    }

    /// Check one triangle against all others for static intersection,
    /// edge-vs-triangle both ways.
    pub fn check_triangle_vs_all_triangles_for_intersection(
        &self,
        surface: &DynamicSurface,
        t: usize,
    ) -> bool {
        let tri = surface.mesh.triangle(t);
        let mut any_intersection = false;

        // This triangle's edges vs other triangles.
        for (va, vb) in [(tri[0], tri[1]), (tri[1], tri[2]), (tri[2], tri[0])] {
            let query = Aabb::from_points(&[surface.position(va), surface.position(vb)])
                .padded(surface.aabb_padding);
            let mut overlapping = Vec::new();
            surface
                .broad_phase
                .grid()
                .potential_triangle_collisions(&query, true, true, &mut overlapping);

            for other in overlapping {
                let other_tri = surface.mesh.triangle(other);
                if intersect::check_edge_triangle_intersection(
                    va,
                    vb,
                    other_tri[0],
                    other_tri[1],
                    other_tri[2],
                    &surface.positions,
                ) {
                    any_intersection = true;
                }
            }
        }

        // Other edges vs this triangle.
        let query = Aabb::from_points(&[
            surface.position(tri[0]),
            surface.position(tri[1]),
            surface.position(tri[2]),
        ])
        .padded(surface.aabb_padding);
        let mut overlapping_edges = Vec::new();
        surface
            .broad_phase
            .grid()
            .potential_edge_collisions(&query, true, true, &mut overlapping_edges);

        for e in overlapping_edges {
            let [ea, eb] = surface.mesh.edges[e];
            if intersect::check_edge_triangle_intersection(
                ea,
                eb,
                tri[0],
                tri[1],
                tri[2],
                &surface.positions,
            ) {
                any_intersection = true;
            }
        }

        any_intersection
    }

    /// Find every static edge-triangle intersection in the mesh.
    ///
    /// Queries the broad phase per triangle, filters shared-vertex and
    /// vacated pairs, and runs the segment-triangle predicate at
    /// current or predicted positions.
    pub fn get_intersections(
        &self,
        surface: &DynamicSurface,
        degeneracy_counts_as_intersection: bool,
        use_new_positions: bool,
        intersections: &mut Vec<Intersection>,
    ) {
        for t in 0..surface.mesh.num_triangle_slots() {
            if surface.mesh.triangle_is_deleted(t) {
                continue;
            }
            let triangle = surface.mesh.triangle(t);

            // Solid-solid pairs can't have moved into each other.
            let get_solid_edges = !surface.triangle_is_solid(t);

            let query = surface.triangle_static_bounds(t);
            let mut edge_candidates = Vec::new();
            surface.broad_phase.grid().potential_edge_collisions(
                &query,
                get_solid_edges,
                true,
                &mut edge_candidates,
            );

            for e in edge_candidates {
                if surface.mesh.edge_is_deleted(e) {
                    continue;
                }
                let edge = surface.mesh.edges[e];
                if triangle.contains(&edge[0]) || triangle.contains(&edge[1]) {
                    continue;
                }

                let pick = |v: usize| {
                    if use_new_positions {
                        surface.newposition(v)
                    } else {
                        surface.position(v)
                    }
                };

                if intersect::segment_triangle_intersection(
                    pick(edge[0]),
                    edge[0],
                    pick(edge[1]),
                    edge[1],
                    pick(triangle[0]),
                    triangle[0],
                    pick(triangle[1]),
                    triangle[1],
                    pick(triangle[2]),
                    triangle[2],
                    degeneracy_counts_as_intersection,
                ) {
                    intersections.push(Intersection {
                        edge_index: e,
                        triangle_index: t,
                    });
                }
            }
        }
    }

    /// Certify the mesh intersection-free, at current or predicted
    /// positions. Every offending pair is logged before the structured
    /// error is returned.
    pub fn certify_mesh_is_intersection_free(
        &mut self,
        surface: &DynamicSurface,
        degeneracy_counts_as_intersection: bool,
        use_new_positions: bool,
    ) -> VelumResult<()> {
        let mut intersections = Vec::new();
        self.get_intersections(
            surface,
            degeneracy_counts_as_intersection,
            use_new_positions,
            &mut intersections,
        );

        for intersection in &intersections {
            let triangle = surface.mesh.triangle(intersection.triangle_index);
            let edge = surface.mesh.edges[intersection.edge_index];
            tracing::error!(
                ?triangle,
                ?edge,
                predicted = use_new_positions,
                "mesh intersection: edge pierces triangle"
            );
        }
        self.telemetry.emit(TrackerEvent::new(
            self.step,
            EventKind::IntersectionCheck {
                intersections: intersections.len() as u64,
                predicted: use_new_positions,
            },
        ));

        if intersections.is_empty() {
            Ok(())
        } else {
            Err(VelumError::InvariantViolation(format!(
                "mesh is not intersection-free ({} edge-triangle intersections)",
                intersections.len()
            )))
        }
    }

    /// Certify the current mesh intersection-free.
    ///
    /// Any intersection is a programming error upstream: it is logged
    /// as an error and trips an assertion in debug builds.
    pub fn assert_mesh_is_intersection_free(
        &mut self,
        surface: &DynamicSurface,
        degeneracy_counts_as_intersection: bool,
    ) {
        let result = self.certify_mesh_is_intersection_free(
            surface,
            degeneracy_counts_as_intersection,
            false,
        );
        debug_assert!(result.is_ok(), "{}", result.unwrap_err());
    }

    /// Certify the predicted mesh intersection-free.
    ///
    /// Detects missed collisions before the mesh is advected into an
    /// intersecting state.
    pub fn assert_predicted_mesh_is_intersection_free(
        &mut self,
        surface: &DynamicSurface,
        degeneracy_counts_as_intersection: bool,
    ) {
        let result = self.certify_mesh_is_intersection_free(
            surface,
            degeneracy_counts_as_intersection,
            true,
        );
        debug_assert!(result.is_ok(), "{}", result.unwrap_err());
    }
}
