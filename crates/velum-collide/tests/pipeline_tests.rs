//! Integration tests for the collision pipeline.

use velum_collide::collision::{Collision, CollisionKind, ImpactZone};
use velum_collide::pipeline::CollisionPipeline;
use velum_collide::surface::DynamicSurface;
use velum_math::Vec3;
use velum_mesh::generators::{facing_triangle_pair, flat_sheet};
use velum_telemetry::TallySink;

fn surface_from(mesh: velum_mesh::SurfaceMesh, positions: Vec<Vec3>) -> DynamicSurface {
    let masses = vec![1.0; positions.len()];
    DynamicSurface::new(mesh, positions, masses).unwrap()
}

/// Give every vertex its velocity, advance predicted positions by dt,
/// and rebuild the broad phase with continuous bounds.
fn begin_step(surface: &mut DynamicSurface, velocities: &[Vec3], dt: f64) {
    for (v, &vel) in velocities.iter().enumerate() {
        surface.velocities[v] = vel;
        let predicted = surface.position(v) + vel * dt;
        surface.set_newposition(v, predicted);
    }
    surface.update_broad_phase(true);
}

/// The two facing triangles closing on each other at unit speed.
fn closing_pair(gap: f64) -> DynamicSurface {
    let (mesh, positions) = facing_triangle_pair(gap);
    let mut surface = surface_from(mesh, positions);
    let mut velocities = vec![Vec3::new(0.0, 0.0, 1.0); 3];
    velocities.extend(vec![Vec3::new(0.0, 0.0, -1.0); 3]);
    begin_step(&mut surface, &velocities, 1.0);
    surface
}

// ─── Impulse Properties ───────────────────────────────────────

#[test]
fn impulse_conserves_momentum() {
    let (mesh, positions) = flat_sheet(2, 2, 1.0);
    let n = positions.len();
    let masses: Vec<f64> = (0..n).map(|i| 1.0 + i as f64 * 0.5).collect();
    let mut surface = DynamicSurface::new(mesh, positions, masses).unwrap();
    for v in 0..n {
        surface.velocities[v] = Vec3::new(0.1 * v as f64, -0.2, 0.3 * (v % 3) as f64);
    }

    let vertices = [0usize, 1, 3, 4];
    let before: Vec3 = vertices
        .iter()
        .map(|&v| surface.velocities[v] * surface.masses[v])
        .sum();

    let mut pipeline = CollisionPipeline::new(0.4);
    let normal = Vec3::new(1.0, 2.0, 3.0).normalize();
    pipeline.apply_impulse(
        &mut surface,
        vertices,
        [1.0, -0.2, -0.3, -0.5],
        1.7,
        normal,
        0.1,
    );

    let after: Vec3 = vertices
        .iter()
        .map(|&v| surface.velocities[v] * surface.masses[v])
        .sum();
    assert!(
        (after - before).length() < 1.0e-10,
        "momentum drifted by {:?}",
        after - before
    );
}

#[test]
fn impulse_zeroes_normal_relative_velocity() {
    let (mesh, positions) = flat_sheet(2, 2, 1.0);
    let mut surface = surface_from(mesh, positions);
    surface.velocities[0] = Vec3::new(0.0, 0.0, -1.0);

    let collision = Collision {
        kind: CollisionKind::PointTriangle,
        vertices: [0, 1, 3, 4],
        normal: Vec3::Z,
        barycentric: [1.0, 0.3, 0.3, 0.4],
        relative_displacement: -1.0,
    };

    let alphas = collision.signed_alphas();
    let rel = |surface: &DynamicSurface| -> Vec3 {
        collision
            .vertices
            .iter()
            .zip(&alphas)
            .map(|(&v, &a)| surface.velocities[v] * a)
            .sum()
    };

    let pre = collision.normal.dot(rel(&surface));
    assert!(pre < 0.0);

    let mut pipeline = CollisionPipeline::new(0.0);
    pipeline.apply_collision_impulse(&mut surface, &collision, -pre, 1.0);

    let post = collision.normal.dot(rel(&surface));
    assert!(
        post.abs() <= 1.0e-6 * pre.abs().max(1.0),
        "normal relative velocity not cancelled: {}",
        post
    );
}

#[test]
fn friction_is_bounded_by_normal_change() {
    let (mesh, positions) = flat_sheet(2, 2, 1.0);
    let mut surface = surface_from(mesh, positions);
    // Approach along -z plus tangential drift along x.
    surface.velocities[0] = Vec3::new(2.0, 0.0, -1.0);

    let collision = Collision {
        kind: CollisionKind::PointTriangle,
        vertices: [0, 1, 3, 4],
        normal: Vec3::Z,
        barycentric: [1.0, 0.3, 0.3, 0.4],
        relative_displacement: -1.0,
    };
    let alphas = collision.signed_alphas();
    let rel = |surface: &DynamicSurface| -> Vec3 {
        collision
            .vertices
            .iter()
            .zip(&alphas)
            .map(|(&v, &a)| surface.velocities[v] * a)
            .sum()
    };

    let mu = 0.7;
    let pre = rel(&surface);
    let pre_normal = collision.normal * collision.normal.dot(pre);

    let mut pipeline = CollisionPipeline::new(mu);
    pipeline.apply_collision_impulse(&mut surface, &collision, 1.0, 1.0);

    let post = rel(&surface);
    let post_normal = collision.normal * collision.normal.dot(post);

    let delta_normal = (post_normal - pre_normal).length();
    let delta_tangential = ((post - post_normal) - (pre - pre_normal)).length();
    assert!(
        delta_tangential <= mu * delta_normal + 1.0e-12,
        "tangential change {} exceeds mu * normal change {}",
        delta_tangential,
        mu * delta_normal
    );
}

// ─── Scenario: Two Closing Triangles ──────────────────────────

#[test]
fn closing_triangles_resolve_and_separate() {
    let mut surface = closing_pair(0.001);
    let mut pipeline = CollisionPipeline::new(0.0);

    assert!(pipeline.handle_collisions(&mut surface, 1.0));
    assert!(pipeline.stats.collision_impulses > 0);

    // Centroid velocities must no longer approach along z.
    let centroid_a: Vec3 = surface.velocities[..3].iter().copied().sum::<Vec3>() / 3.0;
    let centroid_b: Vec3 = surface.velocities[3..].iter().copied().sum::<Vec3>() / 3.0;
    assert!(
        (centroid_a - centroid_b).z <= 1.0e-9,
        "triangles still approaching: {:?}",
        (centroid_a - centroid_b).z
    );

    // Certification: the predicted mesh is intersection-free.
    pipeline.assert_predicted_mesh_is_intersection_free(&surface, false);
}

#[test]
fn detection_is_pure() {
    let mut surface = closing_pair(0.001);
    let mut pipeline = CollisionPipeline::new(0.0);

    let velocities_before = surface.velocities.clone();
    let mut collisions = Vec::new();
    assert!(pipeline.detect_collisions(&surface, &mut collisions));
    assert!(!collisions.is_empty());
    assert_eq!(surface.velocities, velocities_before);
}

#[test]
fn zone_restricted_detection_finds_the_same_region() {
    let mut surface = closing_pair(0.001);
    let mut pipeline = CollisionPipeline::new(0.0);

    let mut collisions = Vec::new();
    assert!(pipeline.detect_collisions(&surface, &mut collisions));
    assert!(!collisions.is_empty());

    let zone = ImpactZone { collisions };
    let mut rediscovered = Vec::new();
    assert!(pipeline.detect_new_collisions(&surface, &[zone], &mut rediscovered));
    assert!(!rediscovered.is_empty());
}

#[test]
fn persistence_check_matches_detection() {
    let mut surface = closing_pair(0.001);
    let mut pipeline = CollisionPipeline::new(0.0);

    let mut collisions = Vec::new();
    pipeline.detect_collisions(&surface, &mut collisions);
    assert!(!collisions.is_empty());
    for collision in &collisions {
        assert!(pipeline.check_if_collision_persists(&surface, collision));
    }

    // After resolution the recorded collisions no longer persist.
    assert!(pipeline.handle_collisions(&mut surface, 1.0));
    for collision in &collisions {
        assert!(!pipeline.check_if_collision_persists(&surface, collision));
    }
}

// ─── Scenario: Overflow Propagation ───────────────────────────

#[test]
fn detection_overflow_returns_false() {
    let mut surface = closing_pair(0.001);
    let mut pipeline = CollisionPipeline::new(0.0);
    pipeline.max_collisions = 0;

    let mut collisions = Vec::new();
    assert!(!pipeline.detect_collisions(&surface, &mut collisions));
}

#[test]
fn candidate_overflow_fails_then_retry_converges() {
    let mut surface = closing_pair(0.001);

    let mut strangled = CollisionPipeline::new(0.0);
    strangled.max_candidates = 0;
    assert!(
        !strangled.handle_collisions(&mut surface, 1.0),
        "zero candidate budget must overflow"
    );

    // Retry with the real budget: the remaining collisions resolve.
    let mut pipeline = CollisionPipeline::new(0.0);
    assert!(pipeline.handle_collisions(&mut surface, 1.0));
    pipeline.assert_predicted_mesh_is_intersection_free(&surface, false);
}

#[test]
fn telemetry_reaches_sinks_without_flushing() {
    let mut surface = closing_pair(0.001);
    let mut pipeline = CollisionPipeline::new(0.0);
    let sink = TallySink::new();
    let shared = sink.tally();
    pipeline.telemetry.add_sink(Box::new(sink));

    // The gap exceeds the default epsilon, so the proximity pass
    // examines candidates but applies nothing.
    pipeline.handle_proximities(&mut surface, 1.0);
    assert!(pipeline.handle_collisions(&mut surface, 1.0));
    pipeline.assert_predicted_mesh_is_intersection_free(&surface, false);

    // Every emitted event already landed in the sink.
    let tally = shared.borrow();
    assert!(tally.proximity_candidates > 0);
    assert_eq!(tally.proximity_impulses, 0);
    assert_eq!(tally.collision_passes, 1);
    assert!(tally.collisions_resolved > 0);
    assert!(tally.collisions_resolved <= pipeline.stats.collision_impulses);
    assert_eq!(tally.candidate_overflows, 0);
    assert_eq!(tally.intersection_checks, 1);
    assert_eq!(tally.intersections_found, 0);
}

// ─── Proximity Pass ───────────────────────────────────────────

#[test]
fn proximity_pass_damps_approach() {
    let (mesh, positions) = facing_triangle_pair(0.001);
    let mut surface = surface_from(mesh, positions);
    surface.proximity_epsilon = 0.01;

    let mut velocities = vec![Vec3::new(0.0, 0.0, 0.05); 3];
    velocities.extend(vec![Vec3::new(0.0, 0.0, -0.05); 3]);
    begin_step(&mut surface, &velocities, 1.0);

    let approach_before = (surface.velocities[0] - surface.velocities[3]).z;

    let mut pipeline = CollisionPipeline::new(0.0);
    pipeline.handle_proximities(&mut surface, 1.0);

    assert!(pipeline.stats.proximity_impulses > 0);
    // Triangle A sits below B, so a positive relative z velocity means
    // approach; repulsion must shrink it.
    let approach_after = (surface.velocities[0] - surface.velocities[3]).z;
    assert!(
        approach_after < approach_before - 1.0e-6,
        "repulsion did not damp the approach: {} -> {}",
        approach_before,
        approach_after
    );
}

#[test]
fn proximity_pass_ignores_distant_geometry() {
    let (mesh, positions) = facing_triangle_pair(10.0);
    let mut surface = surface_from(mesh, positions);
    surface.proximity_epsilon = 0.01;
    let velocities = vec![Vec3::ZERO; 6];
    begin_step(&mut surface, &velocities, 1.0);

    let mut pipeline = CollisionPipeline::new(0.0);
    pipeline.handle_proximities(&mut surface, 1.0);
    assert_eq!(pipeline.stats.proximity_impulses, 0);
}

// ─── Solid Geometry ───────────────────────────────────────────

#[test]
fn solid_vertices_are_never_moved() {
    let (mesh, positions) = facing_triangle_pair(0.001);
    let mut masses = vec![1.0; 3];
    masses.extend(vec![f64::INFINITY; 3]);
    let mut surface = DynamicSurface::new(mesh, positions, masses).unwrap();

    assert!(surface.triangle_is_solid(1));
    assert!(surface.edge_is_solid(surface.mesh.edge_index(3, 4).unwrap()));
    assert!(!surface.triangle_is_solid(0));

    let mut velocities = vec![Vec3::new(0.0, 0.0, 1.0); 3];
    velocities.extend(vec![Vec3::ZERO; 3]);
    begin_step(&mut surface, &velocities, 1.0);

    let mut pipeline = CollisionPipeline::new(0.0);
    assert!(pipeline.handle_collisions(&mut surface, 1.0));

    // The scripted triangle's vertices stayed put.
    for v in 3..6 {
        assert_eq!(surface.velocities[v], Vec3::ZERO);
        assert_eq!(surface.newposition(v), surface.position(v));
    }
    // The dynamic triangle no longer sweeps through it.
    pipeline.assert_predicted_mesh_is_intersection_free(&surface, false);
}

// ─── Segment Queries and Certification ────────────────────────

#[test]
fn segment_query_counts_sheet_crossing() {
    let (mesh, positions) = flat_sheet(2, 2, 1.0);
    let surface = surface_from(mesh, positions);
    let pipeline = CollisionPipeline::new(0.0);

    let a = Vec3::new(0.6, 0.6, -1.0);
    let b = Vec3::new(0.6, 0.6, 1.0);

    let count = pipeline.get_number_of_triangle_intersections(&surface, a, b);
    assert_eq!(count, 1);

    let mut hit_parameters = Vec::new();
    let mut hit_triangles = Vec::new();
    pipeline.get_triangle_intersections(&surface, a, b, &mut hit_parameters, &mut hit_triangles);
    assert_eq!(hit_triangles.len(), 1);
    assert!((hit_parameters[0] - 0.5).abs() < 1.0e-9);
}

#[test]
fn segment_query_misses_outside_sheet() {
    let (mesh, positions) = flat_sheet(2, 2, 1.0);
    let surface = surface_from(mesh, positions);
    let pipeline = CollisionPipeline::new(0.0);

    let count = pipeline.get_number_of_triangle_intersections(
        &surface,
        Vec3::new(10.0, 10.0, -1.0),
        Vec3::new(10.0, 10.0, 1.0),
    );
    assert_eq!(count, 0);
}

#[test]
fn clean_sheet_certifies_intersection_free() {
    let (mesh, positions) = flat_sheet(3, 3, 1.0);
    let surface = surface_from(mesh, positions);
    let mut pipeline = CollisionPipeline::new(0.0);

    pipeline.assert_mesh_is_intersection_free(&surface, false);
    pipeline.assert_predicted_mesh_is_intersection_free(&surface, false);

    for t in 0..surface.mesh.num_triangle_slots() {
        assert!(!pipeline.check_triangle_vs_all_triangles_for_intersection(&surface, t));
    }
}
