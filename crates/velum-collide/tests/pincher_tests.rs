//! Integration tests for the mesh pincher.

use velum_collide::pincher::MeshPincher;
use velum_collide::pipeline::CollisionPipeline;
use velum_collide::surface::DynamicSurface;
use velum_math::Vec3;
use velum_mesh::generators::double_cone;
use velum_telemetry::TallySink;

fn cone_surface() -> DynamicSurface {
    let (mesh, positions) = double_cone();
    let masses = vec![1.0; positions.len()];
    DynamicSurface::new(mesh, positions, masses).unwrap()
}

// ─── Partitioning ─────────────────────────────────────────────

#[test]
fn apex_fan_splits_into_two_components() {
    let surface = cone_surface();
    let pincher = MeshPincher::default();

    let components = pincher.partition_vertex_neighbourhood(&surface, 0);
    assert_eq!(components.len(), 2);
    assert_eq!(components[0].len() + components[1].len(), 6);

    // Each component is one fan: triangles 0..3 or 3..6, never mixed.
    for component in &components {
        let all_upper = component.iter().all(|&t| t < 3);
        let all_lower = component.iter().all(|&t| t >= 3);
        assert!(all_upper || all_lower, "mixed component: {:?}", component);
    }
}

#[test]
fn ring_vertices_have_connected_fans() {
    let surface = cone_surface();
    let pincher = MeshPincher::default();

    for v in 1..surface.num_vertices() {
        let components = pincher.partition_vertex_neighbourhood(&surface, v);
        assert_eq!(components.len(), 1, "vertex {} fan should be connected", v);
    }
}

#[test]
fn isolated_vertex_has_no_components() {
    let mut surface = cone_surface();
    let lonely = surface.add_vertex(Vec3::new(5.0, 5.0, 5.0), 1.0);
    let pincher = MeshPincher::default();
    assert!(pincher
        .partition_vertex_neighbourhood(&surface, lonely)
        .is_empty());
}

// ─── Pinching ─────────────────────────────────────────────────

#[test]
fn double_cone_pinches_into_two_closed_fans() {
    let mut surface = cone_surface();
    let mut pipeline = CollisionPipeline::new(0.0);
    let sink = TallySink::new();
    let tally = sink.tally();
    pipeline.telemetry.add_sink(Box::new(sink));
    let pincher = MeshPincher::default();

    let vertex_count_before = surface.num_vertices();
    let pinches = pincher.process_mesh(&mut surface, &mut pipeline).unwrap();

    assert_eq!(pinches, 1);
    assert_eq!(surface.num_vertices(), vertex_count_before + 1);
    assert_eq!(surface.mesh.num_live_triangles(), 6);
    surface.mesh.validate().unwrap();

    // Every vertex now has a connected fan; the apex was separated.
    for v in 0..surface.num_vertices() {
        let components = pincher.partition_vertex_neighbourhood(&surface, v);
        assert!(components.len() <= 1);
    }

    // The duplicate was nudged off the original apex.
    let duplicate = vertex_count_before;
    assert!(surface.position(duplicate) != Vec3::ZERO);
    assert_eq!(
        surface.position(duplicate),
        surface.newposition(duplicate)
    );

    // The result certifies intersection-free, and the pinch reported
    // itself to the sink as it happened.
    pipeline.assert_mesh_is_intersection_free(&surface, false);
    let tally = tally.borrow();
    assert_eq!(tally.pinches_attempted, 1);
    assert_eq!(tally.pinches_committed, 1);
    assert_eq!(tally.intersections_found, 0);
}

#[test]
fn pinching_twice_is_idempotent() {
    let mut surface = cone_surface();
    let mut pipeline = CollisionPipeline::new(0.0);
    let pincher = MeshPincher::default();

    assert_eq!(pincher.process_mesh(&mut surface, &mut pipeline).unwrap(), 1);

    let mesh_after_first = surface.mesh.clone();
    let positions_after_first = surface.positions.clone();

    assert_eq!(pincher.process_mesh(&mut surface, &mut pipeline).unwrap(), 0);
    assert_eq!(surface.mesh, mesh_after_first);
    assert_eq!(surface.positions, positions_after_first);
}

// ─── Rollback ─────────────────────────────────────────────────

/// Double cone plus a blocking triangle threaded through the lower
/// fan — the fan the pincher retargets first — so any pull-apart copy
/// collides immediately.
fn blocked_cone_surface() -> DynamicSurface {
    let (mut mesh, mut positions) = double_cone();

    // Vertical sliver triangle whose first edge passes through the
    // interior of lower-fan triangle (0, 5, 4).
    let b0 = mesh.add_vertex();
    let b1 = mesh.add_vertex();
    let b2 = mesh.add_vertex();
    positions.push(Vec3::new(0.1667, 0.2887, -0.1));
    positions.push(Vec3::new(0.1667, 0.2887, -1.2));
    positions.push(Vec3::new(1.5, 0.2887, -0.6));
    mesh.add_triangle([b0, b1, b2]).unwrap();

    let masses = vec![1.0; positions.len()];
    DynamicSurface::new(mesh, positions, masses).unwrap()
}

#[test]
fn unsafe_pinch_rolls_back_completely() {
    let mut surface = blocked_cone_surface();
    let mut pipeline = CollisionPipeline::new(0.0);
    let pincher = MeshPincher::default();

    let mesh_before = surface.mesh.clone();
    let positions_before = surface.positions.clone();
    let masses_before = surface.masses.clone();

    let components = pincher.partition_vertex_neighbourhood(&surface, 0);
    assert_eq!(components.len(), 2);

    let committed = pincher
        .pull_apart_vertex(&mut surface, &mut pipeline, 0, &components)
        .unwrap();
    assert!(!committed, "blocked pinch must refuse to commit");

    // The mesh, positions, and masses are exactly as before the call.
    assert_eq!(surface.mesh, mesh_before);
    assert_eq!(surface.positions, positions_before);
    assert_eq!(surface.masses, masses_before);
    surface.mesh.validate().unwrap();
}

#[test]
fn blocked_mesh_processes_without_pinching() {
    let mut surface = blocked_cone_surface();
    let mut pipeline = CollisionPipeline::new(0.0);
    let pincher = MeshPincher::default();

    assert_eq!(pincher.process_mesh(&mut surface, &mut pipeline).unwrap(), 0);
}

#[test]
fn safety_check_can_be_disabled() {
    let mut surface = blocked_cone_surface();
    surface.collision_safety = false;
    let mut pipeline = CollisionPipeline::new(0.0);
    let pincher = MeshPincher::default();

    let components = pincher.partition_vertex_neighbourhood(&surface, 0);
    let committed = pincher
        .pull_apart_vertex(&mut surface, &mut pipeline, 0, &components)
        .unwrap();
    assert!(committed, "without collision safety the pinch commits");
}
