//! Integration tests for velum-mesh.

use velum_mesh::generators::{double_cone, facing_triangle_pair, flat_sheet};
use velum_mesh::SurfaceMesh;

// ─── Construction ─────────────────────────────────────────────

#[test]
fn from_triangles_builds_adjacency() {
    // Two triangles sharing the edge (1, 2).
    let mesh = SurfaceMesh::from_triangles(4, &[[0, 1, 2], [2, 1, 3]]).unwrap();

    assert_eq!(mesh.num_triangle_slots(), 2);
    assert_eq!(mesh.num_edge_slots(), 5);
    assert_eq!(mesh.num_live_triangles(), 2);

    let shared = mesh.edge_index(1, 2).expect("shared edge exists");
    assert_eq!(mesh.edge_to_triangle_map[shared].len(), 2);

    let boundary = mesh.edge_index(0, 1).expect("boundary edge exists");
    assert_eq!(mesh.edge_to_triangle_map[boundary].len(), 1);

    assert!(mesh.triangles_are_adjacent(0, 1));
    mesh.validate().unwrap();
}

#[test]
fn edge_index_ignores_orientation() {
    let mesh = SurfaceMesh::from_triangles(3, &[[0, 1, 2]]).unwrap();
    assert_eq!(mesh.edge_index(0, 1), mesh.edge_index(1, 0));
    assert!(mesh.edge_index(0, 1).is_some());
}

#[test]
fn triangle_index_finds_any_permutation() {
    let mesh = SurfaceMesh::from_triangles(4, &[[0, 1, 2], [2, 1, 3]]).unwrap();
    assert_eq!(mesh.triangle_index(2, 0, 1), Some(0));
    assert_eq!(mesh.triangle_index(3, 2, 1), Some(1));
    assert_eq!(mesh.triangle_index(0, 1, 3), None);
}

#[test]
fn degenerate_triangle_rejected() {
    assert!(SurfaceMesh::from_triangles(3, &[[0, 1, 1]]).is_err());
}

#[test]
fn out_of_range_vertex_rejected() {
    assert!(SurfaceMesh::from_triangles(2, &[[0, 1, 2]]).is_err());
}

// ─── Removal ──────────────────────────────────────────────────

#[test]
fn remove_triangle_vacates_slot() {
    let mut mesh = SurfaceMesh::from_triangles(4, &[[0, 1, 2], [2, 1, 3]]).unwrap();
    mesh.remove_triangle(0);

    assert!(mesh.triangle_is_deleted(0));
    assert!(!mesh.triangle_is_deleted(1));
    assert_eq!(mesh.num_live_triangles(), 1);
    // Slot count is unchanged: indices stay stable.
    assert_eq!(mesh.num_triangle_slots(), 2);
    mesh.validate().unwrap();
}

#[test]
fn remove_triangle_prunes_orphan_edges() {
    let mut mesh = SurfaceMesh::from_triangles(4, &[[0, 1, 2], [2, 1, 3]]).unwrap();
    let boundary = mesh.edge_index(0, 1).unwrap();
    let shared = mesh.edge_index(1, 2).unwrap();

    mesh.remove_triangle(0);

    // Edges used only by triangle 0 are gone; the shared edge survives.
    assert!(mesh.edge_is_deleted(boundary));
    assert!(!mesh.edge_is_deleted(shared));
    assert_eq!(mesh.edge_to_triangle_map[shared], vec![1]);
}

#[test]
fn remove_triangle_is_idempotent() {
    let mut mesh = SurfaceMesh::from_triangles(3, &[[0, 1, 2]]).unwrap();
    mesh.remove_triangle(0);
    mesh.remove_triangle(0);
    assert_eq!(mesh.num_live_triangles(), 0);
}

#[test]
fn remove_vertex_requires_empty_incidence() {
    let mut mesh = SurfaceMesh::from_triangles(3, &[[0, 1, 2]]).unwrap();
    assert!(mesh.remove_vertex(0).is_err());

    mesh.remove_triangle(0);
    assert!(mesh.remove_vertex(0).is_ok());
}

#[test]
fn add_then_remove_last_vertex_restores_count() {
    let mut mesh = SurfaceMesh::from_triangles(3, &[[0, 1, 2]]).unwrap();
    let v = mesh.add_vertex();
    assert_eq!(mesh.num_vertices(), 4);
    mesh.remove_vertex(v).unwrap();
    assert_eq!(mesh.num_vertices(), 3);
}

// ─── Incremental growth ───────────────────────────────────────

#[test]
fn add_triangle_reuses_existing_edges() {
    let mut mesh = SurfaceMesh::from_triangles(4, &[[0, 1, 2]]).unwrap();
    let edges_before = mesh.num_edge_slots();

    mesh.add_triangle([2, 1, 3]).unwrap();

    // Exactly two new edges: (1,3) and (2,3); (1,2) is shared.
    assert_eq!(mesh.num_edge_slots(), edges_before + 2);
    mesh.validate().unwrap();
}

// ─── Generators ───────────────────────────────────────────────

#[test]
fn flat_sheet_counts() {
    let (mesh, positions) = flat_sheet(3, 2, 0.5);
    assert_eq!(positions.len(), 4 * 3);
    assert_eq!(mesh.num_live_triangles(), 3 * 2 * 2);
    mesh.validate().unwrap();
}

#[test]
fn facing_triangle_pair_is_disconnected() {
    let (mesh, positions) = facing_triangle_pair(0.001);
    assert_eq!(positions.len(), 6);
    assert_eq!(mesh.num_live_triangles(), 2);
    assert!(!mesh.triangles_are_adjacent(0, 1));
    assert!((positions[3].z - 0.001).abs() < 1e-15);
}

#[test]
fn double_cone_shares_only_the_apex() {
    let (mesh, positions) = double_cone();
    assert_eq!(positions.len(), 7);
    assert_eq!(mesh.num_live_triangles(), 6);

    // The apex belongs to all six triangles.
    assert_eq!(mesh.vertex_to_triangle_map[0].len(), 6);

    // No triangle of fan A (0..3) shares an edge with fan B (3..6).
    for a in 0..3 {
        for b in 3..6 {
            assert!(!mesh.triangles_are_adjacent(a, b));
        }
    }
    mesh.validate().unwrap();
}
