//! Integration tests for velum-broad.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use velum_broad::{AccelerationGrid, BroadPhase, BroadPhaseGrid};
use velum_math::{Aabb, Vec3};

fn universe() -> Aabb {
    Aabb::from_points(&[Vec3::splat(-1.0e6), Vec3::splat(1.0e6)])
}

fn unit_box_at(p: Vec3) -> Aabb {
    Aabb::from_points(&[p, p + Vec3::ONE])
}

// ─── Grid Round-Trip ──────────────────────────────────────────

#[test]
fn universe_query_returns_exactly_the_live_set() {
    let mut grid = AccelerationGrid::build(
        &[
            (0, unit_box_at(Vec3::ZERO)),
            (3, unit_box_at(Vec3::splat(5.0))),
            (7, unit_box_at(Vec3::splat(-4.0))),
        ],
        1.0,
        1.0,
    );

    grid.add(11, unit_box_at(Vec3::new(2.0, 0.0, 0.0)));
    grid.update(3, unit_box_at(Vec3::splat(9.0)));
    grid.remove(7);

    let mut hits = Vec::new();
    grid.find_overlapping(&universe(), &mut hits);
    assert_eq!(hits, vec![0, 3, 11]);
}

#[test]
fn add_is_silently_ignored_for_present_index() {
    let mut grid = AccelerationGrid::build(&[(4, unit_box_at(Vec3::ZERO))], 1.0, 1.0);
    grid.add(4, unit_box_at(Vec3::splat(50.0)));

    // The cached box must still be the original one.
    let mut hits = Vec::new();
    grid.find_overlapping(&unit_box_at(Vec3::splat(50.0)), &mut hits);
    assert!(hits.is_empty());
    assert_eq!(grid.element_aabb(4).unwrap().low, Vec3::ZERO);
}

#[test]
fn remove_is_idempotent() {
    let mut grid = AccelerationGrid::build(&[(1, unit_box_at(Vec3::ZERO))], 1.0, 1.0);
    grid.remove(1);
    grid.remove(1);
    assert!(grid.is_empty());
}

#[test]
fn update_moves_element_between_cells() {
    let mut grid = AccelerationGrid::build(
        &[(0, unit_box_at(Vec3::ZERO)), (1, unit_box_at(Vec3::splat(20.0)))],
        1.0,
        1.0,
    );

    grid.update(0, unit_box_at(Vec3::splat(20.0)));

    let mut hits = Vec::new();
    grid.find_overlapping(&unit_box_at(Vec3::ZERO), &mut hits);
    assert!(hits.is_empty(), "old region must be vacated");

    hits.clear();
    grid.find_overlapping(&unit_box_at(Vec3::splat(20.0)), &mut hits);
    assert_eq!(hits, vec![0, 1]);
}

// ─── Overlap Soundness ────────────────────────────────────────

#[test]
fn query_agrees_with_brute_force() {
    let mut rng = ChaCha8Rng::seed_from_u64(7);
    let mut boxes = Vec::new();
    for i in 0..200 {
        let p = Vec3::new(
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
            rng.gen_range(-10.0..10.0),
        );
        let e = Vec3::new(
            rng.gen_range(0.1..2.0),
            rng.gen_range(0.1..2.0),
            rng.gen_range(0.1..2.0),
        );
        boxes.push((i, Aabb::from_points(&[p, p + e])));
    }
    let grid = AccelerationGrid::build(&boxes, 1.0, 1.0);

    for _ in 0..50 {
        let p = Vec3::new(
            rng.gen_range(-12.0..12.0),
            rng.gen_range(-12.0..12.0),
            rng.gen_range(-12.0..12.0),
        );
        let query = Aabb::from_points(&[p, p + Vec3::splat(3.0)]);

        let mut hits = Vec::new();
        grid.find_overlapping(&query, &mut hits);

        let expected: Vec<usize> = boxes
            .iter()
            .filter(|(_, aabb)| aabb.intersects(&query))
            .map(|&(i, _)| i)
            .collect();
        assert_eq!(hits, expected);
    }
}

// ─── Broad-Phase Stress ───────────────────────────────────────

#[test]
fn ten_thousand_random_boxes_all_found_once() {
    let mut rng = ChaCha8Rng::seed_from_u64(42);
    let mut boxes = Vec::new();
    for i in 0..10_000 {
        // Unit-ball-bounded centers with small random extents.
        let c = loop {
            let p = Vec3::new(
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
                rng.gen_range(-1.0..1.0),
            );
            if p.length() <= 1.0 {
                break p;
            }
        };
        let half = Vec3::splat(rng.gen_range(0.001..0.02));
        boxes.push((i, Aabb::from_points(&[c - half, c + half])));
    }

    let grid = AccelerationGrid::build(&boxes, 0.02, 1.0);

    let mut hits = Vec::new();
    grid.find_overlapping(&universe(), &mut hits);

    assert_eq!(hits.len(), 10_000, "every box exactly once");
    assert_eq!(hits, (0..10_000).collect::<Vec<_>>());
}

// ─── Solid/Dynamic Partition ──────────────────────────────────

#[test]
fn update_after_flag_toggle_leaves_one_entry() {
    let mut bp = BroadPhaseGrid::default();
    bp.add_vertex(5, unit_box_at(Vec3::ZERO), true);

    // Flag flips solid -> dynamic; the stale solid entry must die.
    bp.update_vertex(5, unit_box_at(Vec3::ZERO), false);

    let mut solid_hits = Vec::new();
    bp.potential_vertex_collisions(&universe(), true, false, &mut solid_hits);
    assert!(solid_hits.is_empty());

    let mut dynamic_hits = Vec::new();
    bp.potential_vertex_collisions(&universe(), false, true, &mut dynamic_hits);
    assert_eq!(dynamic_hits, vec![5]);

    // Querying both grids yields the index exactly once.
    let mut all_hits = Vec::new();
    bp.potential_vertex_collisions(&universe(), true, true, &mut all_hits);
    assert_eq!(all_hits, vec![5]);
}

#[test]
fn removal_clears_both_grids() {
    let mut bp = BroadPhaseGrid::default();
    bp.add_edge(2, unit_box_at(Vec3::ZERO), true);
    bp.add_triangle(2, unit_box_at(Vec3::ZERO), false);

    bp.remove_edge(2);
    bp.remove_triangle(2);

    let mut hits = Vec::new();
    bp.potential_edge_collisions(&universe(), true, true, &mut hits);
    bp.potential_triangle_collisions(&universe(), true, true, &mut hits);
    assert!(hits.is_empty());
}

#[test]
fn query_flags_select_grids() {
    let mut bp = BroadPhaseGrid::default();
    bp.add_triangle(0, unit_box_at(Vec3::ZERO), true);
    bp.add_triangle(1, unit_box_at(Vec3::ZERO), false);

    let mut hits = Vec::new();
    bp.potential_triangle_collisions(&universe(), true, false, &mut hits);
    assert_eq!(hits, vec![0]);

    hits.clear();
    bp.potential_triangle_collisions(&universe(), false, true, &mut hits);
    assert_eq!(hits, vec![1]);

    hits.clear();
    bp.potential_triangle_collisions(&universe(), true, true, &mut hits);
    assert_eq!(hits, vec![0, 1]);
}

#[test]
fn tagged_backend_reports_name() {
    let bp = BroadPhase::new_grid();
    assert_eq!(bp.name(), "uniform_grid");
}
