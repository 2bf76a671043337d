//! Procedural mesh generators for tests and benchmarks.
//!
//! Deterministic fixtures returning connectivity plus vertex positions.

use velum_math::Vec3;

use crate::mesh::SurfaceMesh;

/// Flat sheet of `cols` × `rows` quads in the XY plane at z = 0,
/// `spacing` apart, each quad split into two triangles.
pub fn flat_sheet(cols: usize, rows: usize, spacing: f64) -> (SurfaceMesh, Vec<Vec3>) {
    let verts_x = cols + 1;
    let verts_y = rows + 1;

    let mut positions = Vec::with_capacity(verts_x * verts_y);
    for j in 0..verts_y {
        for i in 0..verts_x {
            positions.push(Vec3::new(i as f64 * spacing, j as f64 * spacing, 0.0));
        }
    }

    let mut tris = Vec::with_capacity(cols * rows * 2);
    for j in 0..rows {
        for i in 0..cols {
            let tl = j * verts_x + i;
            let tr = tl + 1;
            let bl = tl + verts_x;
            let br = bl + 1;
            tris.push([tl, bl, tr]);
            tris.push([tr, bl, br]);
        }
    }

    let mesh = SurfaceMesh::from_triangles(positions.len(), &tris)
        .expect("generated sheet is well-formed");
    (mesh, positions)
}

/// Two unit right triangles facing each other across a `gap` along z.
///
/// Triangle 0 is (0,0,0)-(1,0,0)-(0,1,0); triangle 1 is the same shape
/// shifted to z = `gap`. Vertices 0..3 belong to the first triangle,
/// 3..6 to the second.
pub fn facing_triangle_pair(gap: f64) -> (SurfaceMesh, Vec<Vec3>) {
    let positions = vec![
        Vec3::new(0.0, 0.0, 0.0),
        Vec3::new(1.0, 0.0, 0.0),
        Vec3::new(0.0, 1.0, 0.0),
        Vec3::new(0.0, 0.0, gap),
        Vec3::new(1.0, 0.0, gap),
        Vec3::new(0.0, 1.0, gap),
    ];
    let mesh = SurfaceMesh::from_triangles(6, &[[0, 1, 2], [3, 4, 5]])
        .expect("generated pair is well-formed");
    (mesh, positions)
}

/// Two triangle fans sharing a single apex vertex — the canonical
/// pinchable configuration.
///
/// The apex is vertex 0 at the origin. Fan A has its ring at z = +1,
/// fan B at z = -1; the fans share no edge through the apex.
pub fn double_cone() -> (SurfaceMesh, Vec<Vec3>) {
    let mut positions = vec![Vec3::ZERO];
    let ring = |z: f64, out: &mut Vec<Vec3>| {
        for k in 0..3 {
            let theta = k as f64 * std::f64::consts::TAU / 3.0;
            out.push(Vec3::new(theta.cos(), theta.sin(), z));
        }
    };
    ring(1.0, &mut positions); // vertices 1, 2, 3
    ring(-1.0, &mut positions); // vertices 4, 5, 6

    let tris = [
        [0, 1, 2],
        [0, 2, 3],
        [0, 3, 1],
        [0, 5, 4],
        [0, 6, 5],
        [0, 4, 6],
    ];
    let mesh =
        SurfaceMesh::from_triangles(7, &tris).expect("generated double cone is well-formed");
    (mesh, positions)
}
