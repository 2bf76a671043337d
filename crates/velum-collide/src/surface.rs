//! Dynamic surface state.
//!
//! [`DynamicSurface`] owns everything the pipeline borrows: the mesh
//! connectivity, the per-vertex state arrays (current position,
//! predicted position, velocity, mass), the broad phase, and the
//! tunables. The pipeline and pincher are non-owning façades over it.

use velum_broad::BroadPhase;
use velum_math::{Aabb, Vec3};
use velum_mesh::SurfaceMesh;
use velum_types::constants::{AABB_PADDING, PROXIMITY_EPSILON};
use velum_types::{VelumError, VelumResult};

/// The evolving triangle surface.
///
/// Solid (scripted, immovable) vertices carry `mass == f64::INFINITY`,
/// which makes their inverse mass exactly zero — impulses leave them
/// untouched without any special-casing.
#[derive(Debug)]
pub struct DynamicSurface {
    /// Mesh connectivity and adjacency.
    pub mesh: SurfaceMesh,
    /// Current vertex positions.
    pub positions: Vec<Vec3>,
    /// Predicted end-of-step positions.
    pub newpositions: Vec<Vec3>,
    /// Vertex velocities.
    pub velocities: Vec<Vec3>,
    /// Vertex masses; `INFINITY` pins a vertex.
    pub masses: Vec<f64>,
    /// Broad-phase acceleration structure.
    pub broad_phase: BroadPhase,
    /// Distance below which the repulsion pass engages.
    pub proximity_epsilon: f64,
    /// Padding applied to every broad-phase box.
    pub aabb_padding: f64,
    /// Whether topology operations must prove collision safety.
    pub collision_safety: bool,
}

impl DynamicSurface {
    /// Build a surface from connectivity, positions, and masses.
    ///
    /// Velocities start at zero and predicted positions at the current
    /// positions; the broad phase is built from static bounds.
    pub fn new(mesh: SurfaceMesh, positions: Vec<Vec3>, masses: Vec<f64>) -> VelumResult<Self> {
        if positions.len() != mesh.num_vertices() || masses.len() != mesh.num_vertices() {
            return Err(VelumError::InvalidMesh(format!(
                "state arrays ({} positions, {} masses) do not match vertex count {}",
                positions.len(),
                masses.len(),
                mesh.num_vertices()
            )));
        }
        mesh.validate()?;

        let newpositions = positions.clone();
        let velocities = vec![Vec3::ZERO; positions.len()];
        let mut surface = Self {
            mesh,
            positions,
            newpositions,
            velocities,
            masses,
            broad_phase: BroadPhase::new_grid(),
            proximity_epsilon: PROXIMITY_EPSILON,
            aabb_padding: AABB_PADDING,
            collision_safety: true,
        };
        surface.update_broad_phase(false);
        Ok(surface)
    }

    /// Number of vertex slots.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.positions.len()
    }

    /// Current position of vertex `i`.
    #[inline]
    pub fn position(&self, i: usize) -> Vec3 {
        self.positions[i]
    }

    /// Predicted position of vertex `i`.
    #[inline]
    pub fn newposition(&self, i: usize) -> Vec3 {
        self.newpositions[i]
    }

    /// Overwrite the current position of vertex `i`.
    #[inline]
    pub fn set_position(&mut self, i: usize, p: Vec3) {
        self.positions[i] = p;
    }

    /// Overwrite the predicted position of vertex `i`.
    #[inline]
    pub fn set_newposition(&mut self, i: usize, p: Vec3) {
        self.newpositions[i] = p;
    }

    /// Inverse mass of vertex `i` (zero for solid vertices).
    #[inline]
    pub fn inverse_mass(&self, i: usize) -> f64 {
        1.0 / self.masses[i]
    }

    // ─── Solidity ──────────────────────────────────────────────────

    /// True if vertex `i` is scripted (immovable).
    #[inline]
    pub fn vertex_is_solid(&self, i: usize) -> bool {
        self.masses[i] == f64::INFINITY
    }

    /// An edge is solid iff both its vertices are.
    pub fn edge_is_solid(&self, e: usize) -> bool {
        let [v0, v1] = self.mesh.edges[e];
        self.vertex_is_solid(v0) && self.vertex_is_solid(v1)
    }

    /// A triangle is solid iff all three vertices are.
    pub fn triangle_is_solid(&self, t: usize) -> bool {
        let [v0, v1, v2] = self.mesh.triangles[t];
        self.vertex_is_solid(v0) && self.vertex_is_solid(v1) && self.vertex_is_solid(v2)
    }

    // ─── Bounds ────────────────────────────────────────────────────

    /// Padded box around vertex `i` at its current position.
    pub fn vertex_static_bounds(&self, i: usize) -> Aabb {
        Aabb::point(self.positions[i]).padded(self.aabb_padding)
    }

    /// Padded box around vertex `i` spanning current and predicted
    /// positions.
    pub fn vertex_continuous_bounds(&self, i: usize) -> Aabb {
        Aabb::from_points(&[self.positions[i], self.newpositions[i]]).padded(self.aabb_padding)
    }

    /// Padded box around edge `e` at current positions.
    pub fn edge_static_bounds(&self, e: usize) -> Aabb {
        let [v0, v1] = self.mesh.edges[e];
        Aabb::from_points(&[self.positions[v0], self.positions[v1]]).padded(self.aabb_padding)
    }

    /// Padded box around edge `e` spanning current and predicted
    /// positions.
    pub fn edge_continuous_bounds(&self, e: usize) -> Aabb {
        let [v0, v1] = self.mesh.edges[e];
        Aabb::from_points(&[
            self.positions[v0],
            self.positions[v1],
            self.newpositions[v0],
            self.newpositions[v1],
        ])
        .padded(self.aabb_padding)
    }

    /// Padded box around triangle `t` at current positions.
    pub fn triangle_static_bounds(&self, t: usize) -> Aabb {
        let [v0, v1, v2] = self.mesh.triangles[t];
        Aabb::from_points(&[self.positions[v0], self.positions[v1], self.positions[v2]])
            .padded(self.aabb_padding)
    }

    /// Padded box around triangle `t` spanning current and predicted
    /// positions.
    pub fn triangle_continuous_bounds(&self, t: usize) -> Aabb {
        let [v0, v1, v2] = self.mesh.triangles[t];
        Aabb::from_points(&[
            self.positions[v0],
            self.positions[v1],
            self.positions[v2],
            self.newpositions[v0],
            self.newpositions[v1],
            self.newpositions[v2],
        ])
        .padded(self.aabb_padding)
    }

    /// Mean length of the live edges, or 1 for an edgeless mesh.
    pub fn mean_edge_length(&self) -> f64 {
        let mut total = 0.0;
        let mut count = 0usize;
        for e in self.mesh.live_edges() {
            let [v0, v1] = self.mesh.edges[e];
            total += (self.positions[v1] - self.positions[v0]).length();
            count += 1;
        }
        if count == 0 {
            1.0
        } else {
            total / count as f64
        }
    }

    // ─── Broad-phase maintenance ───────────────────────────────────

    /// Discard and rebuild all six grids from the current mesh.
    ///
    /// `continuous` selects continuous bounds (current ∪ predicted)
    /// instead of static ones. Cell size follows the mean edge length.
    pub fn update_broad_phase(&mut self, continuous: bool) {
        let length_scale = self.mean_edge_length();

        let mut solid = Vec::new();
        let mut dynamic = Vec::new();
        for v in 0..self.num_vertices() {
            let aabb = if continuous {
                self.vertex_continuous_bounds(v)
            } else {
                self.vertex_static_bounds(v)
            };
            if self.vertex_is_solid(v) {
                solid.push((v, aabb));
            } else {
                dynamic.push((v, aabb));
            }
        }
        let grid = self.broad_phase.grid_mut();
        grid.rebuild_vertex_grids(&solid, &dynamic, length_scale, 1.0);

        solid.clear();
        dynamic.clear();
        for e in self.mesh.live_edges().collect::<Vec<_>>() {
            let aabb = if continuous {
                self.edge_continuous_bounds(e)
            } else {
                self.edge_static_bounds(e)
            };
            if self.edge_is_solid(e) {
                solid.push((e, aabb));
            } else {
                dynamic.push((e, aabb));
            }
        }
        let grid = self.broad_phase.grid_mut();
        grid.rebuild_edge_grids(&solid, &dynamic, length_scale, 1.0);

        solid.clear();
        dynamic.clear();
        for t in self.mesh.live_triangles().collect::<Vec<_>>() {
            let aabb = if continuous {
                self.triangle_continuous_bounds(t)
            } else {
                self.triangle_static_bounds(t)
            };
            if self.triangle_is_solid(t) {
                solid.push((t, aabb));
            } else {
                dynamic.push((t, aabb));
            }
        }
        let grid = self.broad_phase.grid_mut();
        grid.rebuild_triangle_grids(&solid, &dynamic, length_scale, 1.0);
    }

    // ─── Incremental mutation (kept in sync with the broad phase) ──

    /// Append a vertex; returns its index.
    pub fn add_vertex(&mut self, position: Vec3, mass: f64) -> usize {
        let v = self.mesh.add_vertex();
        self.positions.push(position);
        self.newpositions.push(position);
        self.velocities.push(Vec3::ZERO);
        self.masses.push(mass);
        let aabb = self.vertex_continuous_bounds(v);
        let is_solid = self.vertex_is_solid(v);
        self.broad_phase.grid_mut().add_vertex(v, aabb, is_solid);
        v
    }

    /// Remove a vertex with no remaining incident primitives.
    ///
    /// The last vertex slot is popped outright, which makes
    /// add-then-remove sequences (the pincher's rollback) restore the
    /// exact pre-call state.
    pub fn remove_vertex(&mut self, v: usize) -> VelumResult<()> {
        let was_last = v + 1 == self.num_vertices();
        self.mesh.remove_vertex(v)?;
        self.broad_phase.grid_mut().remove_vertex(v);
        if was_last {
            self.positions.pop();
            self.newpositions.pop();
            self.velocities.pop();
            self.masses.pop();
        }
        Ok(())
    }

    /// Refresh the broad-phase entry of a vertex whose position moved.
    pub fn refresh_vertex_bounds(&mut self, v: usize) {
        let aabb = self.vertex_continuous_bounds(v);
        let is_solid = self.vertex_is_solid(v);
        self.broad_phase.grid_mut().update_vertex(v, aabb, is_solid);
    }

    /// Add a triangle (creating any missing edges) and register it and
    /// its new edges with the broad phase. Returns the triangle index.
    pub fn add_triangle(&mut self, tri: [usize; 3]) -> VelumResult<usize> {
        let t = self.mesh.add_triangle_get_index(tri)?;
        let aabb = self.triangle_continuous_bounds(t);
        let is_solid = self.triangle_is_solid(t);
        self.broad_phase.grid_mut().add_triangle(t, aabb, is_solid);
        for e in self.mesh.triangle_to_edge_map[t] {
            let aabb = self.edge_continuous_bounds(e);
            let is_solid = self.edge_is_solid(e);
            // `add` is a no-op for edges the broad phase already holds.
            self.broad_phase.grid_mut().add_edge(e, aabb, is_solid);
        }
        Ok(t)
    }

    /// Remove a triangle from the mesh and broad phase. Edges orphaned
    /// by the removal are dropped from the broad phase too.
    pub fn remove_triangle(&mut self, t: usize) {
        let edges = self.mesh.triangle_to_edge_map[t];
        let was_live = !self.mesh.triangle_is_deleted(t);
        self.mesh.remove_triangle(t);
        if was_live {
            self.broad_phase.grid_mut().remove_triangle(t);
            for e in edges {
                if self.mesh.edge_is_deleted(e) {
                    self.broad_phase.grid_mut().remove_edge(e);
                }
            }
        }
    }
}
