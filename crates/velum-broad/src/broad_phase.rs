//! Six-grid broad phase.
//!
//! One acceleration grid per (primitive kind, solid flag) pair. An
//! index lives in exactly one grid of its kind at a time, so flag-
//! filtered queries concatenate grid outputs without deduplication.

use velum_math::Aabb;

use crate::acceleration_grid::AccelerationGrid;

/// Broad-phase backend dispatch.
///
/// Tagged variants rather than trait objects: backends are few, known,
/// and chosen at construction, and match-dispatch keeps the query path
/// monomorphic.
#[derive(Debug, Clone)]
pub enum BroadPhase {
    /// Uniform-grid backend.
    Grid(BroadPhaseGrid),
}

impl BroadPhase {
    /// Grid-backed broad phase with empty grids.
    pub fn new_grid() -> Self {
        Self::Grid(BroadPhaseGrid::default())
    }

    /// Backend name, for telemetry.
    pub fn name(&self) -> &str {
        match self {
            Self::Grid(_) => "uniform_grid",
        }
    }

    /// The grid backend.
    #[inline]
    pub fn grid(&self) -> &BroadPhaseGrid {
        match self {
            Self::Grid(g) => g,
        }
    }

    /// The grid backend, mutably.
    #[inline]
    pub fn grid_mut(&mut self) -> &mut BroadPhaseGrid {
        match self {
            Self::Grid(g) => g,
        }
    }
}

/// Broad phase backed by six regular grids: one grid each for solid and
/// dynamic vertices, edges, and triangles.
#[derive(Debug, Clone, Default)]
pub struct BroadPhaseGrid {
    solid_vertex_grid: AccelerationGrid,
    solid_edge_grid: AccelerationGrid,
    solid_triangle_grid: AccelerationGrid,

    dynamic_vertex_grid: AccelerationGrid,
    dynamic_edge_grid: AccelerationGrid,
    dynamic_triangle_grid: AccelerationGrid,
}

impl BroadPhaseGrid {
    // ─── Incremental maintenance ───────────────────────────────────

    /// Add a vertex to the grid selected by `is_solid`.
    pub fn add_vertex(&mut self, index: usize, aabb: Aabb, is_solid: bool) {
        if is_solid {
            self.solid_vertex_grid.add(index, aabb);
        } else {
            self.dynamic_vertex_grid.add(index, aabb);
        }
    }

    /// Add an edge to the grid selected by `is_solid`.
    pub fn add_edge(&mut self, index: usize, aabb: Aabb, is_solid: bool) {
        if is_solid {
            self.solid_edge_grid.add(index, aabb);
        } else {
            self.dynamic_edge_grid.add(index, aabb);
        }
    }

    /// Add a triangle to the grid selected by `is_solid`.
    pub fn add_triangle(&mut self, index: usize, aabb: Aabb, is_solid: bool) {
        if is_solid {
            self.solid_triangle_grid.add(index, aabb);
        } else {
            self.dynamic_triangle_grid.add(index, aabb);
        }
    }

    /// Refresh a vertex box. The solid flag of an index may have
    /// toggled since it was added, so the stale twin entry is removed
    /// first.
    pub fn update_vertex(&mut self, index: usize, aabb: Aabb, is_solid: bool) {
        if is_solid {
            self.dynamic_vertex_grid.remove(index);
            self.solid_vertex_grid.update(index, aabb);
        } else {
            self.solid_vertex_grid.remove(index);
            self.dynamic_vertex_grid.update(index, aabb);
        }
    }

    /// Refresh an edge box; see [`update_vertex`](Self::update_vertex).
    pub fn update_edge(&mut self, index: usize, aabb: Aabb, is_solid: bool) {
        if is_solid {
            self.dynamic_edge_grid.remove(index);
            self.solid_edge_grid.update(index, aabb);
        } else {
            self.solid_edge_grid.remove(index);
            self.dynamic_edge_grid.update(index, aabb);
        }
    }

    /// Refresh a triangle box; see [`update_vertex`](Self::update_vertex).
    pub fn update_triangle(&mut self, index: usize, aabb: Aabb, is_solid: bool) {
        if is_solid {
            self.dynamic_triangle_grid.remove(index);
            self.solid_triangle_grid.update(index, aabb);
        } else {
            self.solid_triangle_grid.remove(index);
            self.dynamic_triangle_grid.update(index, aabb);
        }
    }

    /// Remove a vertex from both the solid and dynamic grids.
    pub fn remove_vertex(&mut self, index: usize) {
        self.solid_vertex_grid.remove(index);
        self.dynamic_vertex_grid.remove(index);
    }

    /// Remove an edge from both the solid and dynamic grids.
    pub fn remove_edge(&mut self, index: usize) {
        self.solid_edge_grid.remove(index);
        self.dynamic_edge_grid.remove(index);
    }

    /// Remove a triangle from both the solid and dynamic grids.
    pub fn remove_triangle(&mut self, index: usize) {
        self.solid_triangle_grid.remove(index);
        self.dynamic_triangle_grid.remove(index);
    }

    // ─── Bulk rebuild ──────────────────────────────────────────────

    /// Discard and rebuild the vertex grids from `(index, aabb)` lists.
    pub fn rebuild_vertex_grids(
        &mut self,
        solid: &[(usize, Aabb)],
        dynamic: &[(usize, Aabb)],
        length_scale: f64,
        padding_factor: f64,
    ) {
        self.solid_vertex_grid = AccelerationGrid::build(solid, length_scale, padding_factor);
        self.dynamic_vertex_grid = AccelerationGrid::build(dynamic, length_scale, padding_factor);
    }

    /// Discard and rebuild the edge grids from `(index, aabb)` lists.
    pub fn rebuild_edge_grids(
        &mut self,
        solid: &[(usize, Aabb)],
        dynamic: &[(usize, Aabb)],
        length_scale: f64,
        padding_factor: f64,
    ) {
        self.solid_edge_grid = AccelerationGrid::build(solid, length_scale, padding_factor);
        self.dynamic_edge_grid = AccelerationGrid::build(dynamic, length_scale, padding_factor);
    }

    /// Discard and rebuild the triangle grids from `(index, aabb)` lists.
    pub fn rebuild_triangle_grids(
        &mut self,
        solid: &[(usize, Aabb)],
        dynamic: &[(usize, Aabb)],
        length_scale: f64,
        padding_factor: f64,
    ) {
        self.solid_triangle_grid = AccelerationGrid::build(solid, length_scale, padding_factor);
        self.dynamic_triangle_grid = AccelerationGrid::build(dynamic, length_scale, padding_factor);
    }

    // ─── Queries ───────────────────────────────────────────────────

    /// Append the vertices whose boxes overlap `query`, drawn from the
    /// grids selected by the two flags.
    pub fn potential_vertex_collisions(
        &self,
        query: &Aabb,
        return_solid: bool,
        return_dynamic: bool,
        out: &mut Vec<usize>,
    ) {
        if return_solid {
            self.solid_vertex_grid.find_overlapping(query, out);
        }
        if return_dynamic {
            self.dynamic_vertex_grid.find_overlapping(query, out);
        }
    }

    /// Append the edges whose boxes overlap `query`.
    pub fn potential_edge_collisions(
        &self,
        query: &Aabb,
        return_solid: bool,
        return_dynamic: bool,
        out: &mut Vec<usize>,
    ) {
        if return_solid {
            self.solid_edge_grid.find_overlapping(query, out);
        }
        if return_dynamic {
            self.dynamic_edge_grid.find_overlapping(query, out);
        }
    }

    /// Append the triangles whose boxes overlap `query`.
    pub fn potential_triangle_collisions(
        &self,
        query: &Aabb,
        return_solid: bool,
        return_dynamic: bool,
        out: &mut Vec<usize>,
    ) {
        if return_solid {
            self.solid_triangle_grid.find_overlapping(query, out);
        }
        if return_dynamic {
            self.dynamic_triangle_grid.find_overlapping(query, out);
        }
    }

    /// Cached vertex box, from whichever grid holds the index.
    pub fn vertex_aabb(&self, index: usize) -> Option<Aabb> {
        self.solid_vertex_grid
            .element_aabb(index)
            .or_else(|| self.dynamic_vertex_grid.element_aabb(index))
    }

    /// Cached edge box, from whichever grid holds the index.
    pub fn edge_aabb(&self, index: usize) -> Option<Aabb> {
        self.solid_edge_grid
            .element_aabb(index)
            .or_else(|| self.dynamic_edge_grid.element_aabb(index))
    }

    /// Cached triangle box, from whichever grid holds the index.
    pub fn triangle_aabb(&self, index: usize) -> Option<Aabb> {
        self.solid_triangle_grid
            .element_aabb(index)
            .or_else(|| self.dynamic_triangle_grid.element_aabb(index))
    }
}
