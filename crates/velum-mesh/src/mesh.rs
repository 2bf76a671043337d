//! Non-destructive triangle connectivity.
//!
//! Builds and incrementally maintains the adjacency tables the
//! collision kernel consumes: triangle vertex triples, edge vertex
//! pairs, and the four incidence maps between them.

use serde::{Deserialize, Serialize};
use velum_types::{VelumError, VelumResult};

/// Slot value marking a removed triangle.
const VACATED_TRIANGLE: [usize; 3] = [0, 0, 0];

/// Slot value marking a removed edge.
const VACATED_EDGE: [usize; 2] = [0, 0];

/// Triangle-surface connectivity with live adjacency tables.
///
/// Vertices, edges, and triangles are identified by stable indices into
/// the corresponding arrays. Removal vacates slots instead of
/// compacting, so an index handed to the broad phase stays valid until
/// the primitive is explicitly removed there too.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceMesh {
    /// Triangle vertex triples. `[0, 0, 0]` marks a vacated slot.
    pub triangles: Vec<[usize; 3]>,

    /// Edge vertex pairs. `[0, 0]` marks a vacated slot.
    pub edges: Vec<[usize; 2]>,

    /// For each vertex, the triangles containing it.
    pub vertex_to_triangle_map: Vec<Vec<usize>>,

    /// For each vertex, the edges containing it.
    pub vertex_to_edge_map: Vec<Vec<usize>>,

    /// For each edge, the one or two (or more, for non-manifold input)
    /// triangles containing it.
    pub edge_to_triangle_map: Vec<Vec<usize>>,

    /// For each triangle, its three edge indices.
    pub triangle_to_edge_map: Vec<[usize; 3]>,
}

impl SurfaceMesh {
    /// Empty mesh.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a mesh from a vertex count and triangle triples.
    pub fn from_triangles(vertex_count: usize, tris: &[[usize; 3]]) -> VelumResult<Self> {
        let mut mesh = Self::new();
        mesh.vertex_to_triangle_map = vec![Vec::new(); vertex_count];
        mesh.vertex_to_edge_map = vec![Vec::new(); vertex_count];
        for tri in tris {
            mesh.add_triangle(*tri)?;
        }
        mesh.validate()?;
        Ok(mesh)
    }

    // ─── Counts and slot queries ───────────────────────────────────

    /// Number of vertex slots.
    #[inline]
    pub fn num_vertices(&self) -> usize {
        self.vertex_to_triangle_map.len()
    }

    /// Number of triangle slots, including vacated ones.
    #[inline]
    pub fn num_triangle_slots(&self) -> usize {
        self.triangles.len()
    }

    /// Number of edge slots, including vacated ones.
    #[inline]
    pub fn num_edge_slots(&self) -> usize {
        self.edges.len()
    }

    /// Vertex triple of triangle `t`.
    #[inline]
    pub fn triangle(&self, t: usize) -> [usize; 3] {
        self.triangles[t]
    }

    /// True if triangle slot `t` has been vacated.
    #[inline]
    pub fn triangle_is_deleted(&self, t: usize) -> bool {
        self.triangles[t] == VACATED_TRIANGLE
    }

    /// True if edge slot `e` has been vacated.
    #[inline]
    pub fn edge_is_deleted(&self, e: usize) -> bool {
        self.edges[e] == VACATED_EDGE
    }

    /// Iterator over live triangle indices.
    pub fn live_triangles(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.triangles.len()).filter(|&t| !self.triangle_is_deleted(t))
    }

    /// Iterator over live edge indices.
    pub fn live_edges(&self) -> impl Iterator<Item = usize> + '_ {
        (0..self.edges.len()).filter(|&e| !self.edge_is_deleted(e))
    }

    /// Number of live triangles.
    pub fn num_live_triangles(&self) -> usize {
        self.live_triangles().count()
    }

    // ─── Lookups ───────────────────────────────────────────────────

    /// Index of the edge joining `v0` and `v1`, in either order.
    pub fn edge_index(&self, v0: usize, v1: usize) -> Option<usize> {
        self.vertex_to_edge_map[v0]
            .iter()
            .copied()
            .find(|&e| self.edges[e] == [v0, v1] || self.edges[e] == [v1, v0])
    }

    /// Index of the triangle with exactly the vertices `{a, b, c}`.
    pub fn triangle_index(&self, a: usize, b: usize, c: usize) -> Option<usize> {
        self.vertex_to_triangle_map[a].iter().copied().find(|&t| {
            let tri = self.triangles[t];
            tri.contains(&a) && tri.contains(&b) && tri.contains(&c)
        })
    }

    /// True if the two triangles share an edge.
    pub fn triangles_are_adjacent(&self, t0: usize, t1: usize) -> bool {
        let e0 = self.triangle_to_edge_map[t0];
        let e1 = self.triangle_to_edge_map[t1];
        e0.iter().any(|e| e1.contains(e))
    }

    // ─── Mutation ──────────────────────────────────────────────────

    /// Append a new vertex slot; returns its index.
    pub fn add_vertex(&mut self) -> usize {
        self.vertex_to_triangle_map.push(Vec::new());
        self.vertex_to_edge_map.push(Vec::new());
        self.vertex_to_triangle_map.len() - 1
    }

    /// Remove a vertex slot. The vertex must have no incident triangles
    /// or edges left.
    ///
    /// The last vertex slot is popped outright; interior slots stay as
    /// empty entries (indices held elsewhere must remain stable).
    pub fn remove_vertex(&mut self, v: usize) -> VelumResult<()> {
        if !self.vertex_to_triangle_map[v].is_empty() || !self.vertex_to_edge_map[v].is_empty() {
            return Err(VelumError::InvalidMesh(format!(
                "vertex {} still has incident primitives",
                v
            )));
        }
        if v + 1 == self.num_vertices() {
            self.vertex_to_triangle_map.pop();
            self.vertex_to_edge_map.pop();
        }
        Ok(())
    }

    /// Append a triangle, creating any missing edges; returns its index.
    pub fn add_triangle(&mut self, tri: [usize; 3]) -> VelumResult<()> {
        let _ = self.add_triangle_get_index(tri)?;
        Ok(())
    }

    /// Append a triangle and return its new index.
    pub fn add_triangle_get_index(&mut self, tri: [usize; 3]) -> VelumResult<usize> {
        let [a, b, c] = tri;
        let n = self.num_vertices();
        if a >= n || b >= n || c >= n {
            return Err(VelumError::InvalidMesh(format!(
                "triangle [{}, {}, {}] references a vertex out of range (vertex count: {})",
                a, b, c, n
            )));
        }
        if a == b || b == c || a == c {
            return Err(VelumError::InvalidMesh(format!(
                "triangle [{}, {}, {}] has repeated vertex indices",
                a, b, c
            )));
        }

        let t = self.triangles.len();
        self.triangles.push(tri);

        for &v in &tri {
            self.vertex_to_triangle_map[v].push(t);
        }

        let mut tri_edges = [0usize; 3];
        for (k, (v0, v1)) in [(a, b), (b, c), (c, a)].into_iter().enumerate() {
            let e = match self.edge_index(v0, v1) {
                Some(e) => e,
                None => self.add_edge(v0, v1),
            };
            self.edge_to_triangle_map[e].push(t);
            tri_edges[k] = e;
        }
        self.triangle_to_edge_map.push(tri_edges);

        Ok(t)
    }

    /// Vacate a triangle slot, pruning adjacency. Edges left with no
    /// incident triangles are vacated too.
    pub fn remove_triangle(&mut self, t: usize) {
        let tri = self.triangles[t];
        if tri == VACATED_TRIANGLE {
            return;
        }

        for &v in &tri {
            self.vertex_to_triangle_map[v].retain(|&x| x != t);
        }

        for &e in &self.triangle_to_edge_map[t].clone() {
            self.edge_to_triangle_map[e].retain(|&x| x != t);
            if self.edge_to_triangle_map[e].is_empty() {
                self.remove_edge(e);
            }
        }

        self.triangles[t] = VACATED_TRIANGLE;
        self.triangle_to_edge_map[t] = [0, 0, 0];
    }

    fn add_edge(&mut self, v0: usize, v1: usize) -> usize {
        let e = self.edges.len();
        self.edges.push([v0, v1]);
        self.edge_to_triangle_map.push(Vec::new());
        self.vertex_to_edge_map[v0].push(e);
        self.vertex_to_edge_map[v1].push(e);
        e
    }

    fn remove_edge(&mut self, e: usize) {
        let [v0, v1] = self.edges[e];
        self.vertex_to_edge_map[v0].retain(|&x| x != e);
        self.vertex_to_edge_map[v1].retain(|&x| x != e);
        self.edges[e] = VACATED_EDGE;
    }

    // ─── Validation ────────────────────────────────────────────────

    /// Check adjacency-table consistency.
    ///
    /// Verifies:
    /// - every live triangle's vertices are in range and distinct
    /// - incidence maps agree with the triangle and edge arrays
    /// - every triangle's three edges exist and contain its vertices
    pub fn validate(&self) -> VelumResult<()> {
        let n = self.num_vertices();

        for t in self.live_triangles() {
            let [a, b, c] = self.triangles[t];
            if a >= n || b >= n || c >= n {
                return Err(VelumError::InvalidMesh(format!(
                    "triangle {} references a vertex out of range",
                    t
                )));
            }
            if a == b || b == c || a == c {
                return Err(VelumError::InvalidMesh(format!(
                    "triangle {} is degenerate: [{}, {}, {}]",
                    t, a, b, c
                )));
            }
            for &v in &[a, b, c] {
                if !self.vertex_to_triangle_map[v].contains(&t) {
                    return Err(VelumError::InvalidMesh(format!(
                        "vertex {} missing incidence for triangle {}",
                        v, t
                    )));
                }
            }
            for (v0, v1) in [(a, b), (b, c), (c, a)] {
                let e = self.edge_index(v0, v1).ok_or_else(|| {
                    VelumError::InvalidMesh(format!(
                        "edge ({}, {}) of triangle {} is missing",
                        v0, v1, t
                    ))
                })?;
                if !self.edge_to_triangle_map[e].contains(&t) {
                    return Err(VelumError::InvalidMesh(format!(
                        "edge {} missing incidence for triangle {}",
                        e, t
                    )));
                }
            }
        }

        for e in self.live_edges() {
            let [v0, v1] = self.edges[e];
            if v0 >= n || v1 >= n || v0 == v1 {
                return Err(VelumError::InvalidMesh(format!("edge {} is malformed", e)));
            }
            if !self.vertex_to_edge_map[v0].contains(&e) || !self.vertex_to_edge_map[v1].contains(&e)
            {
                return Err(VelumError::InvalidMesh(format!(
                    "edge {} missing vertex incidence",
                    e
                )));
            }
        }

        Ok(())
    }
}
