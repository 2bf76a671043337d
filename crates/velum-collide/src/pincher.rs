//! Vertex pinching.
//!
//! A vertex whose incident triangle fan falls apart into two or more
//! connected components is a pinch point: the surface touches itself
//! there without sharing any area. Splitting such a vertex into one
//! copy per component separates the components cleanly — provided the
//! retargeted triangles don't collide with the rest of the mesh, which
//! is re-checked against the live broad phase before committing.

use std::collections::VecDeque;

use velum_math::Vec3;
use velum_telemetry::{EventKind, TrackerEvent};
use velum_types::constants::PULL_APART_FACTOR;
use velum_types::VelumResult;

use crate::intersect;
use crate::pipeline::CollisionPipeline;
use crate::surface::DynamicSurface;

/// Splits vertices whose incident triangle fans are disconnected.
#[derive(Debug, Clone)]
pub struct MeshPincher {
    /// Pull-apart distance as a multiple of the proximity epsilon.
    pub separation_factor: f64,
}

impl Default for MeshPincher {
    fn default() -> Self {
        Self {
            separation_factor: PULL_APART_FACTOR,
        }
    }
}

impl MeshPincher {
    /// Partition the triangles incident to `vertex` into connected
    /// components, where two triangles connect iff they share an edge
    /// that itself contains `vertex`. Components come back in
    /// discovery order.
    pub fn partition_vertex_neighbourhood(
        &self,
        surface: &DynamicSurface,
        vertex: usize,
    ) -> Vec<Vec<usize>> {
        let mesh = &surface.mesh;
        let mut remaining: Vec<usize> = mesh.vertex_to_triangle_map[vertex].clone();
        let mut components = Vec::new();

        while let Some(&seed) = remaining.last() {
            let mut component = Vec::new();
            let mut frontier = VecDeque::from([seed]);
            remaining.pop();

            while let Some(t) = frontier.pop_front() {
                component.push(t);

                // Adjacency restricted to edges through the vertex: the
                // two edges of `t` containing `vertex` name the fan
                // neighbours.
                for &e in &mesh.triangle_to_edge_map[t] {
                    let edge = mesh.edges[e];
                    if edge[0] != vertex && edge[1] != vertex {
                        continue;
                    }
                    for &neighbour in &mesh.edge_to_triangle_map[e] {
                        if let Some(pos) = remaining.iter().position(|&r| r == neighbour) {
                            remaining.swap_remove(pos);
                            frontier.push_back(neighbour);
                        }
                    }
                }
            }

            components.push(component);
        }

        components
    }

    /// Split `vertex` into one copy per connected component.
    ///
    /// For every component except the last, a duplicate vertex is
    /// created at the original position and mass, the component's
    /// triangles are retargeted to it, and it is nudged toward the
    /// centroid of the retargeted triangles' other vertices. If any new
    /// triangle would intersect the mesh (or another new triangle), the
    /// whole operation rolls back and `false` is returned.
    pub fn pull_apart_vertex(
        &self,
        surface: &mut DynamicSurface,
        pipeline: &mut CollisionPipeline,
        vertex: usize,
        components: &[Vec<usize>],
    ) -> VelumResult<bool> {
        let dx = self.separation_factor * surface.proximity_epsilon;

        let mut triangles_to_delete: Vec<usize> = Vec::new();
        let mut triangles_to_add: Vec<[usize; 3]> = Vec::new();
        let mut vertices_added: Vec<usize> = Vec::new();

        for component in &components[..components.len().saturating_sub(1)] {
            let duplicate =
                surface.add_vertex(surface.position(vertex), surface.masses[vertex]);
            vertices_added.push(duplicate);

            let mut centroid = Vec3::ZERO;
            for &t in component {
                let mut new_triangle = surface.mesh.triangle(t);
                for slot in new_triangle.iter_mut() {
                    if *slot == vertex {
                        *slot = duplicate;
                    } else {
                        centroid += surface.position(*slot);
                    }
                }
                triangles_to_add.push(new_triangle);
                triangles_to_delete.push(t);
            }
            centroid /= (component.len() * 2) as f64;

            // Nudge the copy toward its own fan so the two sides of the
            // pinch separate immediately.
            let pulled = surface.position(duplicate) * (1.0 - dx) + centroid * dx;
            surface.set_position(duplicate, pulled);
            surface.set_newposition(duplicate, pulled);
            surface.refresh_vertex_bounds(duplicate);
        }

        // Collision safety: the retargeted triangles must not intersect
        // anything, including each other.
        let mut collision_occurs = false;

        if surface.collision_safety {
            'outer: for new_triangle in &triangles_to_add {
                let query = velum_math::Aabb::from_points(&[
                    surface.position(new_triangle[0]),
                    surface.position(new_triangle[1]),
                    surface.position(new_triangle[2]),
                ]);
                let mut overlapping = Vec::new();
                surface
                    .broad_phase
                    .grid()
                    .potential_triangle_collisions(&query, true, true, &mut overlapping);

                for other in overlapping {
                    let other_tri = surface.mesh.triangle(other);
                    if intersect::triangle_triangle_intersection(
                        *new_triangle,
                        other_tri,
                        &surface.positions,
                    ) {
                        collision_occurs = true;
                        break 'outer;
                    }
                }
            }

            if !collision_occurs {
                'pairwise: for i in 0..triangles_to_add.len() {
                    for j in (i + 1)..triangles_to_add.len() {
                        if intersect::triangle_triangle_intersection(
                            triangles_to_add[i],
                            triangles_to_add[j],
                            &surface.positions,
                        ) {
                            collision_occurs = true;
                            break 'pairwise;
                        }
                    }
                }
            }
        }

        if collision_occurs {
            // Roll back: drop the duplicates in reverse so the state
            // arrays shrink back to their pre-call lengths.
            for &added in vertices_added.iter().rev() {
                surface.remove_vertex(added)?;
            }
            pipeline.telemetry.emit(TrackerEvent::new(
                pipeline.step,
                EventKind::PinchAttempt {
                    vertex,
                    components: components.len(),
                    committed: false,
                },
            ));
            return Ok(false);
        }

        // Commit.
        for new_triangle in &triangles_to_add {
            surface.add_triangle(*new_triangle)?;
        }
        for &t in &triangles_to_delete {
            surface.remove_triangle(t);
        }

        if surface.collision_safety {
            pipeline.assert_mesh_is_intersection_free(surface, false);
        }

        tracing::debug!(vertex, copies = vertices_added.len(), "pulled apart a vertex");
        pipeline.telemetry.emit(TrackerEvent::new(
            pipeline.step,
            EventKind::PinchAttempt {
                vertex,
                components: components.len(),
                committed: true,
            },
        ));

        Ok(true)
    }

    /// Find all vertices with disconnected neighbourhoods and pull them
    /// apart. Returns the number of committed pinches.
    pub fn process_mesh(
        &self,
        surface: &mut DynamicSurface,
        pipeline: &mut CollisionPipeline,
    ) -> VelumResult<usize> {
        let mut pinches = 0;
        let mut v = 0;
        while v < surface.num_vertices() {
            let components = self.partition_vertex_neighbourhood(surface, v);
            if components.len() > 1
                && self.pull_apart_vertex(surface, pipeline, v, &components)?
            {
                pinches += 1;
            }
            v += 1;
        }
        Ok(pinches)
    }
}
