//! Uniform spatial grid over element bounding boxes.
//!
//! Each registered element occupies every grid cell its AABB touches.
//! Queries gather the occupants of the cells a query box touches,
//! deduplicate, and filter by exact AABB overlap — expected
//! O(hits + cells touched).

use rustc_hash::FxHashMap;
use velum_math::{Aabb, Vec3};

/// Maximum grid resolution per axis. When the scene extent divided by
/// the requested cell size would exceed this, the cell size grows to
/// cover the extent at this resolution instead.
pub const MAX_GRID_DIM: usize = 128;

/// Per-element record: the cached AABB and the inclusive cell range it
/// occupies.
#[derive(Debug, Clone)]
struct GridEntry {
    aabb: Aabb,
    cell_low: [usize; 3],
    cell_high: [usize; 3],
}

/// Uniform spatial hash over axis-aligned bounding boxes.
///
/// Invariant: an element index appears in exactly the cells its cached
/// AABB touches, and the cached AABB equals the box most recently
/// supplied via [`add`](Self::add) or [`update`](Self::update).
#[derive(Debug, Clone)]
pub struct AccelerationGrid {
    origin: Vec3,
    cell_size: f64,
    dims: [usize; 3],
    /// Flat cell array, x-major: index = (k * ny + j) * nx + i.
    cells: Vec<Vec<usize>>,
    elements: FxHashMap<usize, GridEntry>,
}

impl Default for AccelerationGrid {
    fn default() -> Self {
        // Unit cell at the origin; rebuilt on first bulk build.
        Self::with_parameters(Vec3::ZERO, 1.0, [1, 1, 1])
    }
}

impl AccelerationGrid {
    /// Grid with explicit origin, cell edge length, and dimensions.
    pub fn with_parameters(origin: Vec3, cell_size: f64, dims: [usize; 3]) -> Self {
        let n = dims[0] * dims[1] * dims[2];
        Self {
            origin,
            cell_size,
            dims,
            cells: vec![Vec::new(); n],
            elements: FxHashMap::default(),
        }
    }

    /// Bulk build from `(index, aabb)` pairs.
    ///
    /// `length_scale` is the caller's element-size estimate (typically
    /// the mean edge length); `padding_factor` (≥ 1) widens cells so
    /// neighbouring elements tend to share them. The origin sits one
    /// cell below the union's min corner.
    pub fn build(elements: &[(usize, Aabb)], length_scale: f64, padding_factor: f64) -> Self {
        if elements.is_empty() {
            return Self::default();
        }

        let mut union = elements[0].1;
        for (_, aabb) in &elements[1..] {
            union = union.union(aabb);
        }

        let mut cell_size = (length_scale * padding_factor).max(f64::MIN_POSITIVE);
        let extent = union.extents();
        let max_extent = extent.x.max(extent.y).max(extent.z);
        if max_extent / cell_size > MAX_GRID_DIM as f64 {
            cell_size = max_extent / MAX_GRID_DIM as f64;
        }

        let origin = union.low - Vec3::splat(cell_size);
        let span = union.high - origin;
        let dim = |s: f64| ((s / cell_size).ceil() as usize + 1).clamp(1, MAX_GRID_DIM);
        let dims = [dim(span.x), dim(span.y), dim(span.z)];

        let mut grid = Self::with_parameters(origin, cell_size, dims);
        for &(index, aabb) in elements {
            grid.add(index, aabb);
        }
        grid
    }

    /// Number of registered elements.
    #[inline]
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    /// True if no elements are registered.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    /// Cached AABB of element `index`, if registered.
    pub fn element_aabb(&self, index: usize) -> Option<Aabb> {
        self.elements.get(&index).map(|e| e.aabb)
    }

    /// Inclusive cell coordinate range touched by `aabb`, clamped to
    /// the grid.
    fn cell_range(&self, aabb: &Aabb) -> ([usize; 3], [usize; 3]) {
        let to_cell = |p: Vec3| {
            let c = (p - self.origin) / self.cell_size;
            [
                (c.x.floor().max(0.0) as usize).min(self.dims[0] - 1),
                (c.y.floor().max(0.0) as usize).min(self.dims[1] - 1),
                (c.z.floor().max(0.0) as usize).min(self.dims[2] - 1),
            ]
        };
        (to_cell(aabb.low), to_cell(aabb.high))
    }

    #[inline]
    fn cell_slot(&self, i: usize, j: usize, k: usize) -> usize {
        (k * self.dims[1] + j) * self.dims[0] + i
    }

    fn for_each_cell(
        low: [usize; 3],
        high: [usize; 3],
        mut f: impl FnMut(usize, usize, usize),
    ) {
        for k in low[2]..=high[2] {
            for j in low[1]..=high[1] {
                for i in low[0]..=high[0] {
                    f(i, j, k);
                }
            }
        }
    }

    /// Register `index` with the given box. Silently ignored if the
    /// index is already present — callers tracking movement must use
    /// [`update`](Self::update).
    pub fn add(&mut self, index: usize, aabb: Aabb) {
        if self.elements.contains_key(&index) {
            return;
        }
        let (cell_low, cell_high) = self.cell_range(&aabb);
        Self::for_each_cell(cell_low, cell_high, |i, j, k| {
            let slot = self.cell_slot(i, j, k);
            self.cells[slot].push(index);
        });
        self.elements.insert(
            index,
            GridEntry {
                aabb,
                cell_low,
                cell_high,
            },
        );
    }

    /// Refresh the box of a registered element.
    ///
    /// When the touched-cell range is unchanged only the cached AABB is
    /// refreshed; otherwise the element moves between exactly the cells
    /// in the symmetric difference of the old and new ranges.
    pub fn update(&mut self, index: usize, aabb: Aabb) {
        let Some(entry) = self.elements.get(&index) else {
            self.add(index, aabb);
            return;
        };
        let (old_low, old_high) = (entry.cell_low, entry.cell_high);
        let (new_low, new_high) = self.cell_range(&aabb);

        if (old_low, old_high) != (new_low, new_high) {
            let in_range = |c: [usize; 3], lo: [usize; 3], hi: [usize; 3]| {
                (0..3).all(|a| c[a] >= lo[a] && c[a] <= hi[a])
            };
            let mut leave = Vec::new();
            let mut enter = Vec::new();
            Self::for_each_cell(old_low, old_high, |i, j, k| {
                if !in_range([i, j, k], new_low, new_high) {
                    leave.push([i, j, k]);
                }
            });
            Self::for_each_cell(new_low, new_high, |i, j, k| {
                if !in_range([i, j, k], old_low, old_high) {
                    enter.push([i, j, k]);
                }
            });
            for [i, j, k] in leave {
                let slot = self.cell_slot(i, j, k);
                self.cells[slot].retain(|&x| x != index);
            }
            for [i, j, k] in enter {
                let slot = self.cell_slot(i, j, k);
                self.cells[slot].push(index);
            }
        }

        let entry = self.elements.get_mut(&index).expect("entry checked above");
        entry.aabb = aabb;
        entry.cell_low = new_low;
        entry.cell_high = new_high;
    }

    /// Unregister an element. No-op if the index is absent.
    pub fn remove(&mut self, index: usize) {
        let Some(entry) = self.elements.remove(&index) else {
            return;
        };
        Self::for_each_cell(entry.cell_low, entry.cell_high, |i, j, k| {
            let slot = self.cell_slot(i, j, k);
            self.cells[slot].retain(|&x| x != index);
        });
    }

    /// Append to `out` every registered index whose cached AABB
    /// overlaps `query`. Each index appears at most once per call, in
    /// ascending order.
    pub fn find_overlapping(&self, query: &Aabb, out: &mut Vec<usize>) {
        let start = out.len();
        let (low, high) = self.cell_range(query);
        Self::for_each_cell(low, high, |i, j, k| {
            let slot = self.cell_slot(i, j, k);
            out.extend_from_slice(&self.cells[slot]);
        });

        let hits = &mut out[start..];
        hits.sort_unstable();
        let mut kept = start;
        for idx in start..out.len() {
            let candidate = out[idx];
            if kept > start && out[kept - 1] == candidate {
                continue;
            }
            if self.elements[&candidate].aabb.intersects(query) {
                out[kept] = candidate;
                kept += 1;
            }
        }
        out.truncate(kept);
    }
}
