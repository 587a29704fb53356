//! Cell complex types: normalized cycles and the growing 2-complex.
//!
//! A [`CellComplex`] starts life as a 1-dimensional complex (vertices and
//! edges with a fixed boundary operator ∂₁) and grows by appending 2-cells,
//! each a closed cycle with a signed boundary column in ∂₂. Cells and edges
//! are plain integer indices into flat arrays; boundary operators are sparse
//! column-major matrices whose column order is insertion order.

use crate::error::{Error, Result};
use crate::sparse::{CscMatrix, SparseColumn};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// A cycle stored in canonical normalized form.
///
/// Normalization makes the representation rotation-invariant (the smallest
/// vertex comes first) and reflection-invariant (of the two traversal
/// directions, the one whose second vertex is smaller wins), so two
/// descriptions of the same cycle compare equal and hash identically.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Cycle(Vec<usize>);

impl Cycle {
    /// Create a cycle, normalizing the vertex tuple.
    pub fn new(vertices: Vec<usize>) -> Self {
        Self(normalize(vertices))
    }

    /// Vertices in canonical order.
    pub fn vertices(&self) -> &[usize] {
        &self.0
    }

    /// Number of vertices (equals the number of edges of the closed walk).
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the degenerate empty cycle.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// Rotate the smallest vertex to the front, then pick the direction whose
/// second element is smaller.
fn normalize(mut v: Vec<usize>) -> Vec<usize> {
    let n = v.len();
    if n == 0 {
        return v;
    }
    let mut min_pos = 0;
    for (i, &x) in v.iter().enumerate() {
        if x < v[min_pos] {
            min_pos = i;
        }
    }
    v.rotate_left(min_pos);
    if n > 2 && v[n - 1] < v[1] {
        v[1..].reverse();
    }
    v
}

/// A 2-dimensional cell complex over an undirected graph.
///
/// Edges carry the orientation of their defining pair for flow bookkeeping;
/// cells are appended, never removed or reordered.
#[derive(Debug, Clone, Serialize)]
pub struct CellComplex {
    n_vertices: usize,
    edges: Vec<(usize, usize)>,
    /// Lookup by unordered endpoint pair (min, max).
    #[serde(skip)]
    edge_lookup: HashMap<(usize, usize), usize>,
    /// Incident edge indices per vertex.
    incidences: Vec<Vec<usize>>,
    /// 2-cells in insertion order.
    cells: Vec<Cycle>,
    /// ∂₂: edges × cells, one column per cell.
    boundary_2: CscMatrix,
}

impl CellComplex {
    /// Build the 1-skeleton from a vertex count and an edge list.
    ///
    /// Rejects self-loops, duplicate edges, and out-of-range endpoints.
    pub fn from_edges(n_vertices: usize, edges: &[(usize, usize)]) -> Result<Self> {
        let mut edge_lookup = HashMap::with_capacity(edges.len());
        let mut incidences = vec![Vec::new(); n_vertices];
        for (idx, &(u, v)) in edges.iter().enumerate() {
            if u >= n_vertices || v >= n_vertices {
                return Err(Error::invalid_edge(format!(
                    "edge ({u}, {v}) out of range for {n_vertices} vertices"
                )));
            }
            if u == v {
                return Err(Error::invalid_edge(format!("self-loop at vertex {u}")));
            }
            let key = (u.min(v), u.max(v));
            if edge_lookup.insert(key, idx).is_some() {
                return Err(Error::invalid_edge(format!("duplicate edge ({u}, {v})")));
            }
            incidences[u].push(idx);
            incidences[v].push(idx);
        }
        let n_edges = edges.len();
        Ok(Self {
            n_vertices,
            edges: edges.to_vec(),
            edge_lookup,
            incidences,
            cells: Vec::new(),
            boundary_2: CscMatrix::new(n_edges),
        })
    }

    /// Number of vertices.
    pub fn n_vertices(&self) -> usize {
        self.n_vertices
    }

    /// Number of edges.
    pub fn n_edges(&self) -> usize {
        self.edges.len()
    }

    /// Number of 2-cells added so far.
    pub fn n_cells(&self) -> usize {
        self.cells.len()
    }

    /// Edge list in boundary-operator column order.
    pub fn edges(&self) -> &[(usize, usize)] {
        &self.edges
    }

    /// 2-cells in insertion order.
    pub fn cells(&self) -> &[Cycle] {
        &self.cells
    }

    /// Incident edge indices for every vertex.
    pub fn node_incidences(&self) -> &[Vec<usize>] {
        &self.incidences
    }

    /// Edge index and orientation sign for the pair `(a, b)`.
    ///
    /// The sign is `+1` when `(a, b)` matches the stored orientation and
    /// `-1` when it is reversed; `None` when the pair is not an edge.
    pub fn edge_between(&self, a: usize, b: usize) -> Option<(usize, f64)> {
        let idx = *self.edge_lookup.get(&(a.min(b), a.max(b)))?;
        let sign = if self.edges[idx] == (a, b) { 1.0 } else { -1.0 };
        Some((idx, sign))
    }

    /// The boundary operator ∂₁ (vertices × edges), fixed after construction.
    ///
    /// Edge `(u, v)` contributes `-1` at `u` and `+1` at `v`.
    pub fn boundary_map_1(&self) -> CscMatrix {
        let columns = self
            .edges
            .iter()
            .map(|&(u, v)| {
                let mut col = vec![(u, -1.0), (v, 1.0)];
                col.sort_unstable_by_key(|&(row, _)| row);
                col
            })
            .collect();
        CscMatrix::from_columns(self.n_vertices, columns)
    }

    /// The boundary operator ∂₂ (edges × cells), columns in insertion order.
    pub fn boundary_map_2(&self) -> &CscMatrix {
        &self.boundary_2
    }

    /// Signed boundary column of a cycle over the edge set.
    ///
    /// Fails with [`Error::InvalidCell`] when the tuple has fewer than three
    /// vertices or a consecutive pair is not an edge of the complex.
    pub fn calc_cell_boundary(&self, cycle: &Cycle) -> Result<SparseColumn> {
        let verts = cycle.vertices();
        if verts.len() < 3 {
            return Err(Error::invalid_cell(format!(
                "cycle with {} vertices cannot bound a 2-cell",
                verts.len()
            )));
        }
        let mut entries: HashMap<usize, f64> = HashMap::with_capacity(verts.len());
        for i in 0..verts.len() {
            let a = verts[i];
            let b = verts[(i + 1) % verts.len()];
            let (idx, sign) = self.edge_between(a, b).ok_or_else(|| {
                Error::invalid_cell(format!("({a}, {b}) is not an edge of the complex"))
            })?;
            *entries.entry(idx).or_insert(0.0) += sign;
        }
        let mut col: SparseColumn = entries
            .into_iter()
            .filter(|&(_, value)| value != 0.0)
            .collect();
        col.sort_unstable_by_key(|&(row, _)| row);
        Ok(col)
    }

    /// Append a cell with a precomputed boundary column.
    ///
    /// O(1) amortized; the caller is responsible for deduplication against
    /// existing cells.
    pub fn add_cell_fast(&mut self, cycle: Cycle, boundary: SparseColumn) {
        self.boundary_2.push_column(boundary);
        self.cells.push(cycle);
    }

    /// All 3-cycles of the current edge set with their boundary columns,
    /// each unordered triangle listed once.
    pub fn triangles(&self) -> Vec<(Cycle, SparseColumn)> {
        let mut neighbors = vec![Vec::new(); self.n_vertices];
        for &(u, v) in &self.edges {
            neighbors[u].push(v);
            neighbors[v].push(u);
        }
        for list in &mut neighbors {
            list.sort_unstable();
        }

        let mut out = Vec::new();
        for &(u, v) in &self.edges {
            let (lo, hi) = (u.min(v), u.max(v));
            // Common neighbors above hi: each triangle {lo, hi, w} is found
            // exactly once, from its lexicographically smallest edge.
            for &w in &neighbors[lo] {
                if w > hi && neighbors[hi].binary_search(&w).is_ok() {
                    let cycle = Cycle::new(vec![lo, hi, w]);
                    if let Ok(boundary) = self.calc_cell_boundary(&cycle) {
                        out.push((cycle, boundary));
                    }
                }
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn square() -> CellComplex {
        CellComplex::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap()
    }

    #[test]
    fn cycle_normalization_is_rotation_invariant() {
        let a = Cycle::new(vec![0, 1, 2, 3]);
        let b = Cycle::new(vec![2, 3, 0, 1]);
        assert_eq!(a, b);
    }

    #[test]
    fn cycle_normalization_is_reflection_invariant() {
        let a = Cycle::new(vec![0, 1, 2, 3]);
        let b = Cycle::new(vec![0, 3, 2, 1]);
        assert_eq!(a, b);
        assert_eq!(a.vertices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn distinct_cycles_stay_distinct() {
        let a = Cycle::new(vec![0, 1, 2]);
        let b = Cycle::new(vec![0, 1, 3]);
        assert_ne!(a, b);
    }

    #[test]
    fn rejects_malformed_edges() {
        assert!(CellComplex::from_edges(2, &[(0, 0)]).is_err());
        assert!(CellComplex::from_edges(2, &[(0, 3)]).is_err());
        assert!(CellComplex::from_edges(3, &[(0, 1), (1, 0)]).is_err());
    }

    #[test]
    fn edge_between_reports_orientation() {
        let complex = square();
        assert_eq!(complex.edge_between(0, 1), Some((0, 1.0)));
        assert_eq!(complex.edge_between(1, 0), Some((0, -1.0)));
        assert_eq!(complex.edge_between(0, 2), None);
    }

    #[test]
    fn boundary_of_cycle_has_zero_vertex_sum() {
        let complex = square();
        let cycle = Cycle::new(vec![0, 1, 2, 3]);
        let boundary = complex.calc_cell_boundary(&cycle).unwrap();
        assert_eq!(boundary.len(), 4);

        // ∂₁ · boundary = 0: the closed-walk invariant.
        let d1 = complex.boundary_map_1();
        let mut dense = vec![0.0; complex.n_edges()];
        for &(row, value) in &boundary {
            dense[row] = value;
        }
        let vertex_sums = d1.matvec(&dense);
        for s in vertex_sums {
            assert!(s.abs() < 1e-12, "nonzero vertex boundary: {s}");
        }
    }

    #[test]
    fn open_walk_is_rejected() {
        let complex = square();
        let not_closed = Cycle::new(vec![0, 1, 3]);
        assert!(complex.calc_cell_boundary(&not_closed).is_err());
        let too_short = Cycle::new(vec![0, 1]);
        assert!(complex.calc_cell_boundary(&too_short).is_err());
    }

    #[test]
    fn add_cell_grows_boundary_by_one_column() {
        let mut complex = square();
        let cycle = Cycle::new(vec![0, 1, 2, 3]);
        let boundary = complex.calc_cell_boundary(&cycle).unwrap();
        let before = complex.boundary_map_2().ncols();
        complex.add_cell_fast(cycle.clone(), boundary.clone());
        let d2 = complex.boundary_map_2();
        assert_eq!(d2.ncols(), before + 1);
        assert_eq!(d2.column(before), &boundary);
        assert_eq!(complex.cells().last(), Some(&cycle));
    }

    #[test]
    fn triangles_enumerates_each_once() {
        // K4 has exactly four triangles.
        let complex =
            CellComplex::from_edges(4, &[(0, 1), (0, 2), (0, 3), (1, 2), (1, 3), (2, 3)]).unwrap();
        let tris = complex.triangles();
        assert_eq!(tris.len(), 4);
        let unique: std::collections::HashSet<_> =
            tris.iter().map(|(c, _)| c.clone()).collect();
        assert_eq!(unique.len(), 4);
    }

    #[test]
    fn square_has_no_triangles() {
        assert!(square().triangles().is_empty());
    }

    #[test]
    fn node_incidences_cover_every_edge_twice() {
        let complex = square();
        let total: usize = complex.node_incidences().iter().map(Vec::len).sum();
        assert_eq!(total, 2 * complex.n_edges());
    }
}
