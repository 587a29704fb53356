//! Flow-annotated spanning trees and least-common-ancestor queries.
//!
//! A [`FlowPotentialTree`] records, for every vertex reached from the root,
//! its parent, its depth, and one cumulative flow potential per flow sample
//! (net flow from the root along tree edges). Potentials let the circulation
//! around any fundamental cycle be read off in O(1): for a non-tree edge
//! `(a, b)` it is `pot[a] + flow(a→b) − pot[b]` per sample.
//!
//! Trees are ephemeral: built, queried for cycle induction, and discarded.
//! They are never mutated after construction.

use crate::complex::CellComplex;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::Rng;
use std::cmp::Ordering;
use std::collections::BinaryHeap;
use std::collections::VecDeque;

/// Sentinel for vertices the traversal never reached.
pub const UNVISITED: usize = usize::MAX;

/// A non-tree edge of a spanning tree, oriented `a → b`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct NonTreeEdge {
    /// Index into the global edge (and flow) array.
    pub edge: usize,
    /// Traversal-orientation endpoints.
    pub a: usize,
    /// See `a`.
    pub b: usize,
    /// `+1` when `a → b` matches the stored edge orientation, else `-1`.
    pub sign: f64,
}

/// A spanning tree annotated with depth and per-sample flow potentials.
#[derive(Debug, Clone)]
pub struct FlowPotentialTree {
    /// Root vertex.
    pub root: usize,
    /// Parent per vertex; the root maps to itself, unreached vertices to
    /// [`UNVISITED`].
    pub parent: Vec<usize>,
    /// Depth from the root; meaningful only for visited vertices.
    pub level: Vec<usize>,
    /// Cumulative flow from the root, shaped `[samples × vertices]`.
    pub potential: Array2<f64>,
    /// Edges of the spanned component not used for discovery.
    pub non_tree_edges: Vec<NonTreeEdge>,
}

impl FlowPotentialTree {
    /// True when the traversal reached `v`.
    pub fn visited(&self, v: usize) -> bool {
        self.parent[v] != UNVISITED
    }

    /// Least common ancestor of two visited vertices.
    ///
    /// Both vertices must belong to this tree; passing vertices from a
    /// different tree is a caller error.
    pub fn lca(&self, mut a: usize, mut b: usize) -> usize {
        debug_assert!(self.visited(a) && self.visited(b));
        while self.level[a] > self.level[b] {
            a = self.parent[a];
        }
        while self.level[b] > self.level[a] {
            b = self.parent[b];
        }
        while a != b {
            a = self.parent[a];
            b = self.parent[b];
        }
        a
    }

    /// Offline least common ancestors for a batch of vertex pairs.
    ///
    /// Tarjan's algorithm with union-find: one walk over the tree answers
    /// all queries, O(V + E + Q·α) total instead of one climb per pair.
    pub fn batched_lca(&self, pairs: &[(usize, usize)]) -> Vec<usize> {
        let n = self.parent.len();
        let mut children = vec![Vec::new(); n];
        for v in 0..n {
            if self.visited(v) && v != self.root {
                children[self.parent[v]].push(v);
            }
        }
        let mut queries_at = vec![Vec::new(); n];
        for (qi, &(a, b)) in pairs.iter().enumerate() {
            queries_at[a].push((b, qi));
            if a != b {
                queries_at[b].push((a, qi));
            }
        }

        let mut uf_parent: Vec<usize> = (0..n).collect();
        let mut ancestor = vec![0usize; n];
        let mut done = vec![false; n];
        let mut answers = vec![UNVISITED; pairs.len()];

        fn find(uf: &mut [usize], mut x: usize) -> usize {
            while uf[x] != x {
                uf[x] = uf[uf[x]];
                x = uf[x];
            }
            x
        }

        // Iterative post-order walk; the enter/exit marker replaces recursion.
        let mut stack = vec![(self.root, false)];
        while let Some((v, exited)) = stack.pop() {
            if exited {
                for &(other, qi) in &queries_at[v] {
                    if done[other] {
                        let root = find(&mut uf_parent, other);
                        answers[qi] = ancestor[root];
                    } else if other == v {
                        answers[qi] = v;
                    }
                }
                done[v] = true;
                if v != self.root {
                    let p = self.parent[v];
                    let rv = find(&mut uf_parent, v);
                    let rp = find(&mut uf_parent, p);
                    uf_parent[rv] = rp;
                    let root = find(&mut uf_parent, v);
                    ancestor[root] = p;
                }
            } else {
                ancestor[v] = v;
                stack.push((v, true));
                for &c in &children[v] {
                    stack.push((c, false));
                }
            }
        }
        answers
    }

    /// Number of vertices on the fundamental cycle closed by `(a, b)`.
    pub fn cycle_len(&self, a: usize, b: usize, lca: usize) -> usize {
        self.level[a] + self.level[b] + 1 - 2 * self.level[lca]
    }
}

/// Pick a root uniformly at random among vertices with at least one
/// incident edge, drawing from the explicit RNG.
///
/// `None` when the graph has no edges at all; an edgeless complex has no
/// spanning tree worth building.
pub fn random_root(complex: &CellComplex, rng: &mut StdRng) -> Option<usize> {
    let incident: Vec<usize> = complex
        .node_incidences()
        .iter()
        .enumerate()
        .filter(|(_, edges)| !edges.is_empty())
        .map(|(v, _)| v)
        .collect();
    if incident.is_empty() {
        return None;
    }
    Some(incident[rng.gen_range(0..incident.len())])
}

/// Shared traversal state while a tree is under construction.
struct TreeAccum {
    parent: Vec<usize>,
    level: Vec<usize>,
    potential: Array2<f64>,
    tree_edge: Vec<bool>,
}

impl TreeAccum {
    fn new(complex: &CellComplex, n_samples: usize, root: usize) -> Self {
        let n = complex.n_vertices();
        let mut parent = vec![UNVISITED; n];
        parent[root] = root;
        Self {
            parent,
            level: vec![0; n],
            potential: Array2::zeros((n_samples, n)),
            tree_edge: vec![false; complex.n_edges()],
        }
    }

    /// Record discovery of `w` from `v` through edge `e`.
    fn discover(&mut self, complex: &CellComplex, flows: &Array2<f64>, v: usize, w: usize, e: usize) {
        let (u0, _) = complex.edges()[e];
        let sign = if u0 == v { 1.0 } else { -1.0 };
        self.parent[w] = v;
        self.level[w] = self.level[v] + 1;
        self.tree_edge[e] = true;
        for s in 0..flows.nrows() {
            self.potential[[s, w]] = self.potential[[s, v]] + sign * flows[[s, e]];
        }
    }

    fn finish(self, complex: &CellComplex, root: usize) -> FlowPotentialTree {
        // Non-tree edges: every edge of the spanned component not used for
        // discovery, in stored orientation.
        let non_tree_edges = complex
            .edges()
            .iter()
            .enumerate()
            .filter(|&(e, &(u, v))| {
                !self.tree_edge[e] && self.parent[u] != UNVISITED && self.parent[v] != UNVISITED
            })
            .map(|(e, &(u, v))| NonTreeEdge {
                edge: e,
                a: u,
                b: v,
                sign: 1.0,
            })
            .collect();
        FlowPotentialTree {
            root,
            parent: self.parent,
            level: self.level,
            potential: self.potential,
            non_tree_edges,
        }
    }
}

/// Other endpoint of edge `e` as seen from `v`.
fn other_endpoint(complex: &CellComplex, e: usize, v: usize) -> usize {
    let (u, w) = complex.edges()[e];
    if u == v {
        w
    } else {
        u
    }
}

/// Depth-first spanning tree from `root`.
pub fn build_dfs(complex: &CellComplex, flows: &Array2<f64>, root: usize) -> FlowPotentialTree {
    let mut acc = TreeAccum::new(complex, flows.nrows(), root);
    let mut stack = vec![root];
    while let Some(v) = stack.pop() {
        for &e in &complex.node_incidences()[v] {
            let w = other_endpoint(complex, e, v);
            if acc.parent[w] == UNVISITED {
                acc.discover(complex, flows, v, w, e);
                stack.push(w);
            }
        }
    }
    acc.finish(complex, root)
}

/// Breadth-first spanning tree from `root`.
pub fn build_bfs(complex: &CellComplex, flows: &Array2<f64>, root: usize) -> FlowPotentialTree {
    let mut acc = TreeAccum::new(complex, flows.nrows(), root);
    let mut queue = VecDeque::from([root]);
    while let Some(v) = queue.pop_front() {
        for &e in &complex.node_incidences()[v] {
            let w = other_endpoint(complex, e, v);
            if acc.parent[w] == UNVISITED {
                acc.discover(complex, flows, v, w, e);
                queue.push_back(w);
            }
        }
    }
    acc.finish(complex, root)
}

/// Frontier entry for Prim's algorithm; ordered by weight, ties broken
/// toward the smaller edge index for determinism.
struct PrimEdge {
    weight: f64,
    edge: usize,
    from: usize,
    to: usize,
}

impl PartialEq for PrimEdge {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}
impl Eq for PrimEdge {}
impl PartialOrd for PrimEdge {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for PrimEdge {
    fn cmp(&self, other: &Self) -> Ordering {
        self.weight
            .total_cmp(&other.weight)
            .then_with(|| other.edge.cmp(&self.edge))
    }
}

/// Maximum-weight spanning tree (Prim), annotated with the actual flows.
///
/// `weights` has one entry per edge: `Σ|flow|` for the MAX heuristic, or a
/// similarity score when called from the SIMILARITY heuristic. The tree is
/// rooted at the smallest vertex of the component containing an edge.
pub fn build_max(complex: &CellComplex, flows: &Array2<f64>, weights: &[f64]) -> FlowPotentialTree {
    debug_assert_eq!(weights.len(), complex.n_edges());
    let root = complex
        .node_incidences()
        .iter()
        .position(|edges| !edges.is_empty())
        .unwrap_or(0);

    let mut acc = TreeAccum::new(complex, flows.nrows(), root);
    let mut heap = BinaryHeap::new();
    let push_frontier = |acc: &TreeAccum, heap: &mut BinaryHeap<PrimEdge>, v: usize| {
        for &e in &complex.node_incidences()[v] {
            let w = other_endpoint(complex, e, v);
            if acc.parent[w] == UNVISITED {
                heap.push(PrimEdge {
                    weight: weights[e],
                    edge: e,
                    from: v,
                    to: w,
                });
            }
        }
    };
    push_frontier(&acc, &mut heap, root);
    while let Some(PrimEdge { edge, from, to, .. }) = heap.pop() {
        if acc.parent[to] != UNVISITED {
            continue;
        }
        acc.discover(complex, flows, from, to, edge);
        push_frontier(&acc, &mut heap, to);
    }
    acc.finish(complex, root)
}
