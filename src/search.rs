//! Cycle candidate generation.
//!
//! Every heuristic feeds one shared max-heap of scored candidates; the
//! finalization pass pops best-first, induces the actual cycle, and keeps
//! only cycles not already produced by a higher-scoring entry. Non-tree
//! edges and directly-enumerated triangles share one candidate
//! representation so all heuristics flow through the same pipeline.

use crate::cluster::{kmeans, pairwise_distance};
use crate::complex::{CellComplex, Cycle};
use crate::error::{Error, Result};
use crate::tree::{self, FlowPotentialTree};
use ndarray::Array2;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};
use std::str::FromStr;

/// Candidate-generation strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandidateHeuristic {
    /// Random-root depth-first spanning trees.
    Dfs,
    /// Random-root breadth-first spanning trees.
    Bfs,
    /// One maximum spanning tree weighted by aggregate |flow|.
    Max,
    /// K-means over sign-symmetrized edge flow vectors; one maximum
    /// spanning tree per cluster center, weighted by similarity.
    Similarity,
    /// Direct enumeration of all 3-cycles, no spanning trees.
    Triangles,
}

impl FromStr for CandidateHeuristic {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "dfs" => Ok(Self::Dfs),
            "bfs" => Ok(Self::Bfs),
            "max" => Ok(Self::Max),
            "similarity" => Ok(Self::Similarity),
            "triangles" => Ok(Self::Triangles),
            other => Err(Error::UnknownHeuristic(other.to_string())),
        }
    }
}

/// Normalization applied to a candidate's circulation score.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FlowNorm {
    /// Raw aggregate circulation.
    Raw,
    /// Circulation divided by the induced cycle length.
    Length,
}

/// Where a heap entry came from; resolved to a cycle at finalization.
#[derive(Debug, Clone)]
enum CandidateKey {
    /// Non-tree edge `(a, b)` of the tree at `tree`, closed through the LCA.
    NonTree { tree: usize, a: usize, b: usize },
    /// A cycle known outright (TRIANGLES heuristic).
    Cycle(Cycle),
}

/// Heap entry: max-ordered by score.
#[derive(Debug, Clone)]
struct Candidate {
    score: f64,
    key: CandidateKey,
}

impl PartialEq for Candidate {
    fn eq(&self, other: &Self) -> bool {
        self.score.total_cmp(&other.score) == Ordering::Equal
    }
}
impl Eq for Candidate {}
impl PartialOrd for Candidate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}
impl Ord for Candidate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.score.total_cmp(&other.score)
    }
}

/// Fundamental cycle induced by the non-tree edge `(a, b)`.
///
/// Walks both endpoints to their least common ancestor and concatenates the
/// two tree paths; the result is normalized. Both endpoints must belong to
/// `tree`.
pub fn induced_cycle(tree: &FlowPotentialTree, a: usize, b: usize) -> Cycle {
    let lca = tree.lca(a, b);
    let mut path_a = Vec::with_capacity(tree.level[a] - tree.level[lca] + 1);
    let mut v = a;
    while v != lca {
        path_a.push(v);
        v = tree.parent[v];
    }
    path_a.push(lca);
    let mut path_b = Vec::with_capacity(tree.level[b] - tree.level[lca]);
    let mut w = b;
    while w != lca {
        path_b.push(w);
        w = tree.parent[w];
    }
    path_b.reverse();
    path_a.extend(path_b);
    Cycle::new(path_a)
}

/// Score every non-tree edge of `tree` and push the results onto the shared
/// heap.
///
/// The circulation of the fundamental cycle of `(a, b)` is read off the
/// potentials in O(1) per sample: `pot[a] + sign·flow − pot[b]`, summed in
/// absolute value over samples. With [`FlowNorm::Length`] the score is
/// divided by the cycle length, computed for the whole batch with one
/// offline LCA pass.
fn collect_tree_candidates(
    tree_idx: usize,
    tree: &FlowPotentialTree,
    flows: &Array2<f64>,
    flow_norm: FlowNorm,
    heap: &mut BinaryHeap<Candidate>,
) {
    let lengths: Option<Vec<usize>> = match flow_norm {
        FlowNorm::Raw => None,
        FlowNorm::Length => {
            let pairs: Vec<(usize, usize)> =
                tree.non_tree_edges.iter().map(|nt| (nt.a, nt.b)).collect();
            let lcas = tree.batched_lca(&pairs);
            Some(
                tree.non_tree_edges
                    .iter()
                    .zip(lcas.iter())
                    .map(|(nt, &lca)| tree.cycle_len(nt.a, nt.b, lca))
                    .collect(),
            )
        }
    };

    for (i, nt) in tree.non_tree_edges.iter().enumerate() {
        let mut circulation = 0.0;
        for s in 0..flows.nrows() {
            let around = tree.potential[[s, nt.a]] + nt.sign * flows[[s, nt.edge]]
                - tree.potential[[s, nt.b]];
            circulation += around.abs();
        }
        let score = match &lengths {
            Some(lens) => circulation / lens[i] as f64,
            None => circulation,
        };
        heap.push(Candidate {
            score,
            key: CandidateKey::NonTree {
                tree: tree_idx,
                a: nt.a,
                b: nt.b,
            },
        });
    }
}

/// Pop best-scoring entries, resolve their cycles, and keep each distinct
/// cycle once, until `count` cycles are collected or the heap is exhausted.
///
/// Output order is non-increasing in original score.
fn finalize_candidates(
    mut heap: BinaryHeap<Candidate>,
    trees: &[FlowPotentialTree],
    count: usize,
) -> Vec<Cycle> {
    let mut seen = HashSet::new();
    let mut out = Vec::with_capacity(count);
    while out.len() < count {
        let Some(candidate) = heap.pop() else {
            break;
        };
        let cycle = match candidate.key {
            CandidateKey::NonTree { tree, a, b } => induced_cycle(&trees[tree], a, b),
            CandidateKey::Cycle(cycle) => cycle,
        };
        if seen.insert(cycle.clone()) {
            out.push(cycle);
        }
    }
    out
}

/// Per-edge weights for the MAX heuristic: aggregate |flow| across samples.
fn abs_flow_weights(flows: &Array2<f64>) -> Vec<f64> {
    (0..flows.ncols())
        .map(|e| (0..flows.nrows()).map(|s| flows[[s, e]].abs()).sum())
        .collect()
}

/// Generate up to `count` distinct candidate cycles from the current
/// residual `flows` using the chosen heuristic.
///
/// All randomness (tree roots, k-means seeding) comes from `rng`.
pub fn generate_candidates(
    complex: &CellComplex,
    flows: &Array2<f64>,
    count: usize,
    heuristic: CandidateHeuristic,
    n_clusters: usize,
    flow_norm: FlowNorm,
    length_penalty: f64,
    rng: &mut StdRng,
) -> Vec<Cycle> {
    let mut heap = BinaryHeap::new();
    let mut trees = Vec::new();

    match heuristic {
        CandidateHeuristic::Dfs | CandidateHeuristic::Bfs => {
            for _ in 0..count {
                let Some(root) = tree::random_root(complex, rng) else {
                    break;
                };
                let t = match heuristic {
                    CandidateHeuristic::Dfs => tree::build_dfs(complex, flows, root),
                    _ => tree::build_bfs(complex, flows, root),
                };
                collect_tree_candidates(trees.len(), &t, flows, flow_norm, &mut heap);
                trees.push(t);
            }
        }
        CandidateHeuristic::Max => {
            let weights = abs_flow_weights(flows);
            let t = tree::build_max(complex, flows, &weights);
            collect_tree_candidates(0, &t, flows, flow_norm, &mut heap);
            trees.push(t);
        }
        CandidateHeuristic::Similarity => {
            // Cluster edge flow vectors together with their negations so a
            // cycle traversed either way lands in the same cluster.
            let n_edges = flows.ncols();
            let n_samples = flows.nrows();
            let mut points = Array2::zeros((2 * n_edges, n_samples));
            for e in 0..n_edges {
                for s in 0..n_samples {
                    points[[e, s]] = flows[[s, e]];
                    points[[n_edges + e, s]] = -flows[[s, e]];
                }
            }
            let centers = kmeans(&points, n_clusters, rng);
            // Edge weight per center: the negated distance of the closer of
            // the edge vector and its negation.
            let dists = pairwise_distance(&points, &centers);
            for c in 0..centers.nrows() {
                let weights: Vec<f64> = (0..n_edges)
                    .map(|e| -dists[[e, c]].min(dists[[n_edges + e, c]]))
                    .collect();
                let t = tree::build_max(complex, flows, &weights);
                collect_tree_candidates(trees.len(), &t, flows, flow_norm, &mut heap);
                trees.push(t);
            }
        }
        CandidateHeuristic::Triangles => {
            for (cycle, boundary) in complex.triangles() {
                let mut score = 0.0;
                for s in 0..flows.nrows() {
                    let mut dot = 0.0;
                    for &(e, value) in &boundary {
                        dot += value * flows[[s, e]];
                    }
                    score += dot.abs();
                }
                heap.push(Candidate {
                    score: score - length_penalty * 3.0,
                    key: CandidateKey::Cycle(cycle),
                });
            }
        }
    }

    finalize_candidates(heap, &trees, count)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;
    use rand::SeedableRng;

    fn square() -> CellComplex {
        CellComplex::from_edges(4, &[(0, 1), (1, 2), (2, 3), (3, 0)]).unwrap()
    }

    /// Unit circulation 0 → 1 → 2 → 3 → 0; edge (3, 0) is stored forward,
    /// so every edge carries +1.
    fn circulating_flows() -> Array2<f64> {
        array![[1.0, 1.0, 1.0, 1.0]]
    }

    #[test]
    fn heuristic_parsing() {
        assert_eq!(
            "similarity".parse::<CandidateHeuristic>().unwrap(),
            CandidateHeuristic::Similarity
        );
        assert_eq!(
            "BFS".parse::<CandidateHeuristic>().unwrap(),
            CandidateHeuristic::Bfs
        );
        assert!(matches!(
            "simulated-annealing".parse::<CandidateHeuristic>(),
            Err(Error::UnknownHeuristic(_))
        ));
    }

    #[test]
    fn induced_cycle_of_square_closes_the_loop() {
        let complex = square();
        let flows = circulating_flows();
        let tree = tree::build_bfs(&complex, &flows, 0);
        let nt = tree.non_tree_edges[0];
        let cycle = induced_cycle(&tree, nt.a, nt.b);
        assert_eq!(cycle, Cycle::new(vec![0, 1, 2, 3]));
    }

    #[test]
    fn sibling_non_tree_edge_induces_triangle_through_parent() {
        // Vertices 1 and 2 are siblings under root 0; the closing edge
        // (1, 2) must induce exactly [1, parent, 2].
        let complex = CellComplex::from_edges(3, &[(0, 1), (0, 2), (1, 2)]).unwrap();
        let flows = Array2::zeros((1, 3));
        let t = tree::build_bfs(&complex, &flows, 0);
        let cycle = induced_cycle(&t, 1, 2);
        assert_eq!(cycle.len(), 3);
        assert_eq!(cycle, Cycle::new(vec![0, 1, 2]));
    }

    #[test]
    fn every_heuristic_finds_the_square_cycle() {
        let complex = square();
        let flows = circulating_flows();
        let expected = Cycle::new(vec![0, 1, 2, 3]);
        for heuristic in [
            CandidateHeuristic::Dfs,
            CandidateHeuristic::Bfs,
            CandidateHeuristic::Max,
            CandidateHeuristic::Similarity,
        ] {
            let mut rng = StdRng::seed_from_u64(17);
            let candidates =
                generate_candidates(&complex, &flows, 2, heuristic, 3, FlowNorm::Length, 0.0, &mut rng);
            assert_eq!(candidates, vec![expected.clone()], "{heuristic:?}");
        }
    }

    #[test]
    fn triangles_heuristic_ranks_by_circulation() {
        // Two triangles sharing edge (1, 2); circulation only on the first.
        let complex =
            CellComplex::from_edges(4, &[(0, 1), (1, 2), (0, 2), (2, 3), (1, 3)]).unwrap();
        // Flow circulates 0 -> 1 -> 2 -> 0: +1 on (0,1), +1 on (1,2), -1 on (0,2).
        let flows = array![[1.0, 1.0, -1.0, 0.0, 0.0]];
        let mut rng = StdRng::seed_from_u64(0);
        let candidates = generate_candidates(
            &complex,
            &flows,
            2,
            CandidateHeuristic::Triangles,
            1,
            FlowNorm::Raw,
            0.0,
            &mut rng,
        );
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], Cycle::new(vec![0, 1, 2]));
    }

    #[test]
    fn finalize_deduplicates_across_trees() {
        // The same square cycle reached from two different spanning trees
        // must be returned once.
        let complex = square();
        let flows = circulating_flows();
        let t0 = tree::build_bfs(&complex, &flows, 0);
        let t1 = tree::build_bfs(&complex, &flows, 2);
        let mut heap = BinaryHeap::new();
        collect_tree_candidates(0, &t0, &flows, FlowNorm::Raw, &mut heap);
        collect_tree_candidates(1, &t1, &flows, FlowNorm::Raw, &mut heap);
        assert_eq!(heap.len(), 2);
        let cycles = finalize_candidates(heap, &[t0, t1], 5);
        assert_eq!(cycles, vec![Cycle::new(vec![0, 1, 2, 3])]);
    }

    #[test]
    fn candidates_come_out_in_score_order() {
        // Figure eight: two squares sharing vertex 0, circulation only on
        // the first square. Its cycle must be ranked first.
        let complex = CellComplex::from_edges(
            7,
            &[
                (0, 1),
                (1, 2),
                (2, 3),
                (3, 0),
                (0, 4),
                (4, 5),
                (5, 6),
                (6, 0),
            ],
        )
        .unwrap();
        let mut flows = Array2::zeros((1, 8));
        for e in 0..4 {
            flows[[0, e]] = 2.0;
        }
        for e in 4..8 {
            flows[[0, e]] = 0.1;
        }
        let mut rng = StdRng::seed_from_u64(3);
        let candidates = generate_candidates(
            &complex,
            &flows,
            2,
            CandidateHeuristic::Bfs,
            1,
            FlowNorm::Length,
            0.0,
            &mut rng,
        );
        assert_eq!(candidates.len(), 2);
        assert_eq!(candidates[0], Cycle::new(vec![0, 1, 2, 3]));
        assert_eq!(candidates[1], Cycle::new(vec![0, 4, 5, 6]));
    }
}
