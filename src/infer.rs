//! Greedy cell inference.
//!
//! The orchestrator owns the growing [`CellComplex`], alternating between
//! computing the harmonic residual of the flows, generating candidate cycles
//! from it, scoring them by actual residual reduction, and appending the
//! winner — until the cell budget, the error threshold, or stagnation stops
//! the loop.

use crate::complex::CellComplex;
use crate::error::{Error, Result};
use crate::search::{generate_candidates, CandidateHeuristic, FlowNorm};
use crate::score::score_cells_multiple;
use crate::solver::{energy, project_flow};
use crate::sparse::CscMatrix;
use ndarray::Array2;
use rand::rngs::StdRng;
use rand::SeedableRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Why the inference loop stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum StopReason {
    /// The configured number of cells was added.
    CellLimit,
    /// The harmonic residual energy dropped to the epsilon threshold.
    Epsilon,
    /// No candidate improved on the current complex.
    NoImprovement,
}

/// Configuration for [`infer_cell_complex`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InferenceConfig {
    /// Distinct candidate cycles generated per iteration.
    pub n_candidates: usize,
    /// Stop after this many added cells; `None` for no cell budget.
    pub max_cells: Option<usize>,
    /// Stop once the harmonic residual energy reaches this value.
    pub epsilon: Option<f64>,
    /// Candidate-generation strategy.
    pub heuristic: CandidateHeuristic,
    /// Cluster count for the SIMILARITY heuristic.
    pub n_clusters: usize,
    /// Normalization of the circulation score inside the search heap.
    pub flow_norm: FlowNorm,
    /// Penalty per cycle vertex in the residual scoring.
    pub length_penalty: f64,
    /// RNG seed; `None` draws from entropy.
    pub seed: Option<u64>,
}

impl Default for InferenceConfig {
    fn default() -> Self {
        Self {
            n_candidates: 10,
            max_cells: None,
            epsilon: None,
            heuristic: CandidateHeuristic::Similarity,
            n_clusters: 11,
            flow_norm: FlowNorm::Length,
            length_penalty: 0.0,
            seed: None,
        }
    }
}

/// Outcome of an inference run.
#[derive(Debug, Clone)]
pub struct Inference {
    /// The complex with all accepted cells appended.
    pub complex: CellComplex,
    /// Why the loop stopped.
    pub stop: StopReason,
    /// Number of cells added by this run.
    pub cells_added: usize,
    /// Harmonic residual energy before the run and after every added cell.
    pub error_history: Vec<f64>,
}

impl Inference {
    /// Final harmonic residual energy.
    pub fn approx_error(&self) -> f64 {
        // The history always holds the initial error as its first entry.
        self.error_history.last().copied().unwrap_or(f64::INFINITY)
    }
}

/// Residual of every flow sample after projection onto `a`, row per sample.
fn residual_matrix(a: &CscMatrix, flows: &Array2<f64>) -> Array2<f64> {
    let mut out = flows.clone();
    for s in 0..flows.nrows() {
        let sample: Vec<f64> = (0..flows.ncols()).map(|e| flows[[s, e]]).collect();
        let projected = project_flow(a, &sample);
        for e in 0..flows.ncols() {
            out[[s, e]] = sample[e] - projected[e];
        }
    }
    out
}

/// Total energy of a residual matrix.
fn total_energy(flows: &Array2<f64>) -> f64 {
    let mut total = 0.0;
    for s in 0..flows.nrows() {
        let row: Vec<f64> = (0..flows.ncols()).map(|e| flows[[s, e]]).collect();
        total += energy(&row);
    }
    total
}

/// Infer 2-cells explaining the circulating part of `flows`.
///
/// `flows` is shaped `[samples × edges]` with edge order matching
/// `complex.edges()`. The complex is consumed and returned with accepted
/// cells appended. Runs with the same seed reproduce identical results.
pub fn infer_cell_complex(
    mut complex: CellComplex,
    flows: &Array2<f64>,
    config: &InferenceConfig,
) -> Result<Inference> {
    if flows.ncols() != complex.n_edges() {
        return Err(Error::dim_mismatch(complex.n_edges(), flows.ncols()));
    }

    let mut rng = match config.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };

    // The gradient component never changes: ∂₁ is fixed for the lifetime of
    // the complex, so the non-gradient part is computed once.
    let d1t = complex.boundary_map_1().transpose();
    let non_gradient = residual_matrix(&d1t, flows);

    let mut harmonic = residual_matrix(complex.boundary_map_2(), &non_gradient);
    let mut approx_error = total_energy(&harmonic);
    let mut error_history = vec![approx_error];
    let mut cells_added = 0usize;

    let stop = loop {
        if config.max_cells == Some(cells_added) {
            break StopReason::CellLimit;
        }
        if let Some(epsilon) = config.epsilon {
            if approx_error <= epsilon {
                break StopReason::Epsilon;
            }
        }

        let cycles = generate_candidates(
            &complex,
            &harmonic,
            config.n_candidates,
            config.heuristic,
            config.n_clusters,
            config.flow_norm,
            config.length_penalty,
            &mut rng,
        );
        if cycles.is_empty() {
            warn!(cells_added, "no candidate cycles available; stopping");
            break StopReason::NoImprovement;
        }

        let mut candidates = cycles
            .into_iter()
            .map(|cycle| {
                let boundary = complex.calc_cell_boundary(&cycle)?;
                Ok((cycle, boundary))
            })
            .collect::<Result<Vec<_>>>()?;

        let scores = score_cells_multiple(&complex, &non_gradient, &candidates, config.length_penalty);
        // Strict improvement only: on a tie the baseline wins and the loop
        // stops instead of appending a cell that explains nothing new.
        let mut best = 0;
        for i in 1..scores.len() {
            if scores[i] < scores[best] {
                best = i;
            }
        }
        if best == 0 {
            warn!(
                cells_added,
                baseline = scores[0],
                "no candidate improves on the current complex; stopping"
            );
            break StopReason::NoImprovement;
        }

        let (cycle, boundary) = candidates.swap_remove(best - 1);
        debug!(
            cell = ?cycle,
            score = scores[best],
            iteration = cells_added,
            "adding cell"
        );
        complex.add_cell_fast(cycle, boundary);
        cells_added += 1;

        harmonic = residual_matrix(complex.boundary_map_2(), &non_gradient);
        approx_error = total_energy(&harmonic);
        error_history.push(approx_error);
    };

    debug!(?stop, cells_added, approx_error, "inference finished");
    Ok(Inference {
        complex,
        stop,
        cells_added,
        error_history,
    })
}
