//! Sparse least squares and flow projection.
//!
//! The projector strips components of an edge flow that are explained by a
//! boundary operator: projecting onto the image of ∂₁ᵗ removes the gradient
//! part, projecting onto the image of ∂₂ removes the part already explained
//! by known cells. What is left after both is the harmonic residual.
//!
//! The normal equations are solved by CGLS (conjugate gradient on
//! AᵗA x = Aᵗ b), which only needs `matvec` / `matvec_t` and behaves well on
//! wide, rank-deficient operators: iterations are capped and the best
//! iterate so far is returned.

use crate::sparse::CscMatrix;

/// Relative residual tolerance for CGLS convergence.
const CGLS_TOL: f64 = 1e-12;

/// Minimum iteration cap regardless of problem size.
const CGLS_MIN_ITER: usize = 64;

/// Solve `min ‖A·x − b‖₂` for sparse `A`.
///
/// Deterministic given identical inputs. Returns the zero vector when `A`
/// has no columns.
pub fn solve_least_squares(a: &CscMatrix, b: &[f64]) -> Vec<f64> {
    let n = a.ncols();
    if n == 0 {
        return Vec::new();
    }

    let mut x = vec![0.0; n];
    let mut r = b.to_vec();
    let mut s = a.matvec_t(&r);
    let mut p = s.clone();
    let mut gamma: f64 = s.iter().map(|v| v * v).sum();

    let b_norm_sq: f64 = b.iter().map(|v| v * v).sum();
    if b_norm_sq == 0.0 || gamma == 0.0 {
        return x;
    }
    let threshold = CGLS_TOL * CGLS_TOL * gamma;

    let max_iter = (2 * (a.nrows() + n)).max(CGLS_MIN_ITER);
    for _ in 0..max_iter {
        let q = a.matvec(&p);
        let q_norm_sq: f64 = q.iter().map(|v| v * v).sum();
        if q_norm_sq == 0.0 {
            break;
        }
        let alpha = gamma / q_norm_sq;
        for i in 0..n {
            x[i] += alpha * p[i];
        }
        for (ri, qi) in r.iter_mut().zip(q.iter()) {
            *ri -= alpha * qi;
        }
        s = a.matvec_t(&r);
        let gamma_next: f64 = s.iter().map(|v| v * v).sum();
        if gamma_next <= threshold {
            break;
        }
        let beta = gamma_next / gamma;
        for i in 0..n {
            p[i] = s[i] + beta * p[i];
        }
        gamma = gamma_next;
    }

    x
}

/// Project `flow` onto the column space of `a`: returns `a · x*` where `x*`
/// minimizes `‖a·x − flow‖₂`.
///
/// Zero-column operators project everything to zero (with the row shape of
/// `a` preserved).
pub fn project_flow(a: &CscMatrix, flow: &[f64]) -> Vec<f64> {
    if a.ncols() == 0 {
        return vec![0.0; a.nrows()];
    }
    let x = solve_least_squares(a, flow);
    a.matvec(&x)
}

/// Squared L2 norm of a residual vector.
pub fn energy(v: &[f64]) -> f64 {
    v.iter().map(|x| x * x).sum()
}
