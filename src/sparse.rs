//! Sparse column-major matrices for boundary operators.
//!
//! Boundary operators grow by appending columns (one per added cell), so a
//! compressed sparse column layout is the natural fit: a column is a short
//! list of `(row, value)` entries and ∂₂ growth is a single `push`.

use serde::{Deserialize, Serialize};

/// A sparse column: `(row index, value)` entries, strictly increasing rows.
pub type SparseColumn = Vec<(usize, f64)>;

/// Column-major sparse matrix.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CscMatrix {
    /// Number of rows.
    nrows: usize,
    /// Columns, each a sorted sparse column.
    columns: Vec<SparseColumn>,
}

impl CscMatrix {
    /// Create an empty matrix with a fixed row dimension and no columns.
    pub fn new(nrows: usize) -> Self {
        Self {
            nrows,
            columns: Vec::new(),
        }
    }

    /// Create from pre-built columns.
    pub fn from_columns(nrows: usize, columns: Vec<SparseColumn>) -> Self {
        debug_assert!(columns
            .iter()
            .all(|c| c.iter().all(|&(r, _)| r < nrows)));
        Self { nrows, columns }
    }

    /// Number of rows.
    pub fn nrows(&self) -> usize {
        self.nrows
    }

    /// Number of columns.
    pub fn ncols(&self) -> usize {
        self.columns.len()
    }

    /// Borrow a column.
    pub fn column(&self, j: usize) -> &SparseColumn {
        &self.columns[j]
    }

    /// Borrow all columns.
    pub fn columns(&self) -> &[SparseColumn] {
        &self.columns
    }

    /// Append a column.
    pub fn push_column(&mut self, column: SparseColumn) {
        debug_assert!(column.iter().all(|&(r, _)| r < self.nrows));
        self.columns.push(column);
    }

    /// Dense matrix-vector product `A · x`.
    pub fn matvec(&self, x: &[f64]) -> Vec<f64> {
        debug_assert_eq!(x.len(), self.ncols());
        let mut y = vec![0.0; self.nrows];
        for (j, col) in self.columns.iter().enumerate() {
            let xj = x[j];
            if xj == 0.0 {
                continue;
            }
            for &(row, value) in col {
                y[row] += value * xj;
            }
        }
        y
    }

    /// Transposed product `Aᵗ · y`.
    pub fn matvec_t(&self, y: &[f64]) -> Vec<f64> {
        debug_assert_eq!(y.len(), self.nrows);
        let mut x = vec![0.0; self.ncols()];
        for (j, col) in self.columns.iter().enumerate() {
            let mut acc = 0.0;
            for &(row, value) in col {
                acc += value * y[row];
            }
            x[j] = acc;
        }
        x
    }

    /// Materialize the transpose as a new column-major matrix.
    pub fn transpose(&self) -> CscMatrix {
        let mut columns = vec![Vec::new(); self.nrows];
        for (j, col) in self.columns.iter().enumerate() {
            for &(row, value) in col {
                columns[row].push((j, value));
            }
        }
        // Column entries come out row-sorted because we scan columns in order.
        CscMatrix {
            nrows: self.ncols(),
            columns,
        }
    }
}
