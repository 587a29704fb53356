//! Error types for cell complex construction and inference.

use thiserror::Error;

/// Result type for cellflow operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur while building a complex or running inference.
#[derive(Debug, Error)]
pub enum Error {
    /// A cycle tuple does not describe a closed walk in the current edge set.
    #[error("invalid cell: {0}")]
    InvalidCell(String),

    /// An edge is malformed with respect to the vertex set.
    #[error("invalid edge: {0}")]
    InvalidEdge(String),

    /// Unrecognized candidate heuristic name.
    #[error("unknown heuristic: {0}")]
    UnknownHeuristic(String),

    /// Shape mismatch between the flow matrix and the complex.
    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch {
        /// Expected dimension.
        expected: usize,
        /// Actual dimension.
        actual: usize,
    },
}

impl Error {
    /// Create an invalid-cell error.
    #[must_use]
    pub fn invalid_cell(msg: impl Into<String>) -> Self {
        Self::InvalidCell(msg.into())
    }

    /// Create an invalid-edge error.
    #[must_use]
    pub fn invalid_edge(msg: impl Into<String>) -> Self {
        Self::InvalidEdge(msg.into())
    }

    /// Create a dimension mismatch error.
    #[must_use]
    pub fn dim_mismatch(expected: usize, actual: usize) -> Self {
        Self::DimensionMismatch { expected, actual }
    }
}
