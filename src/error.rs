use num_complex::Complex64;
use thiserror::Error;

/// Errors raised by the analysis core
#[derive(Debug, Error)]
pub enum AnalysisError {
    /// The admittance matrix could not be solved at this complex frequency
    /// (floating node, zero-valued element, or non-finite result).
    #[error("singular admittance matrix at s = {s}")]
    SingularNetwork { s: Complex64 },

    #[error("node index {index} out of range for a network of {node_count} nodes")]
    InvalidNodeIndex { index: usize, node_count: usize },

    #[error("invalid input: {0}")]
    InvalidInput(String),

    #[error("dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;
