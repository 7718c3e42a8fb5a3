//! Error types.
//!
//! The closed-form curves never fail (NaN/Inf propagate); everything that
//! validates shapes, iterates, or draws returns [`Result`].

use thiserror::Error;

/// Result type alias for diffusion operations.
pub type Result<T> = std::result::Result<T, DiffusionError>;

/// Errors raised by fitting, diagnostics and plotting.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DiffusionError {
    /// Two series that must be aligned index-for-index have different lengths.
    #[error("Length mismatch: {left} has {left_len} values, {right} has {right_len}")]
    LengthMismatch {
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    },

    /// Too few observations for the operation.
    #[error("Insufficient data: need at least {required} points, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    /// Input contains values the operation cannot use.
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// Invalid parameter value or shape.
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter { name: String, reason: String },

    /// The optimizer did not reach a minimum.
    #[error("Optimization failed to converge after {iterations} iterations")]
    ConvergenceFailure { iterations: usize },

    /// Numerical breakdown (non-finite model output, singular system).
    #[error("Numerical error: {0}")]
    NumericalError(String),

    /// The plotting backend reported an error.
    #[error("Plot error: {0}")]
    Plot(String),
}

impl DiffusionError {
    pub(crate) fn length_mismatch(
        left: &'static str,
        left_len: usize,
        right: &'static str,
        right_len: usize,
    ) -> Self {
        Self::LengthMismatch {
            left,
            left_len,
            right,
            right_len,
        }
    }
}
