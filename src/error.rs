//! Error kinds raised by the transfer matrix kernel.
//!
//! Every failure is reported at the linear-algebra operation that detects it and
//! handed straight back to the caller. The kernel never retries, never returns a
//! partial result and never lets a NaN or infinite matrix escape in place of an error.

use thiserror::Error;

/// Errors from transfer matrix construction, inversion and the scattering solvers.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum TmmError {
    /// A precondition on the caller's arguments was violated, such as a zero
    /// transmittance handed to a reciprocal reconstruction.
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Inversion was requested on a matrix whose determinant is (near) zero.
    #[error("Matrix is singular: |det| = {det_norm:e} (threshold {threshold:e})")]
    SingularMatrix { det_norm: f64, threshold: f64 },

    /// An internally assembled linear system has no unique solution. `det_norm` is the
    /// determinant magnitude of the 2x2 complex system it encodes.
    #[error("{size}x{size} linear system is singular: |det| = {det_norm:e} (threshold {threshold:e})")]
    SingularSystem {
        size: usize,
        det_norm: f64,
        threshold: f64,
    },
}

pub type Result<T> = std::result::Result<T, TmmError>;

impl TmmError {
    pub(crate) fn invalid(msg: impl Into<String>) -> Self {
        TmmError::InvalidArgument(msg.into())
    }
}
