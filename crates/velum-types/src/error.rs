//! Error types for the Velum kernel.
//!
//! All crates return `VelumResult<T>` from fallible operations.

use thiserror::Error;

/// Unified error type for the Velum kernel.
#[derive(Debug, Error)]
pub enum VelumError {
    /// Mesh data is malformed or inconsistent.
    #[error("Invalid mesh: {0}")]
    InvalidMesh(String),

    /// A kernel invariant was violated (e.g. an edge-triangle
    /// intersection survived a resolution pass).
    #[error("Invariant violation: {0}")]
    InvariantViolation(String),
}

/// Convenience alias for `Result<T, VelumError>`.
pub type VelumResult<T> = Result<T, VelumError>;
