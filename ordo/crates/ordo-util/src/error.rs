//! Error types for ordo-util

use thiserror::Error;

/// Error type for index vector operations
#[derive(Debug, Error, PartialEq, Eq)]
pub enum IndexVecError {
    /// Index out of bounds
    #[error("Index out of bounds: index {index}, length {length}")]
    OutOfBounds { index: usize, length: usize },

    /// The arena cannot hand out another index of this type
    #[error("Index space exhausted: {len} elements already stored, maximum is {max}")]
    CapacityExceeded { len: usize, max: usize },
}

/// Result type alias for index vector operations
pub type IndexVecResult<T> = std::result::Result<T, IndexVecError>;
